// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use futures::future::join_all;
use tokio::sync::Mutex;

use crate::app::bot_config::{BotConfig, FundingConfig};
use crate::common::parsing::{units_from_f64, units_to_f64};
use crate::domain::error::AppError;
use crate::domain::types::{BotRole, BotWallet, MarketToken};
use crate::infrastructure::data::morpho_client::{Deployment, MorphoClient};
use crate::infrastructure::data::wallet_store::WalletRegistry;
use crate::services::executor::GasRefill;
use crate::services::funding::cooldown::CooldownLedger;
use crate::services::funding::refill::{FaucetToken, TokenHandle, mint_total};

const NATIVE_DECIMALS: u8 = 18;

/// The single funding account. Every native transfer goes through one lock so
/// setup and concurrent gas refills never race on its nonce.
pub struct Funder {
    client: MorphoClient,
    send_lock: Mutex<()>,
    min_balance: U256,
    target_balance: U256,
    gas_refill: U256,
}

impl Funder {
    pub fn new(client: MorphoClient, funding: &FundingConfig) -> Result<Self, AppError> {
        Ok(Self {
            client,
            send_lock: Mutex::new(()),
            min_balance: units_from_f64(funding.min_eth_balance, NATIVE_DECIMALS)?,
            target_balance: units_from_f64(funding.target_eth_balance, NATIVE_DECIMALS)?,
            gas_refill: units_from_f64(funding.gas_refill_eth, NATIVE_DECIMALS)?,
        })
    }

    pub fn address(&self) -> Address {
        self.client.account()
    }

    pub async fn send_native(&self, to: Address, amount: U256) -> Result<(), AppError> {
        let _guard = self.send_lock.lock().await;
        let available = self.client.native_balance(self.address()).await?;
        if available < amount {
            return Err(AppError::InsufficientFunds {
                required: format!("{} ETH", units_to_f64(amount, NATIVE_DECIMALS)),
                available: format!("{} ETH", units_to_f64(available, NATIVE_DECIMALS)),
            });
        }
        let tx = self.client.transfer_native(to, amount).await?;
        tracing::info!(
            target: "funding",
            to = %to,
            eth = units_to_f64(amount, NATIVE_DECIMALS),
            tx = %tx,
            "Sent native token"
        );
        Ok(())
    }

    /// Bring `wallet` up to the target balance when it sits below the minimum.
    /// Returns the amount sent, if any.
    pub async fn top_up(&self, wallet: Address) -> Result<Option<U256>, AppError> {
        let balance = self.client.native_balance(wallet).await?;
        if balance >= self.min_balance {
            return Ok(None);
        }
        let amount = self.target_balance.saturating_sub(balance);
        if amount.is_zero() {
            return Ok(None);
        }
        self.send_native(wallet, amount).await?;
        Ok(Some(amount))
    }
}

#[async_trait]
impl GasRefill for Funder {
    async fn refill_gas(&self, wallet: Address) -> Result<(), AppError> {
        self.send_native(wallet, self.gas_refill).await
    }
}

/// Faucet balances each role starts with, in whole tokens.
pub fn initial_token_targets(role: BotRole, bots: &BotConfig) -> Vec<(MarketToken, f64)> {
    match role {
        BotRole::Lender => vec![(MarketToken::Loan, bots.lender.initial_funding)],
        BotRole::Borrower => vec![
            (MarketToken::Collateral, bots.borrower.initial_collateral_funding),
            (MarketToken::Loan, bots.borrower.initial_loan_funding),
        ],
        BotRole::VaultUser => vec![(MarketToken::Loan, bots.vault_user.initial_funding)],
        BotRole::Oracle => Vec::new(),
        BotRole::Liquidator => vec![(MarketToken::Loan, bots.liquidator.initial_funding)],
    }
    .into_iter()
    .filter(|(_, amount)| *amount > 0.0)
    .collect()
}

#[derive(Debug, Default)]
pub struct FundingReport {
    pub native_topped_up: usize,
    pub token_mints: usize,
    pub failures: Vec<(String, String)>,
}

impl FundingReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

async fn fund_tokens(
    rpc_url: &str,
    deployment: &Deployment,
    wallet: &BotWallet,
    bots: &BotConfig,
    ledger: &CooldownLedger,
) -> Result<usize, AppError> {
    let targets = initial_token_targets(wallet.role, bots);
    if targets.is_empty() {
        return Ok(0);
    }
    let client = MorphoClient::for_wallet(rpc_url, deployment, wallet).await?;
    let cooldown = Duration::from_secs(bots.funding.faucet_cooldown_secs);
    let mut mints = 0;
    for (kind, target) in targets {
        let token = client.token_address(kind);
        let decimals = client.decimals_of(token);
        let handle = TokenHandle::new(&client, token);
        let target = units_from_f64(target, decimals)?;
        let cap = units_from_f64(bots.funding.faucet_max_mint, decimals)?;
        let balance = handle.balance().await?;
        if balance >= target {
            continue;
        }
        mint_total(&handle, ledger, target - balance, cap, cooldown).await?;
        mints += 1;
        tracing::info!(
            target: "funding",
            wallet = %wallet.label(),
            token = %kind,
            amount = units_to_f64(target - balance, decimals),
            "Faucet funding complete"
        );
    }
    Ok(mints)
}

/// Phase 1: native token, one wallet at a time from the funding account.
/// Phase 2: faucet tokens, every wallet minting for itself in parallel.
pub async fn fund_wallets(
    funder: &Funder,
    registry: &WalletRegistry,
    rpc_url: &str,
    deployment: &Deployment,
    bots: &BotConfig,
    ledger: Arc<CooldownLedger>,
) -> FundingReport {
    let mut report = FundingReport::default();

    tracing::info!(target: "funding", wallets = registry.len(), funder = %funder.address(), "Phase 1: native top-ups");
    for wallet in registry.all() {
        match funder.top_up(wallet.address).await {
            Ok(Some(_)) => report.native_topped_up += 1,
            Ok(None) => {}
            Err(e) => {
                tracing::error!(target: "funding", wallet = %wallet.label(), error = %e, "Native top-up failed");
                report.failures.push((wallet.label(), e.to_string()));
            }
        }
    }

    tracing::info!(target: "funding", "Phase 2: faucet tokens");
    let results = join_all(
        registry
            .all()
            .iter()
            .map(|wallet| fund_tokens(rpc_url, deployment, wallet, bots, &ledger)),
    )
    .await;
    for (wallet, result) in registry.all().iter().zip(results) {
        match result {
            Ok(n) => report.token_mints += n,
            Err(e) => {
                tracing::error!(target: "funding", wallet = %wallet.label(), error = %e, "Token funding failed");
                report.failures.push((wallet.label(), e.to_string()));
            }
        }
    }

    tracing::info!(
        target: "funding",
        native = report.native_topped_up,
        tokens = report.token_mints,
        failures = report.failures.len(),
        "Funding finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oracle_gets_no_tokens_and_borrower_gets_both() {
        let bots = BotConfig::default();
        assert!(initial_token_targets(BotRole::Oracle, &bots).is_empty());
        let borrower = initial_token_targets(BotRole::Borrower, &bots);
        assert_eq!(borrower.len(), 2);
        assert_eq!(borrower[0].0, MarketToken::Collateral);
        assert_eq!(borrower[1].0, MarketToken::Loan);
    }

    #[test]
    fn zero_targets_are_dropped() {
        let mut bots = BotConfig::default();
        bots.borrower.initial_loan_funding = 0.0;
        let borrower = initial_token_targets(BotRole::Borrower, &bots);
        assert_eq!(borrower, vec![(MarketToken::Collateral, 5_000.0)]);
    }
}
