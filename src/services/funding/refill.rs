// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use std::time::Duration;

use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use tokio::time::sleep;

use crate::domain::error::TxError;
use crate::infrastructure::data::morpho_client::MorphoClient;
use crate::services::funding::cooldown::CooldownLedger;

/// One holder's view of one rate-limited faucet token.
#[async_trait]
pub trait FaucetToken: Send + Sync {
    fn token(&self) -> Address;
    fn holder(&self) -> Address;
    async fn balance(&self) -> Result<U256, TxError>;
    /// Authoritative wait from the token contract, if it exposes one.
    async fn onchain_cooldown(&self) -> Result<Option<Duration>, TxError>;
    async fn mint(&self, amount: U256) -> Result<TxHash, TxError>;
}

/// Faucet token reached through a wallet's own client; the wallet pays the gas.
pub struct TokenHandle<'a> {
    client: &'a MorphoClient,
    token: Address,
}

impl<'a> TokenHandle<'a> {
    pub fn new(client: &'a MorphoClient, token: Address) -> Self {
        Self { client, token }
    }
}

#[async_trait]
impl FaucetToken for TokenHandle<'_> {
    fn token(&self) -> Address {
        self.token
    }

    fn holder(&self) -> Address {
        self.client.account()
    }

    async fn balance(&self) -> Result<U256, TxError> {
        self.client
            .token_balance(self.token, self.client.account())
            .await
    }

    async fn onchain_cooldown(&self) -> Result<Option<Duration>, TxError> {
        self.client
            .faucet_cooldown(self.token, self.client.account())
            .await
    }

    async fn mint(&self, amount: U256) -> Result<TxHash, TxError> {
        self.client.mint(self.token, amount).await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RefillPolicy {
    pub threshold: U256,
    pub amount: U256,
    /// Faucet's per-call mint cap.
    pub max_mint: U256,
    pub cooldown: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefillOutcome {
    Sufficient(U256),
    Minted(U256),
}

async fn wait_for_faucet<T: FaucetToken + ?Sized>(
    token: &T,
    ledger: &CooldownLedger,
    cooldown: Duration,
) -> Result<(), TxError> {
    let local = ledger.remaining(token.holder(), token.token(), cooldown);
    if !local.is_zero() {
        tracing::debug!(
            target: "funding",
            token = %token.token(),
            wait_secs = local.as_secs(),
            "Waiting out local faucet cooldown"
        );
        sleep(local).await;
    }
    if let Some(onchain) = token.onchain_cooldown().await?
        && !onchain.is_zero()
    {
        tracing::debug!(
            target: "funding",
            token = %token.token(),
            wait_secs = onchain.as_secs(),
            "Waiting out on-chain faucet cooldown"
        );
        sleep(onchain).await;
    }
    Ok(())
}

/// Top a wallet up when its balance dropped below `threshold`. Mints at most
/// one faucet call; never mints when the balance is already at or above it.
pub async fn auto_refill<T: FaucetToken + ?Sized>(
    token: &T,
    ledger: &CooldownLedger,
    policy: &RefillPolicy,
) -> Result<RefillOutcome, TxError> {
    let balance = token.balance().await?;
    if balance >= policy.threshold {
        return Ok(RefillOutcome::Sufficient(balance));
    }

    wait_for_faucet(token, ledger, policy.cooldown).await?;
    let amount = policy.amount.min(policy.max_mint);
    token.mint(amount).await?;
    ledger.record(token.holder(), token.token());
    tracing::info!(
        target: "funding",
        holder = %token.holder(),
        token = %token.token(),
        balance = %balance,
        minted = %amount,
        "Auto-refilled faucet token"
    );
    Ok(RefillOutcome::Minted(amount))
}

/// Mint `total` in cap-sized chunks, waiting out the cooldown between calls.
pub async fn mint_total<T: FaucetToken + ?Sized>(
    token: &T,
    ledger: &CooldownLedger,
    total: U256,
    max_mint: U256,
    cooldown: Duration,
) -> Result<U256, TxError> {
    if max_mint.is_zero() {
        return Err(TxError::terminal("faucet mint cap is zero"));
    }
    let mut minted = U256::ZERO;
    while minted < total {
        wait_for_faucet(token, ledger, cooldown).await?;
        let chunk = (total - minted).min(max_mint);
        token.mint(chunk).await?;
        ledger.record(token.holder(), token.token());
        minted += chunk;
        tracing::debug!(
            target: "funding",
            holder = %token.holder(),
            token = %token.token(),
            chunk = %chunk,
            minted = %minted,
            total = %total,
            "Faucet chunk minted"
        );
    }
    Ok(minted)
}
