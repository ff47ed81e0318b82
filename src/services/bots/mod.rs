// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

pub mod borrower;
pub mod context;
pub mod lender;
pub mod liquidator;
pub mod oracle;
pub mod runner;
pub mod vault_user;

use std::sync::Arc;

use alloy::primitives::Address;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::task::JoinSet;
use tracing::Instrument;

use crate::app::bot_config::BotConfig;
use crate::domain::error::AppError;
use crate::domain::types::{BotRole, BotWallet};
use crate::infrastructure::data::morpho_client::{Deployment, MorphoClient};
use crate::infrastructure::data::wallet_store::WalletRegistry;
use crate::services::executor::TxExecutor;
use crate::services::funding::cooldown::CooldownLedger;

use borrower::BorrowerBot;
use context::BotContext;
use lender::LenderBot;
use liquidator::LiquidatorBot;
use oracle::OracleBot;
use runner::{RoleStrategy, RunnerSettings, RunnerStats, run_bot};

type BotResult = (String, Arc<RunnerStats>, Result<(), AppError>);

/// Shared handles every runner in the process borrows from.
pub struct Fleet {
    pub rpc_url: String,
    pub deployment: Deployment,
    pub bots: BotConfig,
    pub executor: Arc<TxExecutor>,
    pub ledger: Arc<CooldownLedger>,
}

fn spawn_bot<S>(tasks: &mut JoinSet<BotResult>, strategy: S, settings: RunnerSettings, wallet: &BotWallet)
where
    S: RoleStrategy + 'static,
{
    let label = wallet.label();
    let span = tracing::info_span!("bot", role = %strategy.role(), agent = wallet.index);
    let stats = Arc::new(RunnerStats::default());
    let rng = StdRng::from_entropy();
    let task_stats = stats.clone();
    tasks.spawn(
        async move {
            let result = run_bot(strategy, settings, rng, task_stats).await;
            (label, stats, result)
        }
        .instrument(span),
    );
}

impl Fleet {
    async fn context(&self, wallet: &BotWallet) -> Result<BotContext, AppError> {
        Ok(BotContext {
            wallet: wallet.clone(),
            client: MorphoClient::for_wallet(&self.rpc_url, &self.deployment, wallet).await?,
            executor: self.executor.clone(),
            ledger: self.ledger.clone(),
            funding: self.bots.funding.clone(),
        })
    }

    async fn spawn_wallet(
        &self,
        tasks: &mut JoinSet<BotResult>,
        role: BotRole,
        wallet: &BotWallet,
        settings: RunnerSettings,
        borrowers: &[Address],
    ) -> Result<(), AppError> {
        let ctx = self.context(wallet).await?;
        match role {
            BotRole::Lender => {
                spawn_bot(tasks, LenderBot::new(ctx, self.bots.lender.clone()), settings, wallet)
            }
            BotRole::Borrower => spawn_bot(
                tasks,
                BorrowerBot::new(ctx, self.bots.borrower.clone()),
                settings,
                wallet,
            ),
            BotRole::VaultUser => spawn_bot(
                tasks,
                vault_user::VaultUserBot::new(ctx, self.bots.vault_user.clone())?,
                settings,
                wallet,
            ),
            BotRole::Oracle => {
                spawn_bot(tasks, OracleBot::new(ctx, self.bots.oracle.clone()), settings, wallet)
            }
            BotRole::Liquidator => spawn_bot(
                tasks,
                LiquidatorBot::new(ctx, self.bots.liquidator.clone(), borrowers.to_vec())?,
                settings,
                wallet,
            ),
        }
        Ok(())
    }

    /// Spawn every wallet of `role` that can be set up. A wallet whose client
    /// cannot be built is logged and left out; the others still run.
    async fn spawn_role(
        &self,
        tasks: &mut JoinSet<BotResult>,
        role: BotRole,
        registry: &WalletRegistry,
    ) -> usize {
        if role == BotRole::VaultUser && self.deployment.vault.is_none() {
            tracing::warn!(target: "fleet", "VAULT_ADDRESS not set; skipping vault-user bots");
            return 0;
        }
        let settings = RunnerSettings::for_role(&self.bots, role);
        let borrowers: Vec<Address> = registry
            .by_role(BotRole::Borrower)
            .map(|w| w.address)
            .collect();

        let mut spawned = 0;
        for wallet in registry.by_role(role) {
            match self
                .spawn_wallet(tasks, role, wallet, settings, &borrowers)
                .await
            {
                Ok(()) => spawned += 1,
                Err(e) => tracing::error!(
                    target: "fleet",
                    bot = %wallet.label(),
                    error = %e,
                    "Bot setup failed; skipping wallet"
                ),
            }
        }
        spawned
    }

    /// Start one runner per wallet of each selected role and wait for all of
    /// them. Returns the first runner error, if any stopped on one.
    pub async fn run(&self, registry: &WalletRegistry, roles: &[BotRole]) -> Result<(), AppError> {
        let mut tasks = JoinSet::new();
        for role in roles {
            let n = self.spawn_role(&mut tasks, *role, registry).await;
            tracing::info!(target: "fleet", role = %role, bots = n, "Role started");
        }
        if tasks.is_empty() {
            return Err(AppError::Config(
                "no bots to run; check role counts and the wallet registry".to_string(),
            ));
        }

        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((label, stats, result)) => {
                    let (cycles, actions, idle, errors) = stats.snapshot();
                    tracing::info!(target: "fleet", bot = %label, cycles, actions, idle, errors, "Bot exited");
                    if let Err(e) = result {
                        tracing::error!(target: "fleet", bot = %label, error = %e, "Bot stopped on error");
                        first_error.get_or_insert(e);
                    }
                }
                Err(e) => {
                    tracing::error!(target: "fleet", error = %e, "Bot task panicked");
                    first_error.get_or_insert(AppError::Initialization(e.to_string()));
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::data::abi::MarketParams;
    use crate::services::executor::{GasRefill, RetryPolicy};
    use alloy::primitives::U256;
    use async_trait::async_trait;

    const MNEMONIC: &str = "test test test test test test test test test test test junk";

    struct NoRefill;

    #[async_trait]
    impl GasRefill for NoRefill {
        async fn refill_gas(&self, _wallet: Address) -> Result<(), AppError> {
            Ok(())
        }
    }

    fn fleet(rpc_url: &str) -> Fleet {
        let bots = BotConfig::default();
        Fleet {
            rpc_url: rpc_url.to_string(),
            deployment: Deployment {
                morpho: Address::repeat_byte(0x01),
                params: MarketParams {
                    loanToken: Address::repeat_byte(0x02),
                    collateralToken: Address::repeat_byte(0x03),
                    oracle: Address::repeat_byte(0x04),
                    irm: Address::repeat_byte(0x05),
                    lltv: U256::ZERO,
                },
                vault: None,
                price_feed: None,
            },
            executor: Arc::new(TxExecutor::new(
                Arc::new(NoRefill),
                RetryPolicy::from(&bots.retry),
            )),
            bots,
            ledger: Arc::new(CooldownLedger::new()),
        }
    }

    #[tokio::test]
    async fn wallet_setup_failure_skips_the_wallet_instead_of_aborting() {
        let registry = WalletRegistry::derive(MNEMONIC, &[(BotRole::Lender, 2)], 1).unwrap();
        let fleet = fleet("http://127.0.0.1:1");

        let mut tasks = JoinSet::new();
        let spawned = fleet.spawn_role(&mut tasks, BotRole::Lender, &registry).await;
        assert_eq!(spawned, 0);
        assert!(tasks.is_empty());

        let err = fleet.run(&registry, &[BotRole::Lender]).await.unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[tokio::test]
    async fn vault_users_are_skipped_without_a_vault() {
        let registry = WalletRegistry::derive(MNEMONIC, &[(BotRole::VaultUser, 1)], 1).unwrap();
        let mut tasks = JoinSet::new();
        let spawned = fleet("http://127.0.0.1:1")
            .spawn_role(&mut tasks, BotRole::VaultUser, &registry)
            .await;
        assert_eq!(spawned, 0);
    }
}
