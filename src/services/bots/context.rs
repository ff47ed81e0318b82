// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::app::bot_config::FundingConfig;
use crate::common::parsing::units_from_f64;
use crate::domain::error::{AppError, TxError};
use crate::domain::types::{BotWallet, MarketToken};
use crate::infrastructure::data::morpho_client::MorphoClient;
use crate::services::executor::TxExecutor;
use crate::services::funding::cooldown::CooldownLedger;
use crate::services::funding::refill::{RefillOutcome, RefillPolicy, TokenHandle, auto_refill};

/// Everything one bot wallet needs: its own signing client plus the shared
/// executor and faucet ledger.
pub struct BotContext {
    pub wallet: BotWallet,
    pub client: MorphoClient,
    pub executor: Arc<TxExecutor>,
    pub ledger: Arc<CooldownLedger>,
    pub funding: FundingConfig,
}

impl BotContext {
    /// Run a state-changing call from this wallet through the retry executor.
    pub async fn send<T, F, Fut>(&self, action: &str, op: F) -> Result<T, AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TxError>>,
    {
        self.executor
            .execute(self.wallet.address, action, op)
            .await
    }

    /// Auto-refill `token` when below `threshold` (whole tokens).
    pub async fn refill(
        &self,
        token: MarketToken,
        threshold: f64,
        amount: f64,
    ) -> Result<RefillOutcome, AppError> {
        let address = self.client.token_address(token);
        let decimals = self.client.decimals_of(address);
        let policy = RefillPolicy {
            threshold: units_from_f64(threshold, decimals)?,
            amount: units_from_f64(amount, decimals)?,
            max_mint: units_from_f64(self.funding.faucet_max_mint, decimals)?,
            cooldown: Duration::from_secs(self.funding.faucet_cooldown_secs),
        };
        let handle = TokenHandle::new(&self.client, address);
        self.send("refill", || auto_refill(&handle, &self.ledger, &policy))
            .await
    }
}
