// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use alloy::primitives::U256;
use async_trait::async_trait;
use rand::Rng;
use rand::rngs::StdRng;

use crate::app::bot_config::VaultUserConfig;
use crate::common::parsing::{units_from_f64, units_to_f64};
use crate::domain::error::AppError;
use crate::domain::math::mul_fraction;
use crate::domain::types::{BotRole, MarketToken};
use crate::services::bots::context::BotContext;
use crate::services::bots::runner::RoleStrategy;

#[derive(Debug, Clone, Copy)]
pub struct VaultState {
    pub shares: U256,
    pub balance: U256,
    /// Remaining deposit capacity reported by the vault.
    pub max_deposit: U256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaultAction {
    Deposit(U256),
    Redeem(U256),
}

#[derive(Debug, Clone)]
pub struct VaultPolicy {
    pub cfg: VaultUserConfig,
    pub decimals: u8,
}

impl VaultPolicy {
    pub fn choose(
        &self,
        state: &VaultState,
        withdraw_draw: f64,
        amount: f64,
        fraction: f64,
    ) -> Option<VaultAction> {
        if withdraw_draw < self.cfg.withdraw_probability && !state.shares.is_zero() {
            let shares = mul_fraction(state.shares, fraction * self.cfg.max_withdraw_fraction)
                .max(U256::from(1u8));
            return Some(VaultAction::Redeem(shares));
        }

        let assets = units_from_f64(amount, self.decimals).ok()?;
        if assets.is_zero() || state.balance < assets {
            tracing::debug!(target: "vault_user", "Balance too low to deposit");
            return None;
        }
        let needed =
            units_from_f64(amount * self.cfg.capacity_headroom.max(0.0), self.decimals).ok()?;
        if state.max_deposit < needed {
            tracing::debug!(target: "vault_user", "Vault capacity exhausted");
            return None;
        }
        Some(VaultAction::Deposit(assets))
    }

    pub fn decide(&self, state: &VaultState, rng: &mut StdRng) -> Option<VaultAction> {
        let draw = rng.r#gen::<f64>();
        let amount = rng.gen_range(self.cfg.min_deposit..=self.cfg.max_deposit);
        let fraction = rng.gen_range(0.1..=1.0);
        self.choose(state, draw, amount, fraction)
    }
}

pub struct VaultUserBot {
    ctx: BotContext,
    policy: VaultPolicy,
}

impl VaultUserBot {
    pub fn new(ctx: BotContext, cfg: VaultUserConfig) -> Result<Self, AppError> {
        if !ctx.client.has_vault() {
            return Err(AppError::Config(
                "VAULT_ADDRESS is required for vault-user bots".to_string(),
            ));
        }
        let decimals = ctx.client.loan_decimals();
        Ok(Self {
            ctx,
            policy: VaultPolicy { cfg, decimals },
        })
    }
}

#[async_trait]
impl RoleStrategy for VaultUserBot {
    type State = VaultState;
    type Action = VaultAction;

    fn role(&self) -> BotRole {
        BotRole::VaultUser
    }

    async fn check_refill(&self) -> Result<(), AppError> {
        self.ctx
            .refill(
                MarketToken::Loan,
                self.policy.cfg.refill_threshold,
                self.policy.cfg.refill_amount,
            )
            .await
            .map(|_| ())
    }

    async fn read_state(&self) -> Result<VaultState, AppError> {
        let client = &self.ctx.client;
        let me = client.account();
        Ok(VaultState {
            shares: client.vault_shares(me).await?,
            balance: client.token_balance(client.loan_token(), me).await?,
            max_deposit: client.vault_max_deposit(me).await?,
        })
    }

    fn decide(&self, state: &VaultState, rng: &mut StdRng) -> Option<VaultAction> {
        self.policy.decide(state, rng)
    }

    async fn execute(&self, action: VaultAction) -> Result<(), AppError> {
        let client = &self.ctx.client;
        match action {
            VaultAction::Deposit(assets) => {
                let tx = self
                    .ctx
                    .send("vault.deposit", || client.vault_deposit(assets))
                    .await?;
                tracing::info!(
                    target: "vault_user",
                    amount = units_to_f64(assets, self.policy.decimals),
                    tx = %tx,
                    "Deposited into vault"
                );
            }
            VaultAction::Redeem(shares) => {
                let assets = client.vault_assets_of(shares).await?;
                let tx = self
                    .ctx
                    .send("vault.redeem", || client.vault_redeem(shares))
                    .await?;
                tracing::info!(
                    target: "vault_user",
                    shares = %shares,
                    amount = units_to_f64(assets, self.policy.decimals),
                    tx = %tx,
                    "Redeemed vault shares"
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::constants::WAD;

    fn eth(n: u64) -> U256 {
        U256::from(n) * WAD
    }

    fn policy() -> VaultPolicy {
        VaultPolicy {
            cfg: VaultUserConfig::default(),
            decimals: 18,
        }
    }

    fn state(shares: U256) -> VaultState {
        VaultState {
            shares,
            balance: eth(5_000),
            max_deposit: U256::MAX,
        }
    }

    #[test]
    fn withdraws_only_when_draw_below_probability_and_shares_held() {
        let p = policy();
        let below = p.cfg.withdraw_probability / 2.0;
        let above = p.cfg.withdraw_probability + 0.01;

        assert!(matches!(
            p.choose(&state(eth(10)), below, 100.0, 1.0),
            Some(VaultAction::Redeem(_))
        ));
        assert_eq!(
            p.choose(&state(U256::ZERO), below, 100.0, 1.0),
            Some(VaultAction::Deposit(eth(100)))
        );
        assert_eq!(
            p.choose(&state(eth(10)), above, 100.0, 1.0),
            Some(VaultAction::Deposit(eth(100)))
        );
    }

    #[test]
    fn seeded_decisions_never_redeem_without_shares() {
        let p = policy();
        let mut rng = <StdRng as rand::SeedableRng>::seed_from_u64(7);
        for _ in 0..500 {
            let action = p.decide(&state(U256::ZERO), &mut rng);
            assert!(!matches!(action, Some(VaultAction::Redeem(_))));
        }
    }

    #[test]
    fn skips_deposit_on_low_balance_or_capacity() {
        let p = policy();
        let mut s = state(U256::ZERO);
        s.balance = eth(50);
        assert_eq!(p.choose(&s, 0.9, 100.0, 1.0), None);

        let mut s = state(U256::ZERO);
        s.max_deposit = eth(99);
        assert_eq!(p.choose(&s, 0.9, 100.0, 1.0), None);
    }
}
