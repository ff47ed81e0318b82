// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use alloy::primitives::U256;
use async_trait::async_trait;
use rand::Rng;
use rand::rngs::StdRng;

use crate::app::bot_config::LenderConfig;
use crate::common::parsing::{units_from_f64, units_to_f64};
use crate::domain::error::AppError;
use crate::domain::market::{MarketSnapshot, PositionSnapshot};
use crate::domain::math::mul_fraction;
use crate::domain::types::{BotRole, MarketToken};
use crate::services::bots::context::BotContext;
use crate::services::bots::runner::RoleStrategy;

#[derive(Debug, Clone, Copy)]
pub struct LenderState {
    pub market: MarketSnapshot,
    pub position: PositionSnapshot,
    pub balance: U256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LenderAction {
    Supply(U256),
    Withdraw(U256),
}

#[derive(Debug, Clone)]
pub struct LenderPolicy {
    pub cfg: LenderConfig,
    pub decimals: u8,
}

impl LenderPolicy {
    /// `withdraw_draw` decides between withdrawing and supplying; `amount` is
    /// the base supply size in whole tokens; `fraction` scales a withdrawal.
    pub fn choose(
        &self,
        state: &LenderState,
        withdraw_draw: f64,
        amount: f64,
        fraction: f64,
    ) -> Option<LenderAction> {
        let utilization = state.market.utilization();
        let high = utilization >= self.cfg.high_utilization_threshold;
        let supplied = state.position.supplied_assets(&state.market);

        if !high && !supplied.is_zero() && withdraw_draw < self.cfg.withdraw_probability {
            let assets = mul_fraction(supplied, fraction * self.cfg.max_withdraw_fraction)
                .min(state.market.liquidity());
            return (!assets.is_zero()).then_some(LenderAction::Withdraw(assets));
        }

        let amount = if high {
            amount * self.cfg.high_utilization_multiplier
        } else {
            amount
        };
        let assets = units_from_f64(amount, self.decimals).ok()?;
        if assets.is_zero() || assets > state.balance {
            return None;
        }
        Some(LenderAction::Supply(assets))
    }

    pub fn decide(&self, state: &LenderState, rng: &mut StdRng) -> Option<LenderAction> {
        let draw = rng.r#gen::<f64>();
        let amount = rng.gen_range(self.cfg.min_amount..=self.cfg.max_amount);
        let fraction = rng.gen_range(0.1..=1.0);
        self.choose(state, draw, amount, fraction)
    }
}

pub struct LenderBot {
    ctx: BotContext,
    policy: LenderPolicy,
}

impl LenderBot {
    pub fn new(ctx: BotContext, cfg: LenderConfig) -> Self {
        let decimals = ctx.client.loan_decimals();
        Self {
            ctx,
            policy: LenderPolicy { cfg, decimals },
        }
    }
}

#[async_trait]
impl RoleStrategy for LenderBot {
    type State = LenderState;
    type Action = LenderAction;

    fn role(&self) -> BotRole {
        BotRole::Lender
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

    async fn read_state(&self) -> Result<LenderState, AppError> {
        let client = &self.ctx.client;
        Ok(LenderState {
            market: client.market().await?,
            position: client.position(client.account()).await?,
            balance: client
                .token_balance(client.loan_token(), client.account())
                .await?,
        })
    }

    fn decide(&self, state: &LenderState, rng: &mut StdRng) -> Option<LenderAction> {
        self.policy.decide(state, rng)
    }

    async fn execute(&self, action: LenderAction) -> Result<(), AppError> {
        let client = &self.ctx.client;
        let (verb, amount, tx) = match action {
            LenderAction::Supply(assets) => {
                ("Supplied", assets, self.ctx.send("supply", || client.supply(assets)).await?)
            }
            LenderAction::Withdraw(assets) => (
                "Withdrew",
                assets,
                self.ctx.send("withdraw", || client.withdraw(assets)).await?,
            ),
        };
        tracing::info!(
            target: "lender",
            amount = units_to_f64(amount, self.policy.decimals),
            tx = %tx,
            "{verb} loan token"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::constants::{VIRTUAL_SHARES, WAD};

    fn eth(n: u64) -> U256 {
        U256::from(n) * WAD
    }

    fn state(borrowed: u64, supply_shares: U256) -> LenderState {
        LenderState {
            market: MarketSnapshot {
                total_supply_assets: eth(1_000),
                total_supply_shares: eth(1_000) * VIRTUAL_SHARES,
                total_borrow_assets: eth(borrowed),
                total_borrow_shares: eth(borrowed) * VIRTUAL_SHARES,
                ..Default::default()
            },
            position: PositionSnapshot {
                supply_shares,
                ..Default::default()
            },
            balance: eth(10_000),
        }
    }

    fn policy() -> LenderPolicy {
        LenderPolicy {
            cfg: LenderConfig::default(),
            decimals: 18,
        }
    }

    #[test]
    fn supplies_base_amount_at_normal_utilization() {
        let action = policy().choose(&state(100, U256::ZERO), 0.0, 250.0, 1.0);
        assert_eq!(action, Some(LenderAction::Supply(eth(250))));
    }

    #[test]
    fn high_utilization_boosts_supply_and_blocks_withdrawals() {
        let shares = eth(100) * VIRTUAL_SHARES;
        let action = policy().choose(&state(900, shares), 0.0, 200.0, 1.0);
        assert_eq!(action, Some(LenderAction::Supply(eth(300))));
    }

    #[test]
    fn withdraws_part_of_supply_on_low_draw() {
        let shares = eth(100) * VIRTUAL_SHARES;
        let Some(LenderAction::Withdraw(assets)) =
            policy().choose(&state(100, shares), 0.05, 200.0, 1.0)
        else {
            panic!("expected withdraw");
        };
        // max_withdraw_fraction 0.5 of ~100 supplied
        assert!(assets <= eth(50) && assets > eth(49));
    }

    #[test]
    fn skips_supply_larger_than_balance() {
        let mut s = state(100, U256::ZERO);
        s.balance = eth(10);
        assert_eq!(policy().choose(&s, 0.9, 200.0, 1.0), None);
    }
}
