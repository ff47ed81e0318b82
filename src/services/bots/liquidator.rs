// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use rand::rngs::StdRng;

use crate::app::bot_config::LiquidatorConfig;
use crate::common::parsing::{units_from_f64, units_to_f64};
use crate::domain::constants::WAD;
use crate::domain::error::AppError;
use crate::domain::market::{MarketSnapshot, PositionSnapshot};
use crate::domain::math::{
    liquidation_incentive_factor, repaid_for_seized, seized_for_repaid, w_mul_down,
};
use crate::domain::types::{BotRole, MarketToken};
use crate::services::bots::context::BotContext;
use crate::services::bots::runner::RoleStrategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assessment {
    NoDebt,
    Healthy,
    Unprofitable { profit: U256 },
    Unaffordable { repaid: U256 },
    Liquidate { seized: U256, repaid: U256, profit: U256 },
}

#[derive(Debug, Clone, Copy)]
pub struct LiquidationParams {
    pub lltv: U256,
    pub min_profit: U256,
}

/// Size a full liquidation the way the contract will settle it and decide
/// whether it is worth sending.
pub fn assess(
    position: &PositionSnapshot,
    market: &MarketSnapshot,
    price: U256,
    balance: U256,
    params: &LiquidationParams,
) -> Assessment {
    let Some(hf) = position.health_factor(market, price, params.lltv) else {
        return Assessment::NoDebt;
    };
    if hf >= 1.0 || price.is_zero() {
        return Assessment::Healthy;
    }

    let debt = position.borrowed_assets(market);
    let lif = liquidation_incentive_factor(params.lltv);
    let all_collateral_repay = repaid_for_seized(position.collateral, lif, price);
    let (seized, repaid) = if all_collateral_repay <= debt {
        (position.collateral, all_collateral_repay)
    } else {
        let mut seized = seized_for_repaid(debt, lif, price).min(position.collateral);
        if repaid_for_seized(seized, lif, price) > debt {
            seized = seized.saturating_sub(U256::from(1u8));
        }
        (seized, repaid_for_seized(seized, lif, price))
    };
    if seized.is_zero() {
        return Assessment::Unprofitable { profit: U256::ZERO };
    }

    let profit = w_mul_down(repaid, lif.saturating_sub(WAD));
    if profit < params.min_profit {
        return Assessment::Unprofitable { profit };
    }
    if balance < repaid {
        return Assessment::Unaffordable { repaid };
    }
    Assessment::Liquidate {
        seized,
        repaid,
        profit,
    }
}

#[derive(Debug, Clone)]
pub struct LiquidatorState {
    pub market: MarketSnapshot,
    pub price: U256,
    pub balance: U256,
    pub positions: Vec<(Address, PositionSnapshot)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidateAction {
    pub borrower: Address,
    pub seized: U256,
    pub repaid: U256,
    pub profit: U256,
}

/// Most profitable liquidatable position, if any.
pub fn pick_target(state: &LiquidatorState, params: &LiquidationParams) -> Option<LiquidateAction> {
    state
        .positions
        .iter()
        .filter_map(|(borrower, position)| {
            match assess(position, &state.market, state.price, state.balance, params) {
                Assessment::Liquidate {
                    seized,
                    repaid,
                    profit,
                } => Some(LiquidateAction {
                    borrower: *borrower,
                    seized,
                    repaid,
                    profit,
                }),
                Assessment::Unprofitable { profit } => {
                    tracing::debug!(target: "liquidator", borrower = %borrower, profit = %profit, "Below minimum profit");
                    None
                }
                Assessment::Unaffordable { repaid } => {
                    tracing::warn!(target: "liquidator", borrower = %borrower, repaid = %repaid, "Balance cannot cover repay");
                    None
                }
                Assessment::NoDebt | Assessment::Healthy => None,
            }
        })
        .max_by_key(|a| a.profit)
}

pub struct LiquidatorBot {
    ctx: BotContext,
    cfg: LiquidatorConfig,
    params: LiquidationParams,
    borrowers: Vec<Address>,
}

impl LiquidatorBot {
    pub fn new(
        ctx: BotContext,
        cfg: LiquidatorConfig,
        borrowers: Vec<Address>,
    ) -> Result<Self, AppError> {
        let params = LiquidationParams {
            lltv: ctx.client.lltv(),
            min_profit: units_from_f64(cfg.min_profit, ctx.client.loan_decimals())?,
        };
        Ok(Self {
            ctx,
            cfg,
            params,
            borrowers,
        })
    }
}

#[async_trait]
impl RoleStrategy for LiquidatorBot {
    type State = LiquidatorState;
    type Action = LiquidateAction;

    fn role(&self) -> BotRole {
        BotRole::Liquidator
    }

    async fn check_refill(&self) -> Result<(), AppError> {
        self.ctx
            .refill(
                MarketToken::Loan,
                self.cfg.refill_threshold,
                self.cfg.refill_amount,
            )
            .await
            .map(|_| ())
    }

    async fn read_state(&self) -> Result<LiquidatorState, AppError> {
        let client = &self.ctx.client;
        let market = client.market().await?;
        let price = client.oracle_price().await?;
        let balance = client
            .token_balance(client.loan_token(), client.account())
            .await?;
        let mut positions = Vec::with_capacity(self.borrowers.len());
        for borrower in &self.borrowers {
            positions.push((*borrower, client.position(*borrower).await?));
        }
        Ok(LiquidatorState {
            market,
            price,
            balance,
            positions,
        })
    }

    fn decide(&self, state: &LiquidatorState, _rng: &mut StdRng) -> Option<LiquidateAction> {
        pick_target(state, &self.params)
    }

    async fn execute(&self, action: LiquidateAction) -> Result<(), AppError> {
        let client = &self.ctx.client;
        let tx = self
            .ctx
            .send("liquidate", || {
                client.liquidate(action.borrower, action.seized, action.repaid)
            })
            .await?;
        tracing::info!(
            target: "liquidator",
            borrower = %action.borrower,
            seized = units_to_f64(action.seized, client.collateral_decimals()),
            repaid = units_to_f64(action.repaid, client.loan_decimals()),
            profit = units_to_f64(action.profit, client.loan_decimals()),
            tx = %tx,
            "Liquidated position"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::constants::{ORACLE_PRICE_SCALE, VIRTUAL_SHARES};

    fn eth(n: u64) -> U256 {
        U256::from(n) * WAD
    }

    fn market() -> MarketSnapshot {
        MarketSnapshot {
            total_supply_assets: eth(10_000),
            total_supply_shares: eth(10_000) * VIRTUAL_SHARES,
            total_borrow_assets: eth(400),
            total_borrow_shares: eth(400) * VIRTUAL_SHARES,
            ..Default::default()
        }
    }

    /// 50 collateral against 100 debt.
    fn position() -> PositionSnapshot {
        PositionSnapshot {
            supply_shares: U256::ZERO,
            borrow_shares: eth(100) * VIRTUAL_SHARES,
            collateral: eth(50),
        }
    }

    fn params(min_profit: u64) -> LiquidationParams {
        LiquidationParams {
            lltv: eth(8) / U256::from(10u8),
            min_profit: eth(min_profit),
        }
    }

    fn price(p: u64) -> U256 {
        ORACLE_PRICE_SCALE * U256::from(p)
    }

    #[test]
    fn healthy_positions_are_never_liquidated() {
        // price 3 -> hf 1.2; price 2.5 -> exactly 1.0
        for p in [price(3), ORACLE_PRICE_SCALE * U256::from(5u8) / U256::from(2u8)] {
            assert_eq!(
                assess(&position(), &market(), p, eth(1_000_000), &params(0)),
                Assessment::Healthy
            );
        }
        assert_eq!(
            assess(&PositionSnapshot::default(), &market(), price(1), eth(1), &params(0)),
            Assessment::NoDebt
        );
    }

    #[test]
    fn underwater_position_is_sized_within_debt_and_collateral() {
        // price 2 -> hf 0.8
        let out = assess(&position(), &market(), price(2), eth(1_000), &params(1));
        let Assessment::Liquidate {
            seized,
            repaid,
            profit,
        } = out
        else {
            panic!("expected liquidation, got {out:?}");
        };
        assert!(seized <= eth(50));
        assert!(repaid <= eth(100));
        assert!(profit >= eth(1));
    }

    #[test]
    fn skips_below_min_profit() {
        let out = assess(&position(), &market(), price(2), eth(1_000), &params(1_000));
        assert!(matches!(out, Assessment::Unprofitable { .. }));
    }

    #[test]
    fn skips_when_balance_cannot_repay() {
        let out = assess(&position(), &market(), price(2), eth(1), &params(1));
        assert!(matches!(out, Assessment::Unaffordable { .. }));
    }

    #[test]
    fn picks_most_profitable_target() {
        let mut small = position();
        small.borrow_shares = eth(50) * VIRTUAL_SHARES;
        small.collateral = eth(20);
        let state = LiquidatorState {
            market: market(),
            price: price(2),
            balance: eth(1_000),
            positions: vec![
                (Address::repeat_byte(1), small),
                (Address::repeat_byte(2), position()),
                (Address::repeat_byte(3), PositionSnapshot::default()),
            ],
        };
        let target = pick_target(&state, &params(0)).unwrap();
        assert_eq!(target.borrower, Address::repeat_byte(2));
    }
}
