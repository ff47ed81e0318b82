// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use alloy::primitives::U256;
use async_trait::async_trait;
use rand::Rng;
use rand::rngs::StdRng;

use crate::app::bot_config::BorrowerConfig;
use crate::common::parsing::{units_from_f64, units_to_f64};
use crate::domain::error::AppError;
use crate::domain::market::{MarketSnapshot, PositionSnapshot};
use crate::domain::math::mul_fraction;
use crate::domain::types::{BotRole, MarketToken};
use crate::services::bots::context::BotContext;
use crate::services::bots::runner::RoleStrategy;

/// The first `round(count × smart_ratio)` agents are smart.
pub fn is_smart(index: usize, count: usize, smart_ratio: f64) -> bool {
    let smart = (count as f64 * smart_ratio.clamp(0.0, 1.0)).round() as usize;
    index < smart
}

#[derive(Debug, Clone, Copy)]
pub struct BorrowerState {
    pub market: MarketSnapshot,
    pub position: PositionSnapshot,
    /// Raw oracle price, 1e36-scaled.
    pub price: U256,
    pub collateral_balance: U256,
    pub loan_balance: U256,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorrowerAction {
    SupplyCollateral(U256),
    Borrow(U256),
    Repay(U256),
}

/// Random draws for one decision, in whole tokens / unit interval.
#[derive(Debug, Clone, Copy)]
pub struct BorrowerDraws {
    pub collateral: f64,
    pub borrow: f64,
    /// Dumb borrowers: repay when below `dumb_repay_probability`.
    pub repay: f64,
    /// Dumb borrowers: supply collateral instead of borrowing when < 0.5.
    pub coin: f64,
}

#[derive(Debug, Clone)]
pub struct BorrowerPolicy {
    pub cfg: BorrowerConfig,
    pub smart: bool,
    pub lltv: U256,
    pub loan_decimals: u8,
    pub collateral_decimals: u8,
}

impl BorrowerPolicy {
    fn collateral_action(&self, state: &BorrowerState, amount: f64) -> Option<BorrowerAction> {
        let assets = units_from_f64(amount, self.collateral_decimals)
            .ok()?
            .min(state.collateral_balance);
        (!assets.is_zero()).then_some(BorrowerAction::SupplyCollateral(assets))
    }

    fn repay_action(&self, state: &BorrowerState, assets: U256) -> Option<BorrowerAction> {
        let assets = assets.min(state.loan_balance);
        (!assets.is_zero()).then_some(BorrowerAction::Repay(assets))
    }

    /// Keeps health factor at or above `min_health_factor` and borrows only
    /// inside the headroom that leaves it at `target_health_factor`.
    pub fn choose_smart(&self, state: &BorrowerState, d: BorrowerDraws) -> Option<BorrowerAction> {
        let p = &state.position;
        if p.collateral.is_zero() {
            return self.collateral_action(state, d.collateral);
        }

        let debt = p.borrowed_assets(&state.market);
        if let Some(hf) = p.health_factor(&state.market, state.price, self.lltv)
            && hf < self.cfg.min_health_factor
        {
            // Repay a quarter and nothing else this cycle.
            return self.repay_action(state, debt / U256::from(4u8));
        }

        let target = self.cfg.target_health_factor.max(1.0);
        let allowed = mul_fraction(p.max_borrow(state.price, self.lltv), 1.0 / target);
        let headroom = allowed
            .saturating_sub(debt)
            .min(state.market.liquidity());
        let min_borrow = units_from_f64(self.cfg.min_borrow, self.loan_decimals).ok()?;
        if !headroom.is_zero() && headroom >= min_borrow {
            let want = units_from_f64(d.borrow, self.loan_decimals).ok()?;
            return Some(BorrowerAction::Borrow(want.min(headroom)));
        }
        self.collateral_action(state, d.collateral)
    }

    /// Ignores health factor entirely; the liquidator's prey.
    pub fn choose_dumb(&self, state: &BorrowerState, d: BorrowerDraws) -> Option<BorrowerAction> {
        let p = &state.position;
        if p.has_debt() && d.repay < self.cfg.dumb_repay_probability {
            let debt = p.borrowed_assets(&state.market);
            let want = units_from_f64(d.borrow, self.loan_decimals).ok()?;
            return self.repay_action(state, want.min(debt));
        }
        if p.collateral.is_zero() || d.coin < 0.5 {
            return self.collateral_action(state, d.collateral);
        }
        let capacity = mul_fraction(
            p.borrow_capacity(&state.market, state.price, self.lltv),
            self.cfg.dumb_borrow_utilization,
        )
        .min(state.market.liquidity());
        let want = units_from_f64(d.borrow, self.loan_decimals).ok()?;
        let assets = want.min(capacity);
        if assets.is_zero() {
            return self.collateral_action(state, d.collateral);
        }
        Some(BorrowerAction::Borrow(assets))
    }

    pub fn choose(&self, state: &BorrowerState, d: BorrowerDraws) -> Option<BorrowerAction> {
        if self.smart {
            self.choose_smart(state, d)
        } else {
            self.choose_dumb(state, d)
        }
    }

    pub fn decide(&self, state: &BorrowerState, rng: &mut StdRng) -> Option<BorrowerAction> {
        let draws = BorrowerDraws {
            collateral: rng.gen_range(self.cfg.min_collateral..=self.cfg.max_collateral),
            borrow: rng.gen_range(self.cfg.min_borrow..=self.cfg.max_borrow),
            repay: rng.r#gen(),
            coin: rng.r#gen(),
        };
        self.choose(state, draws)
    }
}

pub struct BorrowerBot {
    ctx: BotContext,
    policy: BorrowerPolicy,
}

impl BorrowerBot {
    pub fn new(ctx: BotContext, cfg: BorrowerConfig) -> Self {
        let smart = is_smart(ctx.wallet.index, cfg.count, cfg.smart_ratio);
        let policy = BorrowerPolicy {
            cfg,
            smart,
            lltv: ctx.client.lltv(),
            loan_decimals: ctx.client.loan_decimals(),
            collateral_decimals: ctx.client.collateral_decimals(),
        };
        tracing::info!(target: "borrower", smart, "Borrower profile");
        Self { ctx, policy }
    }
}

#[async_trait]
impl RoleStrategy for BorrowerBot {
    type State = BorrowerState;
    type Action = BorrowerAction;

    fn role(&self) -> BotRole {
        BotRole::Borrower
    }

    async fn check_refill(&self) -> Result<(), AppError> {
        self.ctx
            .refill(
                MarketToken::Collateral,
                self.policy.cfg.collateral_refill_threshold,
                self.policy.cfg.collateral_refill_amount,
            )
            .await
            .map(|_| ())
    }

    async fn read_state(&self) -> Result<BorrowerState, AppError> {
        let client = &self.ctx.client;
        let me = client.account();
        Ok(BorrowerState {
            market: client.market().await?,
            position: client.position(me).await?,
            price: client.oracle_price().await?,
            collateral_balance: client
                .token_balance(client.collateral_token(), me)
                .await?,
            loan_balance: client.token_balance(client.loan_token(), me).await?,
        })
    }

    fn decide(&self, state: &BorrowerState, rng: &mut StdRng) -> Option<BorrowerAction> {
        if let Some(hf) = state
            .position
            .health_factor(&state.market, state.price, self.policy.lltv)
        {
            tracing::debug!(target: "borrower", health_factor = hf, "Position read");
        }
        self.policy.decide(state, rng)
    }

    async fn execute(&self, action: BorrowerAction) -> Result<(), AppError> {
        let client = &self.ctx.client;
        match action {
            BorrowerAction::SupplyCollateral(assets) => {
                let tx = self
                    .ctx
                    .send("supplyCollateral", || client.supply_collateral(assets))
                    .await?;
                tracing::info!(
                    target: "borrower",
                    amount = units_to_f64(assets, self.policy.collateral_decimals),
                    tx = %tx,
                    "Supplied collateral"
                );
            }
            BorrowerAction::Borrow(assets) => {
                let tx = self.ctx.send("borrow", || client.borrow(assets)).await?;
                tracing::info!(
                    target: "borrower",
                    amount = units_to_f64(assets, self.policy.loan_decimals),
                    tx = %tx,
                    "Borrowed"
                );
            }
            BorrowerAction::Repay(assets) => {
                let tx = self.ctx.send("repay", || client.repay(assets)).await?;
                tracing::info!(
                    target: "borrower",
                    amount = units_to_f64(assets, self.policy.loan_decimals),
                    tx = %tx,
                    "Repaid"
                );
            }
        }
        Ok(())
    }
}
