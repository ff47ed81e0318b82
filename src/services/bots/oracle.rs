// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use async_trait::async_trait;
use rand::Rng;
use rand::rngs::StdRng;

use crate::app::bot_config::OracleConfig;
use crate::domain::error::AppError;
use crate::domain::types::BotRole;
use crate::services::bots::context::BotContext;
use crate::services::bots::runner::RoleStrategy;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceStep {
    pub from: f64,
    /// `from × (1 + u)` before clamping.
    pub proposed: f64,
    pub to: f64,
}

/// Bounded random walk: `u ∈ [-max_change, +max_change]`, result clamped to
/// `[absolute_min, absolute_max]`. A non-positive current price restarts
/// from the middle of the band.
pub fn next_price(current: f64, cfg: &OracleConfig, rng: &mut StdRng) -> PriceStep {
    let from = if current.is_finite() && current > 0.0 {
        current
    } else {
        (cfg.absolute_min + cfg.absolute_max) / 2.0
    };
    let max_change = cfg.max_price_change.abs();
    let u = if max_change > 0.0 {
        rng.gen_range(-max_change..=max_change)
    } else {
        0.0
    };
    let proposed = from * (1.0 + u);
    PriceStep {
        from,
        proposed,
        to: proposed.clamp(cfg.absolute_min, cfg.absolute_max),
    }
}

pub struct OracleBot {
    ctx: BotContext,
    cfg: OracleConfig,
}

impl OracleBot {
    pub fn new(ctx: BotContext, cfg: OracleConfig) -> Self {
        Self { ctx, cfg }
    }
}

#[async_trait]
impl RoleStrategy for OracleBot {
    type State = f64;
    type Action = PriceStep;

    fn role(&self) -> BotRole {
        BotRole::Oracle
    }

    async fn read_state(&self) -> Result<f64, AppError> {
        Ok(self.ctx.client.read_price().await?)
    }

    fn decide(&self, current: &f64, rng: &mut StdRng) -> Option<PriceStep> {
        let step = next_price(*current, &self.cfg, rng);
        (step.to != step.from).then_some(step)
    }

    async fn execute(&self, step: PriceStep) -> Result<(), AppError> {
        let client = &self.ctx.client;
        let tx = self
            .ctx
            .send("setPrice", || client.write_price(step.to))
            .await?;
        tracing::info!(
            target: "oracle",
            from = step.from,
            to = step.to,
            change_pct = (step.to / step.from - 1.0) * 100.0,
            tx = %tx,
            "Moved oracle price"
        );
        Ok(())
    }
}
