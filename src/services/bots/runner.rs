// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use std::fmt::Debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use rand::rngs::StdRng;
use tokio::time::sleep;

use crate::app::bot_config::{BotConfig, Cadence};
use crate::domain::error::AppError;
use crate::domain::types::BotRole;

/// One role's behaviour, driven by [`run_bot`] through
/// refill → read → decide → execute.
#[async_trait]
pub trait RoleStrategy: Send + Sync {
    type State: Send;
    type Action: Debug + Send;

    fn role(&self) -> BotRole;

    /// Top up faucet balances before acting. Default: nothing to refill.
    async fn check_refill(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn read_state(&self) -> Result<Self::State, AppError>;

    /// `None` means sit this cycle out.
    fn decide(&self, state: &Self::State, rng: &mut StdRng) -> Option<Self::Action>;

    async fn execute(&self, action: Self::Action) -> Result<(), AppError>;
}

#[derive(Debug, Clone, Copy)]
pub struct RunnerSettings {
    /// 0 runs forever.
    pub max_cycles: u64,
    pub stop_on_error: bool,
    pub error_cooldown: Duration,
    pub min_interval: Duration,
    pub max_interval: Duration,
}

impl RunnerSettings {
    pub fn for_role(bots: &BotConfig, role: BotRole) -> Self {
        let Cadence {
            min_interval,
            max_interval,
            ..
        } = bots.cadence(role);
        Self {
            max_cycles: bots.runner.max_cycles,
            stop_on_error: bots.runner.stop_on_error,
            error_cooldown: bots.error_cooldown(),
            min_interval,
            max_interval,
        }
    }

    fn next_sleep(&self, rng: &mut StdRng) -> Duration {
        let lo = self.min_interval.as_millis() as u64;
        let hi = (self.max_interval.as_millis() as u64).max(lo);
        Duration::from_millis(rng.gen_range(lo..=hi))
    }
}

#[derive(Debug, Default)]
pub struct RunnerStats {
    pub cycles: AtomicU64,
    pub actions: AtomicU64,
    pub idle: AtomicU64,
    pub errors: AtomicU64,
}

impl RunnerStats {
    pub fn snapshot(&self) -> (u64, u64, u64, u64) {
        (
            self.cycles.load(Ordering::Relaxed),
            self.actions.load(Ordering::Relaxed),
            self.idle.load(Ordering::Relaxed),
            self.errors.load(Ordering::Relaxed),
        )
    }
}

enum CycleOutcome {
    Acted,
    Idle,
}

async fn run_cycle<S: RoleStrategy>(
    strategy: &S,
    rng: &mut StdRng,
) -> Result<CycleOutcome, AppError> {
    strategy.check_refill().await?;
    let state = strategy.read_state().await?;
    let Some(action) = strategy.decide(&state, rng) else {
        return Ok(CycleOutcome::Idle);
    };
    tracing::info!(target: "bot", action = ?action, "Executing");
    strategy.execute(action).await?;
    Ok(CycleOutcome::Acted)
}

/// Poll loop for one wallet. Returns after `max_cycles`, or with the first
/// error when `stop_on_error` is set; otherwise errors are logged and the
/// loop cools down and continues.
pub async fn run_bot<S: RoleStrategy>(
    strategy: S,
    settings: RunnerSettings,
    mut rng: StdRng,
    stats: Arc<RunnerStats>,
) -> Result<(), AppError> {
    let mut cycle = 0u64;
    tracing::info!(target: "bot", max_cycles = settings.max_cycles, "Bot started");
    loop {
        if settings.max_cycles > 0 && cycle >= settings.max_cycles {
            break;
        }
        cycle += 1;
        stats.cycles.fetch_add(1, Ordering::Relaxed);

        match run_cycle(&strategy, &mut rng).await {
            Ok(CycleOutcome::Acted) => {
                stats.actions.fetch_add(1, Ordering::Relaxed);
            }
            Ok(CycleOutcome::Idle) => {
                stats.idle.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(target: "bot", cycle, "Nothing to do");
            }
            Err(e) => {
                stats.errors.fetch_add(1, Ordering::Relaxed);
                tracing::error!(target: "bot", cycle, error = %e, "Cycle failed");
                if settings.stop_on_error {
                    return Err(e);
                }
                sleep(settings.error_cooldown).await;
                continue;
            }
        }

        if settings.max_cycles > 0 && cycle >= settings.max_cycles {
            break;
        }
        sleep(settings.next_sleep(&mut rng)).await;
    }
    tracing::info!(target: "bot", cycles = cycle, "Bot finished");
    Ok(())
}
