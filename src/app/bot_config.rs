// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::domain::constants::MAX_REFILLS_PER_CALL;
use crate::domain::error::AppError;
use crate::domain::types::BotRole;
use serde::Deserialize;
use std::time::Duration;

/// Per-role behaviour of the simulation. Loaded once, read-only for the run.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct BotConfig {
    pub runner: RunnerConfig,
    pub retry: RetryConfig,
    pub funding: FundingConfig,
    pub lender: LenderConfig,
    pub borrower: BorrowerConfig,
    pub vault_user: VaultUserConfig,
    pub oracle: OracleConfig,
    pub liquidator: LiquidatorConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RunnerConfig {
    /// 0 runs forever.
    pub max_cycles: u64,
    pub stop_on_error: bool,
    pub error_cooldown_secs: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_cycles: 0,
            stop_on_error: false,
            error_cooldown_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetryConfig {
    /// Counted attempts (transient + terminal) before giving up.
    pub max_attempts: usize,
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// Gas refills allowed per call before insufficient funds is counted.
    pub max_refills: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff_ms: 1_000,
            max_backoff_ms: 30_000,
            max_refills: MAX_REFILLS_PER_CALL,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FundingConfig {
    /// Native balance (ETH) below which setup tops a wallet up.
    pub min_eth_balance: f64,
    /// Native balance (ETH) setup tops up to.
    pub target_eth_balance: f64,
    /// Native amount (ETH) sent when a transaction fails for gas.
    pub gas_refill_eth: f64,
    pub faucet_cooldown_secs: u64,
    /// Per-call faucet mint cap, in token units.
    pub faucet_max_mint: f64,
}

impl Default for FundingConfig {
    fn default() -> Self {
        Self {
            min_eth_balance: 0.05,
            target_eth_balance: 0.2,
            gas_refill_eth: 0.05,
            faucet_cooldown_secs: 60,
            faucet_max_mint: 10_000.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LenderConfig {
    pub count: usize,
    pub min_interval_secs: u64,
    pub max_interval_secs: u64,
    pub min_amount: f64,
    pub max_amount: f64,
    pub high_utilization_threshold: f64,
    pub high_utilization_multiplier: f64,
    pub withdraw_probability: f64,
    pub max_withdraw_fraction: f64,
    pub refill_threshold: f64,
    pub refill_amount: f64,
    pub initial_funding: f64,
}

impl Default for LenderConfig {
    fn default() -> Self {
        Self {
            count: 3,
            min_interval_secs: 20,
            max_interval_secs: 60,
            min_amount: 100.0,
            max_amount: 1_000.0,
            high_utilization_threshold: 0.8,
            high_utilization_multiplier: 1.5,
            withdraw_probability: 0.1,
            max_withdraw_fraction: 0.5,
            refill_threshold: 500.0,
            refill_amount: 5_000.0,
            initial_funding: 20_000.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BorrowerConfig {
    pub count: usize,
    pub min_interval_secs: u64,
    pub max_interval_secs: u64,
    /// Share of borrower agents running the health-factor-aware strategy.
    pub smart_ratio: f64,
    pub min_health_factor: f64,
    pub target_health_factor: f64,
    pub min_collateral: f64,
    pub max_collateral: f64,
    pub min_borrow: f64,
    pub max_borrow: f64,
    /// Fraction of remaining borrow capacity a dumb borrower may take.
    pub dumb_borrow_utilization: f64,
    pub dumb_repay_probability: f64,
    pub collateral_refill_threshold: f64,
    pub collateral_refill_amount: f64,
    pub initial_collateral_funding: f64,
    /// Loan tokens minted up front so repays can cover accrued interest.
    pub initial_loan_funding: f64,
}

impl Default for BorrowerConfig {
    fn default() -> Self {
        Self {
            count: 4,
            min_interval_secs: 30,
            max_interval_secs: 90,
            smart_ratio: 0.5,
            min_health_factor: 1.5,
            target_health_factor: 2.0,
            min_collateral: 100.0,
            max_collateral: 500.0,
            min_borrow: 50.0,
            max_borrow: 300.0,
            dumb_borrow_utilization: 0.95,
            dumb_repay_probability: 0.1,
            collateral_refill_threshold: 200.0,
            collateral_refill_amount: 2_000.0,
            initial_collateral_funding: 5_000.0,
            initial_loan_funding: 500.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct VaultUserConfig {
    pub count: usize,
    pub min_interval_secs: u64,
    pub max_interval_secs: u64,
    pub min_deposit: f64,
    pub max_deposit: f64,
    pub withdraw_probability: f64,
    pub max_withdraw_fraction: f64,
    /// Deposits pause while remaining vault capacity < headroom × amount.
    pub capacity_headroom: f64,
    pub refill_threshold: f64,
    pub refill_amount: f64,
    pub initial_funding: f64,
}

impl Default for VaultUserConfig {
    fn default() -> Self {
        Self {
            count: 3,
            min_interval_secs: 30,
            max_interval_secs: 120,
            min_deposit: 100.0,
            max_deposit: 1_000.0,
            withdraw_probability: 0.15,
            max_withdraw_fraction: 0.5,
            capacity_headroom: 1.0,
            refill_threshold: 300.0,
            refill_amount: 5_000.0,
            initial_funding: 10_000.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OracleConfig {
    pub count: usize,
    pub min_interval_secs: u64,
    pub max_interval_secs: u64,
    /// Largest relative step per cycle, e.g. 0.08 = 8%.
    pub max_price_change: f64,
    pub absolute_min: f64,
    pub absolute_max: f64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            count: 1,
            min_interval_secs: 60,
            max_interval_secs: 180,
            max_price_change: 0.08,
            absolute_min: 1.0,
            absolute_max: 10.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LiquidatorConfig {
    pub count: usize,
    pub min_interval_secs: u64,
    pub max_interval_secs: u64,
    /// Minimum estimated profit in loan-token units.
    pub min_profit: f64,
    pub refill_threshold: f64,
    pub refill_amount: f64,
    pub initial_funding: f64,
}

impl Default for LiquidatorConfig {
    fn default() -> Self {
        Self {
            count: 1,
            min_interval_secs: 10,
            max_interval_secs: 30,
            min_profit: 1.0,
            refill_threshold: 1_000.0,
            refill_amount: 10_000.0,
            initial_funding: 20_000.0,
        }
    }
}

/// Agent count and sleep bounds for one role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    pub count: usize,
    pub min_interval: Duration,
    pub max_interval: Duration,
}

impl BotConfig {
    pub fn cadence(&self, role: BotRole) -> Cadence {
        let (count, min, max) = match role {
            BotRole::Lender => (
                self.lender.count,
                self.lender.min_interval_secs,
                self.lender.max_interval_secs,
            ),
            BotRole::Borrower => (
                self.borrower.count,
                self.borrower.min_interval_secs,
                self.borrower.max_interval_secs,
            ),
            BotRole::VaultUser => (
                self.vault_user.count,
                self.vault_user.min_interval_secs,
                self.vault_user.max_interval_secs,
            ),
            BotRole::Oracle => (
                self.oracle.count,
                self.oracle.min_interval_secs,
                self.oracle.max_interval_secs,
            ),
            BotRole::Liquidator => (
                self.liquidator.count,
                self.liquidator.min_interval_secs,
                self.liquidator.max_interval_secs,
            ),
        };
        Cadence {
            count,
            min_interval: Duration::from_secs(min),
            max_interval: Duration::from_secs(max),
        }
    }

    /// Role → agent count, in derivation order.
    pub fn role_counts(&self) -> Vec<(BotRole, usize)> {
        BotRole::ALL
            .iter()
            .map(|role| (*role, self.cadence(*role).count))
            .collect()
    }

    pub fn error_cooldown(&self) -> Duration {
        Duration::from_secs(self.runner.error_cooldown_secs)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        for role in BotRole::ALL {
            let c = self.cadence(role);
            if c.min_interval > c.max_interval {
                return Err(AppError::validation(
                    &format!("{role}.min_interval_secs"),
                    "must not exceed max_interval_secs",
                ));
            }
        }

        check_range("lender.min_amount", self.lender.min_amount, self.lender.max_amount)?;
        check_range(
            "borrower.min_collateral",
            self.borrower.min_collateral,
            self.borrower.max_collateral,
        )?;
        check_range("borrower.min_borrow", self.borrower.min_borrow, self.borrower.max_borrow)?;
        check_range(
            "vault_user.min_deposit",
            self.vault_user.min_deposit,
            self.vault_user.max_deposit,
        )?;
        check_range(
            "oracle.absolute_min",
            self.oracle.absolute_min,
            self.oracle.absolute_max,
        )?;

        check_unit("lender.high_utilization_threshold", self.lender.high_utilization_threshold)?;
        check_unit("lender.withdraw_probability", self.lender.withdraw_probability)?;
        check_unit("lender.max_withdraw_fraction", self.lender.max_withdraw_fraction)?;
        check_unit("borrower.smart_ratio", self.borrower.smart_ratio)?;
        check_unit("borrower.dumb_borrow_utilization", self.borrower.dumb_borrow_utilization)?;
        check_unit("borrower.dumb_repay_probability", self.borrower.dumb_repay_probability)?;
        check_unit("vault_user.withdraw_probability", self.vault_user.withdraw_probability)?;
        check_unit("vault_user.max_withdraw_fraction", self.vault_user.max_withdraw_fraction)?;
        check_unit("oracle.max_price_change", self.oracle.max_price_change)?;

        if self.lender.high_utilization_multiplier < 1.0 {
            return Err(AppError::validation(
                "lender.high_utilization_multiplier",
                "must be at least 1.0",
            ));
        }
        if self.borrower.min_health_factor < 1.0 {
            return Err(AppError::validation(
                "borrower.min_health_factor",
                "must be at least 1.0",
            ));
        }
        if self.borrower.target_health_factor < self.borrower.min_health_factor {
            return Err(AppError::validation(
                "borrower.target_health_factor",
                "must not be below min_health_factor",
            ));
        }
        if self.oracle.absolute_min <= 0.0 {
            return Err(AppError::validation("oracle.absolute_min", "must be positive"));
        }
        if self.retry.max_attempts == 0 {
            return Err(AppError::validation("retry.max_attempts", "must be at least 1"));
        }
        if self.funding.faucet_max_mint <= 0.0 {
            return Err(AppError::validation("funding.faucet_max_mint", "must be positive"));
        }
        Ok(())
    }
}

fn check_range(field: &str, min: f64, max: f64) -> Result<(), AppError> {
    if !(min.is_finite() && max.is_finite()) || min < 0.0 || min > max {
        return Err(AppError::validation(
            field,
            format!("expected 0 <= min <= max, got {min}..{max}"),
        ));
    }
    Ok(())
}

fn check_unit(field: &str, value: f64) -> Result<(), AppError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(AppError::validation(
            field,
            format!("expected a value in [0, 1], got {value}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        BotConfig::default().validate().expect("defaults validate");
    }

    #[test]
    fn inverted_interval_is_rejected() {
        let mut cfg = BotConfig::default();
        cfg.oracle.min_interval_secs = 500;
        cfg.oracle.max_interval_secs = 10;
        let err = cfg.validate().unwrap_err();
        assert!(
            matches!(err, AppError::Validation { field, .. } if field == "oracle.min_interval_secs")
        );
    }

    #[test]
    fn probability_out_of_range_is_rejected() {
        let mut cfg = BotConfig::default();
        cfg.vault_user.withdraw_probability = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn role_counts_follow_derivation_order() {
        let cfg = BotConfig::default();
        let roles: Vec<BotRole> = cfg.role_counts().into_iter().map(|(r, _)| r).collect();
        assert_eq!(roles, BotRole::ALL.to_vec());
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let cfg: BotConfig =
            serde_json::from_str(r#"{"lender":{"count":7},"oracle":{"max_price_change":0.02}}"#)
                .unwrap();
        assert_eq!(cfg.lender.count, 7);
        assert_eq!(cfg.lender.max_amount, LenderConfig::default().max_amount);
        assert_eq!(cfg.oracle.max_price_change, 0.02);
        assert_eq!(cfg.borrower.count, BorrowerConfig::default().count);
    }
}
