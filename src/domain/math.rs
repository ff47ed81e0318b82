// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

//! Mirror of the Morpho Blue accounting the bots need for decisions.
//! Rounding follows the core contract: borrow assets round up, max borrow rounds down.

use alloy::primitives::U256;

use crate::domain::constants::{
    LIQUIDATION_CURSOR, MAX_LIQUIDATION_INCENTIVE_FACTOR, ORACLE_PRICE_SCALE, VIRTUAL_ASSETS,
    VIRTUAL_SHARES, WAD,
};

pub fn mul_div_down(x: U256, y: U256, d: U256) -> U256 {
    if d.is_zero() {
        return U256::ZERO;
    }
    x.saturating_mul(y) / d
}

pub fn mul_div_up(x: U256, y: U256, d: U256) -> U256 {
    if d.is_zero() {
        return U256::ZERO;
    }
    x.saturating_mul(y).saturating_add(d - U256::from(1u8)) / d
}

pub fn w_mul_down(x: U256, y: U256) -> U256 {
    mul_div_down(x, y, WAD)
}

pub fn w_div_down(x: U256, y: U256) -> U256 {
    mul_div_down(x, WAD, y)
}

pub fn w_div_up(x: U256, y: U256) -> U256 {
    mul_div_up(x, WAD, y)
}

pub fn to_assets_down(shares: U256, total_assets: U256, total_shares: U256) -> U256 {
    mul_div_down(
        shares,
        total_assets + VIRTUAL_ASSETS,
        total_shares + VIRTUAL_SHARES,
    )
}

pub fn to_assets_up(shares: U256, total_assets: U256, total_shares: U256) -> U256 {
    mul_div_up(
        shares,
        total_assets + VIRTUAL_ASSETS,
        total_shares + VIRTUAL_SHARES,
    )
}

/// Loan-token value of `collateral` at `price`, times LLTV.
pub fn max_borrow(collateral: U256, price: U256, lltv: U256) -> U256 {
    w_mul_down(mul_div_down(collateral, price, ORACLE_PRICE_SCALE), lltv)
}

/// WAD-scaled health factor. `None` when there is no debt.
pub fn health_factor_wad(
    collateral: U256,
    borrowed_assets: U256,
    price: U256,
    lltv: U256,
) -> Option<U256> {
    if borrowed_assets.is_zero() {
        return None;
    }
    Some(w_div_down(max_borrow(collateral, price, lltv), borrowed_assets))
}

pub fn liquidation_incentive_factor(lltv: U256) -> U256 {
    let lltv = lltv.min(WAD);
    let denominator = WAD - w_mul_down(LIQUIDATION_CURSOR, WAD - lltv);
    w_div_down(WAD, denominator).min(MAX_LIQUIDATION_INCENTIVE_FACTOR)
}

/// Collateral seized when repaying `repaid_assets` of loan token.
pub fn seized_for_repaid(repaid_assets: U256, lif: U256, price: U256) -> U256 {
    mul_div_down(w_mul_down(repaid_assets, lif), ORACLE_PRICE_SCALE, price)
}

/// Loan token the contract pulls when seizing `seized_assets` of collateral.
pub fn repaid_for_seized(seized_assets: U256, lif: U256, price: U256) -> U256 {
    w_div_up(mul_div_up(seized_assets, price, ORACLE_PRICE_SCALE), lif)
}

/// `amount × fraction`, fraction clamped to `[0, 1]` and resolved to 1e-18.
pub fn mul_fraction(amount: U256, fraction: f64) -> U256 {
    if !fraction.is_finite() || fraction <= 0.0 {
        return U256::ZERO;
    }
    if fraction >= 1.0 {
        return amount;
    }
    let scaled = (fraction * 1e18) as u128;
    w_mul_down(amount, U256::from(scaled))
}

pub fn wad_to_f64(value: U256) -> f64 {
    ratio_to_f64(value, WAD)
}

/// `num / den` as a float, tolerant of values beyond `u128`.
pub fn ratio_to_f64(num: U256, den: U256) -> f64 {
    if den.is_zero() {
        return 0.0;
    }
    let n: f64 = num.to_string().parse().unwrap_or(f64::MAX);
    let d: f64 = den.to_string().parse().unwrap_or(f64::MAX);
    n / d
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wad(x: u64) -> U256 {
        U256::from(x) * WAD
    }

    fn pct(x: u64) -> U256 {
        U256::from(x) * WAD / U256::from(100u64)
    }

    #[test]
    fn health_factor_matches_hand_computation() {
        // 100 collateral at price 2.0, lltv 80% -> max borrow 160; debt 100 -> hf 1.6
        let price = U256::from(2u64) * ORACLE_PRICE_SCALE;
        let hf = health_factor_wad(wad(100), wad(100), price, pct(80)).unwrap();
        assert_eq!(hf, pct(160));
        assert!(health_factor_wad(wad(100), U256::ZERO, price, pct(80)).is_none());
    }

    #[test]
    fn borrow_assets_round_up_against_the_borrower() {
        let shares = U256::from(1_000_001u64);
        let down = to_assets_down(shares, U256::from(10u64), U256::from(3_000_000u64));
        let up = to_assets_up(shares, U256::from(10u64), U256::from(3_000_000u64));
        assert_eq!(up, down + U256::from(1u8));
    }

    #[test]
    fn incentive_factor_is_capped() {
        // lltv 86% -> 1 / (1 - 0.3 * 0.14) = 1.0438...
        let lif = liquidation_incentive_factor(pct(86));
        assert!(lif > WAD && lif < MAX_LIQUIDATION_INCENTIVE_FACTOR);
        // lltv 0 would be 1/0.7 = 1.43 -> capped
        assert_eq!(
            liquidation_incentive_factor(U256::ZERO),
            MAX_LIQUIDATION_INCENTIVE_FACTOR
        );
    }

    #[test]
    fn seize_and_repay_are_consistent() {
        let price = U256::from(5u64) * ORACLE_PRICE_SCALE;
        let lif = liquidation_incentive_factor(pct(80));
        let seized = seized_for_repaid(wad(50), lif, price);
        let repaid = repaid_for_seized(seized, lif, price);
        assert!(repaid <= wad(50));
        assert!(wad(50) - repaid <= U256::from(10u64));
    }

    #[test]
    fn ratio_handles_large_values() {
        assert!((wad_to_f64(pct(150)) - 1.5).abs() < 1e-12);
        assert_eq!(ratio_to_f64(U256::from(1u8), U256::ZERO), 0.0);
    }

    #[test]
    fn fraction_is_clamped() {
        assert_eq!(mul_fraction(wad(10), 0.25), wad(10) / U256::from(4u8));
        assert_eq!(mul_fraction(wad(10), 1.5), wad(10));
        assert_eq!(mul_fraction(wad(10), -0.1), U256::ZERO);
        assert_eq!(mul_fraction(wad(10), f64::NAN), U256::ZERO);
    }
}
