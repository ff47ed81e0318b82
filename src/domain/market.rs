// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use alloy::primitives::U256;

use crate::domain::math::{
    health_factor_wad, max_borrow, ratio_to_f64, to_assets_down, to_assets_up, wad_to_f64,
};

/// Market totals as stored by Morpho Blue (interest not accrued).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarketSnapshot {
    pub total_supply_assets: U256,
    pub total_supply_shares: U256,
    pub total_borrow_assets: U256,
    pub total_borrow_shares: U256,
    pub last_update: u64,
    pub fee: U256,
}

impl MarketSnapshot {
    /// Borrowed / supplied, 0.0 for an empty market.
    pub fn utilization(&self) -> f64 {
        if self.total_supply_assets.is_zero() {
            return 0.0;
        }
        ratio_to_f64(self.total_borrow_assets, self.total_supply_assets)
    }

    /// Loan token available to borrow or withdraw.
    pub fn liquidity(&self) -> U256 {
        self.total_supply_assets
            .saturating_sub(self.total_borrow_assets)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PositionSnapshot {
    pub supply_shares: U256,
    pub borrow_shares: U256,
    pub collateral: U256,
}

impl PositionSnapshot {
    pub fn supplied_assets(&self, market: &MarketSnapshot) -> U256 {
        to_assets_down(
            self.supply_shares,
            market.total_supply_assets,
            market.total_supply_shares,
        )
    }

    /// Debt in loan-token units, rounded up as the contract does.
    pub fn borrowed_assets(&self, market: &MarketSnapshot) -> U256 {
        to_assets_up(
            self.borrow_shares,
            market.total_borrow_assets,
            market.total_borrow_shares,
        )
    }

    pub fn max_borrow(&self, price: U256, lltv: U256) -> U256 {
        max_borrow(self.collateral, price, lltv)
    }

    /// Remaining borrow capacity before the position becomes liquidatable.
    pub fn borrow_capacity(&self, market: &MarketSnapshot, price: U256, lltv: U256) -> U256 {
        self.max_borrow(price, lltv)
            .saturating_sub(self.borrowed_assets(market))
    }

    /// `None` means no debt (infinitely healthy).
    pub fn health_factor(&self, market: &MarketSnapshot, price: U256, lltv: U256) -> Option<f64> {
        health_factor_wad(self.collateral, self.borrowed_assets(market), price, lltv)
            .map(wad_to_f64)
    }

    pub fn is_liquidatable(&self, market: &MarketSnapshot, price: U256, lltv: U256) -> bool {
        self.health_factor(market, price, lltv)
            .is_some_and(|hf| hf < 1.0)
    }

    pub fn has_debt(&self) -> bool {
        !self.borrow_shares.is_zero()
    }
}
