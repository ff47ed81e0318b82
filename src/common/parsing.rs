// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use std::time::{SystemTime, UNIX_EPOCH};

use alloy::primitives::U256;
use alloy::primitives::utils::{format_units, parse_units};

use crate::domain::error::AppError;

/// Wall-clock seconds since the epoch; 0 if the clock is before it.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

pub fn parse_boolish(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn strip_0x(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Human token amount (e.g. `12.5`) to base units. Precision beyond 9 decimals is dropped.
pub fn units_from_f64(amount: f64, decimals: u8) -> Result<U256, AppError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(AppError::validation(
            "amount",
            format!("{amount} is not a non-negative finite number"),
        ));
    }
    let places = decimals.min(9) as usize;
    let rendered = format!("{amount:.places$}");
    parse_units(&rendered, decimals)
        .map(|parsed| parsed.get_absolute())
        .map_err(|e| AppError::validation("amount", format!("{rendered}: {e}")))
}

/// Base units to a float, for logs and randomized policy math only.
pub fn units_to_f64(amount: U256, decimals: u8) -> f64 {
    format_units(amount, decimals)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Decimal string or 0x-hex to U256 (LLTV and similar raw settings).
pub fn parse_u256(raw: &str) -> Option<U256> {
    let trimmed = raw.trim();
    if trimmed.starts_with("0x") || trimmed.starts_with("0X") {
        U256::from_str_radix(strip_0x(trimmed), 16).ok()
    } else {
        U256::from_str_radix(trimmed, 10).ok()
    }
}
