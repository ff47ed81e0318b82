// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use alloy::primitives::U256;

// =============================================================================
// MORPHO BLUE FIXED-POINT CONSTANTS
// =============================================================================

/// 1e18
pub const WAD: U256 = U256::from_limbs([1_000_000_000_000_000_000, 0, 0, 0]);

/// 1e36, scale of `IOracle.price()`.
pub const ORACLE_PRICE_SCALE: U256 =
    U256::from_limbs([0xb34b_9f10_0000_0000, 0x00c0_97ce_7bc9_0715, 0, 0]);

pub const VIRTUAL_SHARES: U256 = U256::from_limbs([1_000_000, 0, 0, 0]);
pub const VIRTUAL_ASSETS: U256 = U256::from_limbs([1, 0, 0, 0]);

/// 1.15 WAD
pub const MAX_LIQUIDATION_INCENTIVE_FACTOR: U256 =
    U256::from_limbs([1_150_000_000_000_000_000, 0, 0, 0]);

/// 0.3 WAD
pub const LIQUIDATION_CURSOR: U256 = U256::from_limbs([300_000_000_000_000_000, 0, 0, 0]);

// =============================================================================
// JSON-RPC
// =============================================================================

pub const JSONRPC_PARSE_ERROR: i64 = -32700;
/// Code used for every proxy-synthesized upstream failure.
pub const JSONRPC_PROXY_ERROR: i64 = -32603;

pub const HTTP_PROXY_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_WS_REQUEST_TIMEOUT_MS: u64 = 30_000;

// =============================================================================
// WALLETS & FUNDING
// =============================================================================

pub const DEFAULT_WALLETS_FILE: &str = "bot-wallets.json";
pub const WALLETS_TMP_SUBDIR: &str = "lending-bots";

/// Mnemonic index 0 is left to the deployer.
pub const DEFAULT_DERIVATION_OFFSET: u32 = 1;

pub const MAX_REFILLS_PER_CALL: usize = 3;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limb_constants_match_decimal_values() {
        assert_eq!(WAD, U256::from(10u64).pow(U256::from(18u64)));
        assert_eq!(
            ORACLE_PRICE_SCALE,
            U256::from(10u64).pow(U256::from(36u64))
        );
        assert_eq!(
            MAX_LIQUIDATION_INCENTIVE_FACTOR,
            U256::from(115u64) * U256::from(10u64).pow(U256::from(16u64))
        );
        assert_eq!(
            LIQUIDATION_CURSOR,
            U256::from(3u64) * U256::from(10u64).pow(U256::from(17u64))
        );
    }
}
