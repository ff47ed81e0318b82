// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BotRole {
    Lender,
    Borrower,
    VaultUser,
    Oracle,
    Liquidator,
}

impl BotRole {
    /// Fixed derivation order for the registry.
    pub const ALL: [BotRole; 5] = [
        BotRole::Lender,
        BotRole::Borrower,
        BotRole::VaultUser,
        BotRole::Oracle,
        BotRole::Liquidator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BotRole::Lender => "lender",
            BotRole::Borrower => "borrower",
            BotRole::VaultUser => "vaultUser",
            BotRole::Oracle => "oracle",
            BotRole::Liquidator => "liquidator",
        }
    }
}

impl fmt::Display for BotRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BotRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "lender" | "lenders" => Ok(BotRole::Lender),
            "borrower" | "borrowers" => Ok(BotRole::Borrower),
            "vaultuser" | "vaultusers" | "vault" => Ok(BotRole::VaultUser),
            "oracle" | "oraclechanger" => Ok(BotRole::Oracle),
            "liquidator" | "liquidators" => Ok(BotRole::Liquidator),
            other => Err(AppError::validation("role", format!("unknown role '{other}'"))),
        }
    }
}

/// The two faucet tokens of the market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarketToken {
    Loan,
    Collateral,
}

impl fmt::Display for MarketToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketToken::Loan => f.write_str("loan"),
            MarketToken::Collateral => f.write_str("collateral"),
        }
    }
}

/// One derived bot account. Immutable once written to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotWallet {
    pub address: Address,
    pub private_key: String,
    pub role: BotRole,
    /// Agent index within the role.
    pub index: usize,
}

impl BotWallet {
    pub fn label(&self) -> String {
        format!("{}#{}", self.role, self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parses_cli_spellings() {
        assert_eq!("vault-user".parse::<BotRole>().unwrap(), BotRole::VaultUser);
        assert_eq!("VaultUser".parse::<BotRole>().unwrap(), BotRole::VaultUser);
        assert_eq!("oracle_changer".parse::<BotRole>().unwrap(), BotRole::Oracle);
        assert!("keeper".parse::<BotRole>().is_err());
    }

    #[test]
    fn wallet_serializes_with_camel_case_role() {
        let wallet = BotWallet {
            address: Address::repeat_byte(0x11),
            private_key: "0xabc".to_string(),
            role: BotRole::VaultUser,
            index: 2,
        };
        let json = serde_json::to_string(&wallet).unwrap();
        assert!(json.contains("\"role\":\"vaultUser\""));
        assert!(json.contains("\"privateKey\":\"0xabc\""));
        let back: BotWallet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, wallet);
    }
}
