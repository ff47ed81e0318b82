// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::app::bot_config::BotConfig;
use crate::common::data_path::{resolve_log_dir, resolve_wallets_path};
use crate::common::parsing::{parse_boolish, parse_u256, units_from_f64};
use crate::domain::constants::{DEFAULT_DERIVATION_OFFSET, WAD};
use crate::domain::error::AppError;
use alloy::primitives::{Address, U256};
use alloy::primitives::utils::parse_units;
use config::{Config, Environment, File};
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct GlobalSettings {
    // General
    #[serde(default = "default_false")]
    pub debug: bool,
    #[serde(default = "default_false")]
    pub log_json: bool,
    pub log_dir: Option<String>,

    // Connection
    pub rpc_url: String,

    // Identity
    /// Funding account key.
    pub private_key: String,
    pub seed_phrase: Option<String>,
    pub wallets_path: Option<String>,
    #[serde(default = "default_derivation_offset")]
    pub derivation_offset: u32,

    // Deployed protocol
    pub morpho_address: Address,
    pub loan_token: Address,
    pub collateral_token: Address,
    pub oracle_address: Address,
    pub irm_address: Address,
    #[serde(deserialize_with = "deserialize_lltv")]
    pub lltv: U256,
    pub vault_address: Option<Address>,
    /// Chainlink-style aggregator behind the oracle, when the oracle reads from one.
    pub price_feed_address: Option<Address>,

    #[serde(default)]
    pub bots: BotConfig,
}

fn default_false() -> bool {
    false
}
fn default_derivation_offset() -> u32 {
    DEFAULT_DERIVATION_OFFSET
}

/// LLTV as raw 18-decimal integer (`860000000000000000`), hex, or a fraction (`0.86`).
fn deserialize_lltv<'de, D>(deserializer: D) -> Result<U256, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::{Error, Visitor};
    use std::fmt;

    struct LltvVisitor;

    impl<'de> Visitor<'de> for LltvVisitor {
        type Value = U256;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("an 18-decimal fixed point integer or a fraction below 1")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: Error,
        {
            parse_lltv(v).map_err(E::custom)
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: Error,
        {
            Ok(U256::from(v))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: Error,
        {
            u64::try_from(v)
                .map(U256::from)
                .map_err(|_| E::custom("lltv must be positive"))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: Error,
        {
            units_from_f64(v, 18).map_err(E::custom)
        }
    }

    deserializer.deserialize_any(LltvVisitor)
}

fn parse_lltv(raw: &str) -> Result<U256, AppError> {
    let trimmed = raw.trim();
    if trimmed.contains('.') {
        return parse_units(trimmed, 18)
            .map(|parsed| parsed.get_absolute())
            .map_err(|e| AppError::Config(format!("Invalid LLTV '{trimmed}': {e}")));
    }
    parse_u256(trimmed).ok_or_else(|| AppError::Config(format!("Invalid LLTV '{trimmed}'")))
}

impl GlobalSettings {
    pub fn load_with_path(path: Option<&str>) -> Result<Self, AppError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let mut builder = Config::builder();
        if let Some(selected_path) = path {
            builder = builder.add_source(File::from(Path::new(selected_path)).required(true));
        } else {
            builder = builder.add_source(File::with_name("config").required(false));
        }
        // Precedence: CLI (in main) > env/.env > config file.
        // `BOTS__LENDER__COUNT=5` reaches `bots.lender.count`.
        builder = builder.add_source(
            Environment::default()
                .separator("__")
                .try_parsing(true),
        );

        let settings: GlobalSettings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load() -> Result<Self, AppError> {
        Self::load_with_path(None)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.rpc_url.trim().is_empty() {
            return Err(AppError::Config("RPC_URL is missing".to_string()));
        }
        if self.private_key.trim().is_empty() {
            return Err(AppError::Config("PRIVATE_KEY is missing".to_string()));
        }
        if self.lltv.is_zero() || self.lltv >= WAD {
            return Err(AppError::validation(
                "lltv",
                format!("{} is outside (0, 1e18)", self.lltv),
            ));
        }
        self.bots.validate()
    }

    pub fn seed_phrase_value(&self) -> Result<String, AppError> {
        std::env::var("SEED_PHRASE")
            .ok()
            .or_else(|| self.seed_phrase.clone())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::Config("SEED_PHRASE is missing".to_string()))
    }

    pub fn wallets_path(&self) -> PathBuf {
        resolve_wallets_path(self.wallets_path.as_deref())
    }

    pub fn log_dir(&self) -> PathBuf {
        resolve_log_dir(self.log_dir.as_deref())
    }

    pub fn log_level(&self) -> &'static str {
        let env_debug = std::env::var("DEBUG").ok().and_then(|v| parse_boolish(&v));
        if env_debug.unwrap_or(self.debug) {
            "debug"
        } else {
            "info"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, MutexGuard, OnceLock};

    fn env_lock_guard() -> MutexGuard<'static, ()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    const BASE_TOML: &str = r#"
rpc_url = "http://127.0.0.1:8545"
private_key = "file_private_key"
morpho_address = "0x0000000000000000000000000000000000000001"
loan_token = "0x0000000000000000000000000000000000000002"
collateral_token = "0x0000000000000000000000000000000000000003"
oracle_address = "0x0000000000000000000000000000000000000004"
irm_address = "0x0000000000000000000000000000000000000005"
lltv = "860000000000000000"
"#;

    fn write_config(name: &str, body: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(name), body).expect("write temp config");
        dir
    }

    #[test]
    fn lltv_accepts_raw_hex_and_fraction() {
        let raw = U256::from(860_000_000_000_000_000u64);
        assert_eq!(parse_lltv("860000000000000000").unwrap(), raw);
        assert_eq!(parse_lltv("0.86").unwrap(), raw);
        assert_eq!(parse_lltv("0xbef55718ad60000").unwrap(), raw);
        assert!(parse_lltv("eighty").is_err());
    }

    #[test]
    fn file_config_loads_with_bot_defaults() {
        let _env_lock = env_lock_guard();
        let dir = write_config("bots.toml", BASE_TOML);
        let path = dir.path().join("bots.toml");
        let loaded = GlobalSettings::load_with_path(Some(path.to_str().expect("utf8 path")))
            .expect("load settings");
        assert_eq!(loaded.lltv, U256::from(860_000_000_000_000_000u64));
        assert_eq!(loaded.derivation_offset, DEFAULT_DERIVATION_OFFSET);
        assert_eq!(loaded.bots.lender.count, 3);
        assert!(loaded.vault_address.is_none());
    }

    #[test]
    fn env_overrides_file_values_including_nested_bot_keys() {
        let _env_lock = env_lock_guard();
        let dir = write_config("bots-env.toml", BASE_TOML);
        let path = dir.path().join("bots-env.toml");
        let old_key = std::env::var("PRIVATE_KEY").ok();
        unsafe {
            std::env::set_var("PRIVATE_KEY", "env_private_key");
            std::env::set_var("BOTS__LENDER__COUNT", "9");
        }

        let loaded = GlobalSettings::load_with_path(Some(path.to_str().expect("utf8 path")))
            .expect("load settings");
        assert_eq!(loaded.private_key, "env_private_key");
        assert_eq!(loaded.bots.lender.count, 9);

        unsafe { std::env::remove_var("BOTS__LENDER__COUNT") };
        if let Some(v) = old_key {
            unsafe { std::env::set_var("PRIVATE_KEY", v) };
        } else {
            unsafe { std::env::remove_var("PRIVATE_KEY") };
        }
    }

    #[test]
    fn lltv_of_one_is_rejected() {
        let _env_lock = env_lock_guard();
        let body = BASE_TOML.replace("860000000000000000", "1000000000000000000");
        let dir = write_config("bots-lltv.toml", &body);
        let path = dir.path().join("bots-lltv.toml");
        let err = GlobalSettings::load_with_path(Some(path.to_str().expect("utf8 path")))
            .expect_err("lltv = 1 must fail");
        assert!(matches!(err, AppError::Validation { field, .. } if field == "lltv"));
    }

    #[test]
    fn seed_phrase_missing_is_a_config_error() {
        let _env_lock = env_lock_guard();
        let old = std::env::var("SEED_PHRASE").ok();
        unsafe { std::env::remove_var("SEED_PHRASE") };
        let dir = write_config("bots-seed.toml", BASE_TOML);
        let path = dir.path().join("bots-seed.toml");
        let loaded = GlobalSettings::load_with_path(Some(path.to_str().expect("utf8 path")))
            .expect("load settings");
        assert!(matches!(
            loaded.seed_phrase_value(),
            Err(AppError::Config(msg)) if msg.contains("SEED_PHRASE")
        ));
        if let Some(v) = old {
            unsafe { std::env::set_var("SEED_PHRASE", v) };
        }
    }
}
