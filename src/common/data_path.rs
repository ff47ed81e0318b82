// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

use crate::domain::constants::{DEFAULT_WALLETS_FILE, WALLETS_TMP_SUBDIR};
use std::path::{Path, PathBuf};

const WALLETS_PATH_ENV: &str = "WALLETS_PATH";
const LOG_DIR_ENV: &str = "LOG_DIR";

fn absolute(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path,
    }
}

fn env_path(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn non_empty(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Resolve the wallet registry file using precedence:
/// 1) `WALLETS_PATH`
/// 2) configured value
/// 3) `$TMPDIR/lending-bots/bot-wallets.json`
pub fn resolve_wallets_path(configured: Option<&str>) -> PathBuf {
    if let Some(raw) = env_path(WALLETS_PATH_ENV).or_else(|| non_empty(configured)) {
        return absolute(PathBuf::from(raw));
    }
    default_wallets_path()
}

pub fn default_wallets_path() -> PathBuf {
    std::env::temp_dir()
        .join(WALLETS_TMP_SUBDIR)
        .join(DEFAULT_WALLETS_FILE)
}

/// Resolve the log directory: `LOG_DIR`, then configured value, then `./logs`.
pub fn resolve_log_dir(configured: Option<&str>) -> PathBuf {
    let raw = env_path(LOG_DIR_ENV)
        .or_else(|| non_empty(configured))
        .unwrap_or_else(|| "logs".to_string());
    absolute(PathBuf::from(raw))
}

pub fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
