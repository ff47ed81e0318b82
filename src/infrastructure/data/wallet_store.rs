// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use std::fs;
use std::path::Path;

use alloy::signers::local::coins_bip39::English;
use alloy::signers::local::{MnemonicBuilder, PrivateKeySigner};

use crate::common::data_path::ensure_parent_dir;
use crate::domain::error::AppError;
use crate::domain::types::{BotRole, BotWallet};
use crate::infrastructure::network::provider::parse_signer;

/// Role-tagged bot accounts, in derivation order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletRegistry {
    wallets: Vec<BotWallet>,
}

fn derive_signer(seed_phrase: &str, index: u32) -> Result<PrivateKeySigner, AppError> {
    MnemonicBuilder::<English>::default()
        .phrase(seed_phrase)
        .index(index)
        .and_then(|b| b.build())
        .map_err(|e| AppError::Wallet(format!("derivation failed at index {index}: {e}")))
}

impl WalletRegistry {
    /// Derive `m/44'/60'/0'/0/i` accounts, starting at `offset`, walking
    /// roles in `BotRole::ALL` order. Same inputs always yield the same wallets.
    pub fn derive(
        seed_phrase: &str,
        role_counts: &[(BotRole, usize)],
        offset: u32,
    ) -> Result<Self, AppError> {
        let mut wallets = Vec::new();
        let mut next = offset;
        for role in BotRole::ALL {
            let count = role_counts
                .iter()
                .find(|(r, _)| *r == role)
                .map(|(_, c)| *c)
                .unwrap_or(0);
            for index in 0..count {
                let signer = derive_signer(seed_phrase, next)?;
                wallets.push(BotWallet {
                    address: signer.address(),
                    private_key: format!("0x{}", hex::encode(signer.to_bytes())),
                    role,
                    index,
                });
                next = next
                    .checked_add(1)
                    .ok_or_else(|| AppError::Wallet("derivation index overflow".to_string()))?;
            }
        }
        Ok(Self { wallets })
    }

    pub fn load(path: &Path) -> Result<Self, AppError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            AppError::Wallet(format!("failed to read {}: {e}", path.display()))
        })?;
        let wallets: Vec<BotWallet> = serde_json::from_str(&raw).map_err(|e| {
            AppError::Wallet(format!("invalid wallet file {}: {e}", path.display()))
        })?;
        Ok(Self { wallets })
    }

    /// Write via a sibling temp file so a crash never leaves a truncated registry.
    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        ensure_parent_dir(path)
            .map_err(|e| AppError::Wallet(format!("cannot create {}: {e}", path.display())))?;
        let body = serde_json::to_string_pretty(&self.wallets)
            .map_err(|e| AppError::Wallet(e.to_string()))?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, body)
            .map_err(|e| AppError::Wallet(format!("write {} failed: {e}", tmp.display())))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600));
        }
        fs::rename(&tmp, path)
            .map_err(|e| AppError::Wallet(format!("rename to {} failed: {e}", path.display())))?;
        Ok(())
    }

    /// Reuse the persisted registry when it matches the configured role
    /// counts, seed phrase and offset; otherwise derive afresh and overwrite it.
    pub fn load_or_create(
        path: &Path,
        seed_phrase: &str,
        role_counts: &[(BotRole, usize)],
        offset: u32,
    ) -> Result<Self, AppError> {
        if path.exists() {
            match Self::load(path) {
                Ok(existing)
                    if existing.matches_counts(role_counts)
                        && existing.matches_seed(seed_phrase, offset)? =>
                {
                    tracing::info!(
                        target: "wallets",
                        path = %path.display(),
                        wallets = existing.len(),
                        "Loaded wallet registry"
                    );
                    return Ok(existing);
                }
                Ok(_) => tracing::warn!(
                    target: "wallets",
                    path = %path.display(),
                    "Role counts, seed or offset changed; re-deriving wallet registry"
                ),
                Err(e) => tracing::warn!(
                    target: "wallets",
                    error = %e,
                    "Wallet registry unreadable; re-deriving"
                ),
            }
        }
        let registry = Self::derive(seed_phrase, role_counts, offset)?;
        registry.save(path)?;
        tracing::info!(
            target: "wallets",
            path = %path.display(),
            wallets = registry.len(),
            "Derived and saved wallet registry"
        );
        Ok(registry)
    }

    pub fn matches_counts(&self, role_counts: &[(BotRole, usize)]) -> bool {
        BotRole::ALL.iter().all(|role| {
            let want = role_counts
                .iter()
                .find(|(r, _)| r == role)
                .map(|(_, c)| *c)
                .unwrap_or(0);
            self.by_role(*role).count() == want
        })
    }

    /// The first stored wallet must be the one `seed_phrase` derives at
    /// `offset`. A changed seed or offset moves every address, so one check suffices.
    pub fn matches_seed(&self, seed_phrase: &str, offset: u32) -> Result<bool, AppError> {
        match self.wallets.first() {
            Some(first) => Ok(derive_signer(seed_phrase, offset)?.address() == first.address),
            None => Ok(true),
        }
    }

    pub fn all(&self) -> &[BotWallet] {
        &self.wallets
    }

    pub fn by_role(&self, role: BotRole) -> impl Iterator<Item = &BotWallet> + '_ {
        self.wallets.iter().filter(move |w| w.role == role)
    }

    pub fn len(&self) -> usize {
        self.wallets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }
}

impl BotWallet {
    pub fn signer(&self) -> Result<PrivateKeySigner, AppError> {
        parse_signer(&self.private_key)
    }
}
