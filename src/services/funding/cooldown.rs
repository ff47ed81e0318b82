// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use std::time::Duration;

use alloy::primitives::Address;
use dashmap::DashMap;

use crate::common::parsing::unix_now;

/// Local estimate of the last faucet mint per `(wallet, token)`.
/// In-memory only; the token contract remains the source of truth.
#[derive(Debug, Default)]
pub struct CooldownLedger {
    last_mint: DashMap<(Address, Address), u64>,
}

impl CooldownLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, wallet: Address, token: Address) {
        self.record_at(wallet, token, unix_now());
    }

    pub fn record_at(&self, wallet: Address, token: Address, unix_secs: u64) {
        self.last_mint.insert((wallet, token), unix_secs);
    }

    pub fn last_mint(&self, wallet: Address, token: Address) -> Option<u64> {
        self.last_mint.get(&(wallet, token)).map(|v| *v)
    }

    pub fn remaining(&self, wallet: Address, token: Address, cooldown: Duration) -> Duration {
        self.remaining_at(wallet, token, cooldown, unix_now())
    }

    pub fn remaining_at(
        &self,
        wallet: Address,
        token: Address,
        cooldown: Duration,
        now: u64,
    ) -> Duration {
        match self.last_mint(wallet, token) {
            Some(last) => {
                let ready = last.saturating_add(cooldown.as_secs());
                Duration::from_secs(ready.saturating_sub(now))
            }
            None => Duration::ZERO,
        }
    }
}
