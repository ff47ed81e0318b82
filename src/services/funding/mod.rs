// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

//! Getting bot wallets enough gas and market tokens to act.

pub mod cooldown;
pub mod funder;
pub mod refill;
