// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

pub mod bots;
pub mod executor;
pub mod funding;
pub mod proxy;
