// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use thiserror::Error;

/// Failure class assigned once at the transport boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxErrorKind {
    /// Account cannot pay for gas (or value). Recovered by a native-token refill.
    InsufficientFunds,
    /// Nonce conflict, timeout or transport hiccup. Recovered by backoff.
    Transient,
    /// Reverts and everything else.
    Terminal,
}

#[derive(Error, Debug, Clone)]
#[error("{kind:?}: {message}")]
pub struct TxError {
    pub kind: TxErrorKind,
    pub message: String,
}

impl TxError {
    pub fn new(kind: TxErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn insufficient_funds(message: impl Into<String>) -> Self {
        Self::new(TxErrorKind::InsufficientFunds, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(TxErrorKind::Transient, message)
    }

    pub fn terminal(message: impl Into<String>) -> Self {
        Self::new(TxErrorKind::Terminal, message)
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("Connection failed to endpoint: {0}")]
    Connection(String),

    #[error("Transaction failed: {0}")]
    Transaction(#[from] TxError),

    #[error("{action} gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        action: String,
        attempts: usize,
        last: TxError,
    },

    #[error("Insufficient funds. Required: {required}, Available: {available}")]
    InsufficientFunds { required: String, available: String },

    #[error("Validation failed for field {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Wallet registry error: {0}")]
    Wallet(String),

    #[error(transparent)]
    Unknown(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl AppError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}
