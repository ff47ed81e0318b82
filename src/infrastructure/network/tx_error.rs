// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@mitander.dev>

//! The one place node error text is inspected. Everything above this layer
//! matches on `TxErrorKind`.

use crate::domain::error::{TxError, TxErrorKind};
use alloy::providers::{PendingTransactionError, WatchTxError};
use alloy::transports::{RpcError, TransportError};

const INSUFFICIENT_FUNDS_MARKERS: &[&str] = &["insufficient funds", "insufficient balance for transfer"];

const TRANSIENT_MARKERS: &[&str] = &[
    "nonce too low",
    "nonce too high",
    "replacement transaction underpriced",
    "already known",
    "known transaction",
    "timeout",
    "timed out",
    "rate limit",
    "header not found",
];

/// Node rejected the request because a limit was hit (EIP-1474).
const LIMIT_EXCEEDED_CODE: i64 = -32005;
const EXECUTION_REVERTED_CODE: i64 = 3;

pub fn classify_message(code: Option<i64>, message: &str) -> TxErrorKind {
    let lowered = message.to_ascii_lowercase();
    if INSUFFICIENT_FUNDS_MARKERS.iter().any(|m| lowered.contains(m)) {
        return TxErrorKind::InsufficientFunds;
    }
    if code == Some(LIMIT_EXCEEDED_CODE) || TRANSIENT_MARKERS.iter().any(|m| lowered.contains(m)) {
        return TxErrorKind::Transient;
    }
    TxErrorKind::Terminal
}

pub fn classify_rpc_error(err: &TransportError) -> TxError {
    match err {
        RpcError::ErrorResp(payload) => TxError::new(
            classify_message(Some(payload.code), &payload.message),
            format!("rpc error {}: {}", payload.code, payload.message),
        ),
        RpcError::Transport(kind) => TxError::transient(format!("transport: {kind}")),
        RpcError::NullResp => TxError::transient("node returned null response"),
        other => TxError::terminal(other.to_string()),
    }
}

pub fn classify_pending_error(err: &PendingTransactionError) -> TxError {
    match err {
        PendingTransactionError::TransportError(e) => classify_rpc_error(e),
        PendingTransactionError::TxWatcher(WatchTxError::Timeout) => {
            TxError::transient("timed out waiting for receipt")
        }
        other => TxError::transient(other.to_string()),
    }
}

pub fn classify_contract_error(err: &alloy::contract::Error) -> TxError {
    match err {
        alloy::contract::Error::TransportError(e) => classify_rpc_error(e),
        alloy::contract::Error::PendingTransactionError(e) => classify_pending_error(e),
        other => TxError::terminal(other.to_string()),
    }
}

/// The call reached the contract and it had no answer: a revert, or empty
/// return data from an address without that function. Transport trouble is not.
pub fn is_call_revert(err: &alloy::contract::Error) -> bool {
    match err {
        alloy::contract::Error::ZeroData(..) | alloy::contract::Error::AbiError(_) => true,
        alloy::contract::Error::TransportError(RpcError::ErrorResp(payload)) => {
            payload.code == EXECUTION_REVERTED_CODE
                || payload.message.to_ascii_lowercase().contains("revert")
        }
        _ => false,
    }
}
