// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use serde_json::{Value, json};
use thiserror::Error;

/// Why an upstream call failed. `Display` is safe to hand to clients; the
/// underlying transport detail is only logged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    #[error("upstream request timed out")]
    Timeout,
    #[error("upstream connection closed")]
    Closed,
    #[error("upstream unavailable")]
    Unavailable { detail: String },
    #[error("batch requests are not supported on this route")]
    Batch,
    #[error("upstream not configured")]
    NotConfigured,
}

impl UpstreamError {
    pub fn unavailable(detail: impl ToString) -> Self {
        Self::Unavailable {
            detail: detail.to_string(),
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Unavailable { detail } => Some(detail),
            _ => None,
        }
    }
}

pub fn error_envelope(id: Value, code: i64, message: impl Into<String>) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message.into() },
    })
}

/// Id of a single request; `null` for batches and id-less bodies.
pub fn request_id(body: &Value) -> Value {
    body.get("id").cloned().unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_shape() {
        let v = error_envelope(json!(7), -32603, "upstream timed out");
        assert_eq!(v["jsonrpc"], "2.0");
        assert_eq!(v["id"], 7);
        assert_eq!(v["error"]["code"], -32603);
        assert_eq!(v["error"]["message"], "upstream timed out");
    }

    #[test]
    fn unavailable_hides_transport_detail() {
        let e = UpstreamError::unavailable("tcp connect error: 10.0.0.5:8545 refused");
        assert_eq!(e.to_string(), "upstream unavailable");
        assert!(e.detail().unwrap().contains("refused"));
    }

    #[test]
    fn id_is_null_when_absent_or_batch() {
        assert_eq!(request_id(&json!({"id": "abc"})), json!("abc"));
        assert_eq!(request_id(&json!({"method": "eth_chainId"})), Value::Null);
        assert_eq!(request_id(&json!([{"id": 1}])), Value::Null);
    }
}
