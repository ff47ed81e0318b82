// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

use std::time::Duration;

use serde_json::Value;
use url::Url;

use crate::domain::error::AppError;
use crate::services::proxy::envelope::UpstreamError;

/// Stateless forwarder to one fixed JSON-RPC endpoint.
#[derive(Clone, Debug)]
pub struct HttpUpstream {
    client: reqwest::Client,
    url: Url,
}

impl HttpUpstream {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, AppError> {
        let url = Url::parse(url)
            .map_err(|e| AppError::Config(format!("Invalid HTTP upstream '{url}': {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Initialization(format!("HTTP client: {e}")))?;
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Send `body` as-is and hand back the upstream's JSON untouched.
    pub async fn forward(&self, body: &Value) -> Result<Value, UpstreamError> {
        let response = self
            .client
            .post(self.url.clone())
            .json(body)
            .send()
            .await
            .map_err(classify)?;
        let status = response.status();
        response.json::<Value>().await.map_err(|e| {
            if e.is_timeout() {
                UpstreamError::Timeout
            } else {
                UpstreamError::unavailable(format!("non-JSON body (HTTP {status}): {e}"))
            }
        })
    }
}

fn classify(e: reqwest::Error) -> UpstreamError {
    if e.is_timeout() {
        UpstreamError::Timeout
    } else {
        UpstreamError::unavailable(e)
    }
}
