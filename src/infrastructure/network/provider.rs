// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@on1.no>

use crate::common::error::AppError;
use alloy::network::{Ethereum, EthereumWallet};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use std::str::FromStr;
use url::Url;

/// Provider that fills nonce, gas and chain id and signs with one bot key.
pub type SignerProvider = DynProvider<Ethereum>;

pub struct ConnectionFactory;

impl ConnectionFactory {
    pub fn signer(rpc_url: &str, signer: PrivateKeySigner) -> Result<SignerProvider, AppError> {
        let url = parse_url(rpc_url)?;
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url)
            .erased();
        Ok(provider)
    }
}

pub fn parse_signer(private_key: &str) -> Result<PrivateKeySigner, AppError> {
    PrivateKeySigner::from_str(private_key.trim())
        .map_err(|e| AppError::Config(format!("Invalid private key: {}", e)))
}

fn parse_url(rpc_url: &str) -> Result<Url, AppError> {
    Url::parse(rpc_url).map_err(|e| AppError::Config(format!("Invalid RPC URL: {}", e)))
}
