// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 ® John Hauger Mitander <john@oxidity.com>

//! Every read and write the bots make against the deployed market, vault,
//! faucet tokens and oracle. Errors leave this module already classified.

use std::future::Future;
use std::time::Duration;

use alloy::contract::{CallBuilder, CallDecoder};
use alloy::network::{Ethereum, ReceiptResponse, TransactionBuilder};
use alloy::primitives::{Address, B256, Bytes, I256, TxHash, U256};
use alloy::providers::{PendingTransactionBuilder, Provider};
use alloy::rpc::types::TransactionRequest;

use crate::app::config::GlobalSettings;
use crate::common::parsing::{units_from_f64, units_to_f64, unix_now};
use crate::common::retry::retry_async;
use crate::domain::error::{AppError, TxError};
use crate::domain::market::{MarketSnapshot, PositionSnapshot};
use crate::domain::math::ratio_to_f64;
use crate::domain::types::{BotWallet, MarketToken};
use crate::infrastructure::data::abi::IAggregator::IAggregatorInstance;
use crate::infrastructure::data::abi::IMetaMorpho::IMetaMorphoInstance;
use crate::infrastructure::data::abi::IMorpho::IMorphoInstance;
use crate::infrastructure::data::abi::IOracle::IOracleInstance;
use crate::infrastructure::data::abi::{
    IAggregator, IFaucetToken, IMetaMorpho, IMorpho, IOracle, MarketParams,
};
use crate::infrastructure::network::provider::{ConnectionFactory, SignerProvider, parse_signer};
use crate::infrastructure::network::tx_error::{
    classify_contract_error, classify_pending_error, classify_rpc_error, is_call_revert,
};

const READ_ATTEMPTS: usize = 3;
const READ_BACKOFF: Duration = Duration::from_millis(200);
const RECEIPT_TIMEOUT: Duration = Duration::from_secs(120);

/// Addresses of the deployed contracts plus the market key.
#[derive(Debug, Clone)]
pub struct Deployment {
    pub morpho: Address,
    pub params: MarketParams,
    pub vault: Option<Address>,
    pub price_feed: Option<Address>,
}

impl Deployment {
    pub fn from_settings(settings: &GlobalSettings) -> Self {
        Self {
            morpho: settings.morpho_address,
            params: MarketParams {
                loanToken: settings.loan_token,
                collateralToken: settings.collateral_token,
                oracle: settings.oracle_address,
                irm: settings.irm_address,
                lltv: settings.lltv,
            },
            vault: settings.vault_address,
            price_feed: settings.price_feed_address,
        }
    }
}

pub struct MorphoClient {
    provider: SignerProvider,
    account: Address,
    params: MarketParams,
    market_id: B256,
    morpho: IMorphoInstance<SignerProvider>,
    oracle: IOracleInstance<SignerProvider>,
    vault: Option<IMetaMorphoInstance<SignerProvider>>,
    price_feed: Option<IAggregatorInstance<SignerProvider>>,
    loan_decimals: u8,
    collateral_decimals: u8,
    feed_decimals: Option<u8>,
}

async fn read<T, F, Fut>(label: &str, op: F) -> Result<T, TxError>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, alloy::contract::Error>>,
{
    retry_async(label, op, READ_ATTEMPTS, READ_BACKOFF)
        .await
        .map_err(|e| classify_contract_error(&e))
}

/// Like [`read`], but a revert means the contract lacks the function: `None`.
async fn optional_read<T, F, Fut>(label: &str, mut op: F) -> Result<Option<T>, TxError>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, alloy::contract::Error>>,
{
    retry_async(
        label,
        |attempt| {
            let call = op(attempt);
            async move {
                match call.await {
                    Ok(v) => Ok(Some(v)),
                    Err(e) if is_call_revert(&e) => Ok(None),
                    Err(e) => Err(e),
                }
            }
        },
        READ_ATTEMPTS,
        READ_BACKOFF,
    )
    .await
    .map_err(|e| classify_contract_error(&e))
}

impl MorphoClient {
    /// Bind a signing provider to the deployment and cache token decimals.
    pub async fn connect(
        provider: SignerProvider,
        account: Address,
        deployment: &Deployment,
    ) -> Result<Self, AppError> {
        let params = deployment.params.clone();
        let market_id = params.id();
        let morpho = IMorpho::new(deployment.morpho, provider.clone());
        let oracle = IOracle::new(params.oracle, provider.clone());
        let vault = deployment
            .vault
            .map(|addr| IMetaMorpho::new(addr, provider.clone()));
        let price_feed = deployment
            .price_feed
            .map(|addr| IAggregator::new(addr, provider.clone()));

        let mut client = Self {
            provider,
            account,
            params,
            market_id,
            morpho,
            oracle,
            vault,
            price_feed,
            loan_decimals: 18,
            collateral_decimals: 18,
            feed_decimals: None,
        };
        client.loan_decimals = client.token_decimals(client.params.loanToken).await?;
        client.collateral_decimals = client
            .token_decimals(client.params.collateralToken)
            .await?;
        if let Some(feed) = client.price_feed.clone() {
            let decimals = read("feed.decimals", |_| {
                let c = feed.clone();
                async move { c.decimals().call().await }
            })
            .await?;
            client.feed_decimals = Some(decimals);
        }
        Ok(client)
    }

    pub async fn for_wallet(
        rpc_url: &str,
        deployment: &Deployment,
        wallet: &BotWallet,
    ) -> Result<Self, AppError> {
        let provider = ConnectionFactory::signer(rpc_url, wallet.signer()?)?;
        Self::connect(provider, wallet.address, deployment).await
    }

    pub async fn for_key(
        rpc_url: &str,
        deployment: &Deployment,
        private_key: &str,
    ) -> Result<Self, AppError> {
        let signer = parse_signer(private_key)?;
        let account = signer.address();
        let provider = ConnectionFactory::signer(rpc_url, signer)?;
        Self::connect(provider, account, deployment).await
    }

    pub fn account(&self) -> Address {
        self.account
    }

    pub fn lltv(&self) -> U256 {
        self.params.lltv
    }

    pub fn loan_token(&self) -> Address {
        self.params.loanToken
    }

    pub fn collateral_token(&self) -> Address {
        self.params.collateralToken
    }

    pub fn loan_decimals(&self) -> u8 {
        self.loan_decimals
    }

    pub fn collateral_decimals(&self) -> u8 {
        self.collateral_decimals
    }

    pub fn token_address(&self, token: MarketToken) -> Address {
        match token {
            MarketToken::Loan => self.params.loanToken,
            MarketToken::Collateral => self.params.collateralToken,
        }
    }

    pub fn decimals_of(&self, token: Address) -> u8 {
        if token == self.params.collateralToken {
            self.collateral_decimals
        } else {
            self.loan_decimals
        }
    }

    // ---- reads ----

    pub async fn market(&self) -> Result<MarketSnapshot, TxError> {
        let id = self.market_id;
        let raw = read("morpho.market", |_| {
            let c = self.morpho.clone();
            async move { c.market(id).call().await }
        })
        .await?;
        Ok(MarketSnapshot {
            total_supply_assets: U256::from(raw.totalSupplyAssets),
            total_supply_shares: U256::from(raw.totalSupplyShares),
            total_borrow_assets: U256::from(raw.totalBorrowAssets),
            total_borrow_shares: U256::from(raw.totalBorrowShares),
            last_update: u64::try_from(raw.lastUpdate).unwrap_or(u64::MAX),
            fee: U256::from(raw.fee),
        })
    }

    pub async fn position(&self, owner: Address) -> Result<PositionSnapshot, TxError> {
        let id = self.market_id;
        let raw = read("morpho.position", |_| {
            let c = self.morpho.clone();
            async move { c.position(id, owner).call().await }
        })
        .await?;
        Ok(PositionSnapshot {
            supply_shares: raw.supplyShares,
            borrow_shares: U256::from(raw.borrowShares),
            collateral: U256::from(raw.collateral),
        })
    }

    /// Raw oracle price: loan units per collateral unit, scaled by 1e36.
    pub async fn oracle_price(&self) -> Result<U256, TxError> {
        read("oracle.price", |_| {
            let c = self.oracle.clone();
            async move { c.price().call().await }
        })
        .await
    }

    /// Exponent turning a human price into the oracle's raw scale.
    fn oracle_exponent(&self) -> Result<u8, TxError> {
        let exp = 36i32 + i32::from(self.loan_decimals) - i32::from(self.collateral_decimals);
        u8::try_from(exp)
            .map_err(|_| TxError::terminal(format!("unsupported oracle exponent {exp}")))
    }

    /// Price in loan tokens per whole collateral token.
    pub async fn read_price(&self) -> Result<f64, TxError> {
        if let (Some(feed), Some(decimals)) = (self.price_feed.clone(), self.feed_decimals) {
            let round = read("feed.latestRoundData", |_| {
                let c = feed.clone();
                async move { c.latestRoundData().call().await }
            })
            .await?;
            if round.answer.is_negative() {
                return Err(TxError::terminal("price feed answer is negative"));
            }
            return Ok(units_to_f64(round.answer.into_raw(), decimals));
        }
        let raw = self.oracle_price().await?;
        let scale = U256::from(10u8).pow(U256::from(self.oracle_exponent()?));
        Ok(ratio_to_f64(raw, scale))
    }

    pub async fn token_balance(&self, token: Address, owner: Address) -> Result<U256, TxError> {
        let erc20 = IFaucetToken::new(token, self.provider.clone());
        read("erc20.balanceOf", |_| {
            let c = erc20.clone();
            async move { c.balanceOf(owner).call().await }
        })
        .await
    }

    pub async fn token_decimals(&self, token: Address) -> Result<u8, TxError> {
        let erc20 = IFaucetToken::new(token, self.provider.clone());
        read("erc20.decimals", |_| {
            let c = erc20.clone();
            async move { c.decimals().call().await }
        })
        .await
    }

    pub async fn native_balance(&self, owner: Address) -> Result<U256, TxError> {
        retry_async(
            "eth.getBalance",
            |_| {
                let p = self.provider.clone();
                async move { p.get_balance(owner).await }
            },
            READ_ATTEMPTS,
            READ_BACKOFF,
        )
        .await
        .map_err(|e| classify_rpc_error(&e))
    }

    /// Time until `owner` may mint `token` again, per the token contract.
    /// `None` when the token does not expose its cooldown; RPC failures are errors.
    pub async fn faucet_cooldown(
        &self,
        token: Address,
        owner: Address,
    ) -> Result<Option<Duration>, TxError> {
        let erc20 = IFaucetToken::new(token, self.provider.clone());
        let Some(last) = optional_read("faucet.lastMintTime", |_| {
            let c = erc20.clone();
            async move { c.lastMintTime(owner).call().await }
        })
        .await?
        else {
            return Ok(None);
        };
        let Some(cooldown) = optional_read("faucet.MINT_COOLDOWN", |_| {
            let c = erc20.clone();
            async move { c.MINT_COOLDOWN().call().await }
        })
        .await?
        else {
            return Ok(None);
        };
        let ready_at = last.saturating_add(cooldown);
        let now = U256::from(unix_now());
        if ready_at <= now {
            return Ok(Some(Duration::ZERO));
        }
        let wait = u64::try_from(ready_at - now).unwrap_or(u64::MAX);
        Ok(Some(Duration::from_secs(wait)))
    }

    fn vault_contract(&self) -> Result<&IMetaMorphoInstance<SignerProvider>, TxError> {
        self.vault
            .as_ref()
            .ok_or_else(|| TxError::terminal("VAULT_ADDRESS is not configured"))
    }

    pub fn has_vault(&self) -> bool {
        self.vault.is_some()
    }

    pub async fn vault_shares(&self, owner: Address) -> Result<U256, TxError> {
        let vault = self.vault_contract()?;
        read("vault.balanceOf", |_| {
            let c = vault.clone();
            async move { c.balanceOf(owner).call().await }
        })
        .await
    }

    pub async fn vault_assets_of(&self, shares: U256) -> Result<U256, TxError> {
        let vault = self.vault_contract()?;
        read("vault.convertToAssets", |_| {
            let c = vault.clone();
            async move { c.convertToAssets(shares).call().await }
        })
        .await
    }

    /// Remaining deposit capacity across the vault's supply queue.
    pub async fn vault_max_deposit(&self, receiver: Address) -> Result<U256, TxError> {
        let vault = self.vault_contract()?;
        read("vault.maxDeposit", |_| {
            let c = vault.clone();
            async move { c.maxDeposit(receiver).call().await }
        })
        .await
    }

    // ---- writes ----

    async fn confirm(
        &self,
        action: &str,
        pending: PendingTransactionBuilder<Ethereum>,
    ) -> Result<TxHash, TxError> {
        let receipt = pending
            .with_timeout(Some(RECEIPT_TIMEOUT))
            .get_receipt()
            .await
            .map_err(|e| classify_pending_error(&e))?;
        let hash = receipt.transaction_hash();
        if !receipt.status() {
            return Err(TxError::terminal(format!("{action} reverted in {hash}")));
        }
        tracing::debug!(target: "tx", action, tx = %hash, "Confirmed");
        Ok(hash)
    }

    async fn submit<P, D>(&self, action: &str, call: CallBuilder<P, D>) -> Result<TxHash, TxError>
    where
        P: Provider,
        D: CallDecoder,
    {
        let pending = call.send().await.map_err(|e| classify_contract_error(&e))?;
        self.confirm(action, pending).await
    }

    pub async fn transfer_native(&self, to: Address, amount: U256) -> Result<TxHash, TxError> {
        let tx = TransactionRequest::default()
            .with_to(to)
            .with_value(amount);
        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| classify_rpc_error(&e))?;
        self.confirm("transfer", pending).await
    }

    /// Approve `spender` for the maximum amount when the current allowance is short.
    pub async fn ensure_allowance(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<(), TxError> {
        let erc20 = IFaucetToken::new(token, self.provider.clone());
        let owner = self.account;
        let allowance = read("erc20.allowance", |_| {
            let c = erc20.clone();
            async move { c.allowance(owner, spender).call().await }
        })
        .await?;
        if allowance >= amount {
            return Ok(());
        }
        self.submit("approve", erc20.approve(spender, U256::MAX))
            .await
            .map(|_| ())
    }

    pub async fn mint(&self, token: Address, amount: U256) -> Result<TxHash, TxError> {
        let erc20 = IFaucetToken::new(token, self.provider.clone());
        self.submit("mint", erc20.mint(self.account, amount)).await
    }

    pub async fn supply(&self, assets: U256) -> Result<TxHash, TxError> {
        self.ensure_allowance(self.params.loanToken, *self.morpho.address(), assets)
            .await?;
        let call = self.morpho.supply(
            self.params.clone(),
            assets,
            U256::ZERO,
            self.account,
            Bytes::new(),
        );
        self.submit("supply", call).await
    }

    pub async fn withdraw(&self, assets: U256) -> Result<TxHash, TxError> {
        let call = self.morpho.withdraw(
            self.params.clone(),
            assets,
            U256::ZERO,
            self.account,
            self.account,
        );
        self.submit("withdraw", call).await
    }

    pub async fn supply_collateral(&self, assets: U256) -> Result<TxHash, TxError> {
        self.ensure_allowance(self.params.collateralToken, *self.morpho.address(), assets)
            .await?;
        let call =
            self.morpho
                .supplyCollateral(self.params.clone(), assets, self.account, Bytes::new());
        self.submit("supplyCollateral", call).await
    }

    pub async fn borrow(&self, assets: U256) -> Result<TxHash, TxError> {
        let call = self.morpho.borrow(
            self.params.clone(),
            assets,
            U256::ZERO,
            self.account,
            self.account,
        );
        self.submit("borrow", call).await
    }

    pub async fn repay(&self, assets: U256) -> Result<TxHash, TxError> {
        self.ensure_allowance(self.params.loanToken, *self.morpho.address(), assets)
            .await?;
        let call = self.morpho.repay(
            self.params.clone(),
            assets,
            U256::ZERO,
            self.account,
            Bytes::new(),
        );
        self.submit("repay", call).await
    }

    /// Seize `seized_collateral` from `borrower`; the contract computes the repay.
    pub async fn liquidate(
        &self,
        borrower: Address,
        seized_collateral: U256,
        max_repay: U256,
    ) -> Result<TxHash, TxError> {
        self.ensure_allowance(self.params.loanToken, *self.morpho.address(), max_repay)
            .await?;
        let call = self.morpho.liquidate(
            self.params.clone(),
            borrower,
            seized_collateral,
            U256::ZERO,
            Bytes::new(),
        );
        self.submit("liquidate", call).await
    }

    pub async fn vault_deposit(&self, assets: U256) -> Result<TxHash, TxError> {
        let vault = self.vault_contract()?;
        self.ensure_allowance(self.params.loanToken, *vault.address(), assets)
            .await?;
        self.submit("vault.deposit", vault.deposit(assets, self.account))
            .await
    }

    pub async fn vault_redeem(&self, shares: U256) -> Result<TxHash, TxError> {
        let vault = self.vault_contract()?;
        self.submit(
            "vault.redeem",
            vault.redeem(shares, self.account, self.account),
        )
        .await
    }

    /// Push a new price, through the aggregator when one backs the oracle.
    pub async fn write_price(&self, price: f64) -> Result<TxHash, TxError> {
        if let (Some(feed), Some(decimals)) = (&self.price_feed, self.feed_decimals) {
            let raw = units_from_f64(price, decimals)
                .map_err(|e| TxError::terminal(e.to_string()))?;
            let answer = I256::try_from(raw)
                .map_err(|e| TxError::terminal(format!("price out of range: {e}")))?;
            return self
                .submit("feed.updateAnswer", feed.updateAnswer(answer))
                .await;
        }
        let raw = units_from_f64(price, self.oracle_exponent()?)
            .map_err(|e| TxError::terminal(e.to_string()))?;
        self.submit("oracle.setPrice", self.oracle.setPrice(raw)).await
    }
}
