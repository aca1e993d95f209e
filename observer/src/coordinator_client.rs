// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Typed client for the coordinator.
//!
//! [`CoordinatorClient`] owns the wire marshalling (hex addresses, base64
//! message bytes, decimal amounts) and is generic over a transport-level
//! [`CoordinatorClientInner`], so the JSON-RPC transport and the recording
//! mock used in tests interchange freely. All post operations are
//! at-least-once; deduplication is the coordinator's responsibility.

use crate::chains::{ChainId, ChainName};
use crate::error::{ObserverError, ObserverResult};
use crate::metrics::ObserverMetrics;
use crate::types::{BlockHeaderRecord, BlockHeaderState, ObservedSend, ReceiveConfirmation};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ethers::types::H256;
use ethers::utils::hex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use url::Url;

fn bytes_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Wire form of a `post_send` submission. Addresses and hashes travel as
/// 0x-prefixed lowercase hex, arbitrary bytes as 0x-hex, the message as
/// base64, amounts as decimal strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PostSendRequest {
    pub sender: String,
    pub source_chain: String,
    pub dest_contract: String,
    pub dest_chain: String,
    pub zeta_burnt: String,
    pub zeta_mint: String,
    pub message: String,
    pub tx_hash: String,
    pub block_height: u64,
}

impl PostSendRequest {
    pub fn from_observed_send(send: &ObservedSend) -> Self {
        // A destination id without a registered chain is forwarded verbatim
        // as its decimal form; the coordinator resolves it.
        let dest_chain = match ChainName::from_chain_id(send.dest_chain_id) {
            Some(chain) => chain.to_string(),
            None => send.dest_chain_id.to_string(),
        };
        Self {
            sender: format!("{:?}", send.sender),
            source_chain: send.source_chain.to_string(),
            dest_contract: bytes_hex(&send.dest_contract),
            dest_chain,
            zeta_burnt: send.zeta_amount.to_string(),
            zeta_mint: send.zeta_amount.to_string(),
            message: BASE64.encode(&send.message),
            tx_hash: format!("{:?}", send.source_tx_hash),
            block_height: send.source_block,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PostReceiveConfirmationRequest {
    pub send_hash: String,
    pub tx_hash: String,
    pub block_height: u64,
    pub minted_amount: String,
    pub status: String,
    pub chain: String,
}

impl PostReceiveConfirmationRequest {
    pub fn from_confirmation(confirmation: &ReceiveConfirmation) -> Self {
        Self {
            send_hash: format!("{:?}", confirmation.send_hash),
            tx_hash: format!("{:?}", confirmation.tx_hash),
            block_height: confirmation.block,
            minted_amount: confirmation.minted_amount.to_string(),
            status: confirmation.status.to_string(),
            chain: confirmation.chain.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PostGasPriceRequest {
    pub chain: String,
    pub gas_price: u64,
    pub supply: String,
    pub block_height: u64,
}

/// Transport-level coordinator operations. Every post returns the hash of
/// the coordinator transaction that recorded the observation.
#[async_trait]
pub trait CoordinatorClientInner: Send + Sync {
    async fn post_send(&self, request: PostSendRequest) -> ObserverResult<String>;

    async fn post_receive_confirmation(
        &self,
        request: PostReceiveConfirmationRequest,
    ) -> ObserverResult<String>;

    async fn post_gas_price(&self, request: PostGasPriceRequest) -> ObserverResult<String>;

    async fn post_nonce(&self, chain: ChainName, nonce: u64) -> ObserverResult<String>;

    async fn get_nonce_by_chain(&self, chain: ChainName) -> ObserverResult<u64>;

    async fn get_last_block_height(&self, chain: ChainName) -> ObserverResult<u64>;

    async fn get_block_header_state(&self, chain_id: ChainId)
        -> ObserverResult<BlockHeaderState>;

    async fn get_block_header_by_hash(&self, hash: H256) -> ObserverResult<BlockHeaderRecord>;
}

/// Typed coordinator client.
pub struct CoordinatorClient<P> {
    inner: P,
    metrics: Arc<ObserverMetrics>,
}

impl<P> CoordinatorClient<P>
where
    P: CoordinatorClientInner,
{
    pub fn new(inner: P, metrics: Arc<ObserverMetrics>) -> Self {
        Self { inner, metrics }
    }

    pub fn new_for_testing(inner: P) -> Self {
        Self {
            inner,
            metrics: Arc::new(ObserverMetrics::new_for_testing()),
        }
    }

    fn record_post(&self, chain: &str, kind: &str, result: &ObserverResult<String>) {
        match result {
            Ok(_) => self
                .metrics
                .coordinator_posts_ok
                .with_label_values(&[chain, kind])
                .inc(),
            Err(_) => self
                .metrics
                .coordinator_posts_err
                .with_label_values(&[chain, kind])
                .inc(),
        }
    }

    /// Submit an observed send. Idempotent on the coordinator side by
    /// `(source_chain, source_tx_hash)`; safe to re-submit.
    pub async fn post_send(&self, send: &ObservedSend) -> ObserverResult<String> {
        let chain = send.source_chain.to_string();
        let result = self
            .inner
            .post_send(PostSendRequest::from_observed_send(send))
            .await;
        self.record_post(&chain, "send", &result);
        result
    }

    /// Submit a receive confirmation. Idempotent by `send_hash`.
    pub async fn post_receive_confirmation(
        &self,
        confirmation: &ReceiveConfirmation,
    ) -> ObserverResult<String> {
        let chain = confirmation.chain.to_string();
        let result = self
            .inner
            .post_receive_confirmation(PostReceiveConfirmationRequest::from_confirmation(
                confirmation,
            ))
            .await;
        self.record_post(&chain, "receive_confirmation", &result);
        if result.is_ok() {
            self.metrics
                .receive_confirmations
                .with_label_values(&[&chain])
                .inc();
        }
        result
    }

    /// Latest-wins gas price report for `chain`.
    pub async fn post_gas_price(
        &self,
        chain: ChainName,
        gas_price: u64,
        supply: &str,
        block_height: u64,
    ) -> ObserverResult<String> {
        let result = self
            .inner
            .post_gas_price(PostGasPriceRequest {
                chain: chain.to_string(),
                gas_price,
                supply: supply.to_string(),
                block_height,
            })
            .await;
        self.record_post(&chain.to_string(), "gas_price", &result);
        result
    }

    /// One-shot nonce report; only issued when the coordinator has no nonce
    /// recorded for `chain`.
    pub async fn post_nonce(&self, chain: ChainName, nonce: u64) -> ObserverResult<String> {
        let result = self.inner.post_nonce(chain, nonce).await;
        self.record_post(&chain.to_string(), "nonce", &result);
        result
    }

    pub async fn get_nonce_by_chain(&self, chain: ChainName) -> ObserverResult<u64> {
        self.inner.get_nonce_by_chain(chain).await
    }

    /// Last block height the coordinator has recorded for `chain`, 0 when
    /// it has none.
    pub async fn get_last_block_height(&self, chain: ChainName) -> ObserverResult<u64> {
        self.inner.get_last_block_height(chain).await
    }

    pub async fn get_block_header_state(
        &self,
        chain_id: ChainId,
    ) -> ObserverResult<BlockHeaderState> {
        self.inner.get_block_header_state(chain_id).await
    }

    pub async fn get_block_header_by_hash(
        &self,
        hash: H256,
    ) -> ObserverResult<BlockHeaderRecord> {
        self.inner.get_block_header_by_hash(hash).await
    }
}

/// JSON-RPC error code the coordinator uses for missing records.
const NOT_FOUND_CODE: i64 = -32004;

/// JSON-RPC over HTTP transport to the coordinator.
pub struct CoordinatorJsonRpcClient {
    client: reqwest::Client,
    url: Url,
    next_id: AtomicU64,
}

impl CoordinatorJsonRpcClient {
    pub fn new(url: Url) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("reqwest client construction cannot fail with static options");
        Self {
            client,
            url,
            next_id: AtomicU64::new(1),
        }
    }

    async fn request<T, R>(&self, method: &str, params: T) -> ObserverResult<R>
    where
        T: Serialize + Send + Sync,
        R: DeserializeOwned,
    {
        #[derive(Serialize)]
        struct Request<'a, T> {
            jsonrpc: &'static str,
            id: u64,
            method: &'a str,
            params: T,
        }

        #[derive(Deserialize)]
        struct RpcError {
            code: i64,
            message: String,
        }

        #[derive(Deserialize)]
        struct Response<R> {
            result: Option<R>,
            error: Option<RpcError>,
        }

        let request = Request {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        let response = self
            .client
            .post(self.url.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| ObserverError::CoordinatorError(format!("{} send: {}", method, e)))?;
        let body: Response<R> = response
            .json()
            .await
            .map_err(|e| ObserverError::CoordinatorError(format!("{} response: {}", method, e)))?;
        if let Some(error) = body.error {
            if error.code == NOT_FOUND_CODE {
                return Err(ObserverError::CoordinatorNotFound(error.message));
            }
            return Err(ObserverError::CoordinatorError(format!(
                "{} failed with code {}: {}",
                method, error.code, error.message
            )));
        }
        body.result
            .ok_or_else(|| ObserverError::CoordinatorError(format!("{}: missing result", method)))
    }
}

#[async_trait]
impl CoordinatorClientInner for CoordinatorJsonRpcClient {
    async fn post_send(&self, request: PostSendRequest) -> ObserverResult<String> {
        self.request("observer_postSend", request).await
    }

    async fn post_receive_confirmation(
        &self,
        request: PostReceiveConfirmationRequest,
    ) -> ObserverResult<String> {
        self.request("observer_postReceiveConfirmation", request)
            .await
    }

    async fn post_gas_price(&self, request: PostGasPriceRequest) -> ObserverResult<String> {
        self.request("observer_postGasPrice", request).await
    }

    async fn post_nonce(&self, chain: ChainName, nonce: u64) -> ObserverResult<String> {
        self.request("observer_postNonce", (chain.to_string(), nonce))
            .await
    }

    async fn get_nonce_by_chain(&self, chain: ChainName) -> ObserverResult<u64> {
        self.request("observer_getNonceByChain", (chain.to_string(),))
            .await
    }

    async fn get_last_block_height(&self, chain: ChainName) -> ObserverResult<u64> {
        self.request("observer_getLastBlockHeight", (chain.to_string(),))
            .await
    }

    async fn get_block_header_state(
        &self,
        chain_id: ChainId,
    ) -> ObserverResult<BlockHeaderState> {
        self.request("observer_getBlockHeaderState", (chain_id.0,))
            .await
    }

    async fn get_block_header_by_hash(&self, hash: H256) -> ObserverResult<BlockHeaderRecord> {
        self.request("observer_getBlockHeaderByHash", (format!("{:?}", hash),))
            .await
    }
}
