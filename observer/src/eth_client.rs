// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::error::{ObserverError, ObserverResult};
use crate::events::{ZETA_RECEIVED_TOPIC, ZETA_SENT_TOPIC};
use crate::metrics::ObserverMetrics;
use ethers::providers::{Http, JsonRpcClient, Middleware, Provider};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address as EthAddress, BlockId, BlockNumber, Bytes, Filter, Log, H256, U256};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tap::TapFallible;
use tracing::info;

/// Ambient per-call deadline for every outbound RPC.
pub const RPC_CALL_DEADLINE: Duration = Duration::from_secs(15);

/// A block header as returned by the chain RPC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    pub number: u64,
    pub hash: H256,
    pub parent_hash: H256,
}

/// Thin client over an EVM JSON-RPC endpoint. Owned by a single chain
/// observer; not shared across chains.
pub struct EthClient<P> {
    provider: Provider<P>,
    /// Expected chain ID for validation
    expected_chain_id: Option<u64>,
    metrics: Arc<ObserverMetrics>,
}

impl EthClient<Http> {
    /// Dial `provider_url` and verify the endpoint answers (and, when an
    /// expected chain id is configured, that it is the right network).
    pub async fn new(
        provider_url: &str,
        expected_chain_id: Option<u64>,
        metrics: Arc<ObserverMetrics>,
    ) -> ObserverResult<Self> {
        let provider = Provider::<Http>::try_from(provider_url).map_err(|e| {
            ObserverError::Configuration(format!("invalid endpoint {}: {}", provider_url, e))
        })?;
        let client = Self {
            provider,
            expected_chain_id,
            metrics,
        };
        client.describe().await?;
        Ok(client)
    }
}

impl<P> EthClient<P>
where
    P: JsonRpcClient + 'static,
{
    pub fn new_with_provider(
        provider: Provider<P>,
        expected_chain_id: Option<u64>,
        metrics: Arc<ObserverMetrics>,
    ) -> Self {
        Self {
            provider,
            expected_chain_id,
            metrics,
        }
    }

    async fn call<T, F>(&self, method: &'static str, fut: F) -> ObserverResult<T>
    where
        F: Future<Output = Result<T, ethers::providers::ProviderError>>,
    {
        self.metrics
            .eth_rpc_queries
            .with_label_values(&[method])
            .inc();
        let _guard = self
            .metrics
            .eth_rpc_queries_latency
            .with_label_values(&[method])
            .start_timer();
        match tokio::time::timeout(RPC_CALL_DEADLINE, fut).await {
            Ok(result) => result.map_err(ObserverError::from),
            Err(_) => Err(ObserverError::TransientProviderError(format!(
                "{} exceeded {:?} deadline",
                method, RPC_CALL_DEADLINE
            ))),
        }
    }

    pub async fn get_chain_id(&self) -> ObserverResult<u64> {
        let chain_id = self.call("eth_chainId", self.provider.get_chainid()).await?;
        Ok(chain_id.as_u64())
    }

    // Validate chain identifier and log connection info
    async fn describe(&self) -> ObserverResult<()> {
        let chain_id = self.get_chain_id().await?;
        let block_number = self.head_height().await?;
        if let Some(expected) = self.expected_chain_id {
            if chain_id != expected {
                return Err(ObserverError::Configuration(format!(
                    "chain id mismatch: expected {}, got {}. This could indicate \
                     connecting to the wrong network",
                    expected, chain_id
                )));
            }
        }
        info!(
            "EthClient connected to chain {}, current block: {}",
            chain_id, block_number
        );
        Ok(())
    }

    /// Current head block number.
    pub async fn head_height(&self) -> ObserverResult<u64> {
        let number = self
            .call("eth_blockNumber", self.provider.get_block_number())
            .await?;
        Ok(number.as_u64())
    }

    /// Header of block `number`, or of the head when `None`.
    pub async fn header_by_number(&self, number: Option<u64>) -> ObserverResult<BlockHeader> {
        let block_id = match number {
            Some(n) => BlockNumber::Number(n.into()),
            None => BlockNumber::Latest,
        };
        let block = self
            .call("eth_getBlockByNumber", self.provider.get_block(block_id))
            .await?
            .ok_or_else(|| {
                ObserverError::ProviderError(format!("block {:?} not found", block_id))
            })?;
        Ok(BlockHeader {
            number: block
                .number
                .ok_or_else(|| {
                    ObserverError::ProviderError("provider returns header without number".into())
                })?
                .as_u64(),
            hash: block.hash.ok_or_else(|| {
                ObserverError::ProviderError("provider returns header without hash".into())
            })?,
            parent_hash: block.parent_hash,
        })
    }

    pub async fn filter_logs(&self, filter: &Filter) -> ObserverResult<Vec<Log>> {
        self.call("eth_getLogs", self.provider.get_logs(filter))
            .await
            .tap_err(|e| tracing::error!("eth_getLogs failed. Filter: {:?}. Error {:?}", filter, e))
    }

    /// `ZetaSent` logs emitted by `contract` in `[from_block, to_block]`.
    /// The filter is built fresh per call; there is no shared topics state.
    pub async fn zeta_sent_logs(
        &self,
        contract: EthAddress,
        from_block: u64,
        to_block: u64,
    ) -> ObserverResult<Vec<Log>> {
        let filter = Filter::new()
            .from_block(from_block)
            .to_block(to_block)
            .address(contract)
            .topic0(*ZETA_SENT_TOPIC);
        let logs = self.filter_logs(&filter).await?;
        // Safeguard check that all events are emitted from the watched contract
        if logs.iter().any(|log| log.address != contract) {
            return Err(ObserverError::ProviderError(format!(
                "provider returns logs from a different contract (expected {:?})",
                contract
            )));
        }
        Ok(logs)
    }

    /// `ZetaReceived` logs carrying `send_hash` in topic3, over the whole
    /// chain history up to the head.
    pub async fn zeta_received_logs_by_send_hash(
        &self,
        contract: EthAddress,
        send_hash: H256,
    ) -> ObserverResult<Vec<Log>> {
        let filter = Filter::new()
            .from_block(0u64)
            .to_block(BlockNumber::Latest)
            .address(contract)
            .topic0(*ZETA_RECEIVED_TOPIC)
            .topic3(send_hash);
        self.filter_logs(&filter).await
    }

    pub async fn suggest_gas_price(&self) -> ObserverResult<U256> {
        self.call("eth_gasPrice", self.provider.get_gas_price())
            .await
    }

    /// Read-only contract call at `block` (head when `None`). The gas
    /// cycle's supply read is the only intended consumer.
    pub async fn eth_call(
        &self,
        tx: &TypedTransaction,
        block: Option<u64>,
    ) -> ObserverResult<Bytes> {
        let block_id = block.map(|n| BlockId::from(n));
        self.call("eth_call", self.provider.call(tx, block_id))
            .await
    }

    /// Pending-state transaction count of `address`.
    pub async fn nonce_at(&self, address: EthAddress) -> ObserverResult<u64> {
        let nonce = self
            .call(
                "eth_getTransactionCount",
                self.provider.get_transaction_count(address, None),
            )
            .await?;
        Ok(nonce.as_u64())
    }
}
