// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Per-chain observer: advances a durable confirmed-scan cursor, forwards
//! decoded bridge events to the coordinator, publishes gas prices and
//! answers point queries about executed sends.

use crate::chains::ChainDescriptor;
use crate::coordinator_client::{CoordinatorClient, CoordinatorClientInner};
use crate::cursor_store::CursorStore;
use crate::error::{ObserverError, ObserverResult};
use crate::eth_client::EthClient;
use crate::events::{ZetaReceivedEvent, ZetaSentEvent, ZETA_RECEIVED_TOPIC};
use crate::metrics::ObserverMetrics;
use crate::retry_with_max_elapsed_time;
use crate::types::{ReceiveConfirmation, ReceiveStatus, TssSigner};
use crate::utils::SampledLogger;
use ethers::providers::{Http, JsonRpcClient};
use ethers::types::H256;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// The per-tick "observing" line is emitted once every this many cycles.
const OBSERVING_LOG_SAMPLE_EVERY: u64 = 10;

// lockedAmount on Eth, totalSupply on other chains.
// TODO: read getLockedAmount/totalSupply from the connector contract once
// the coordinator consumes a real value here.
const SUPPLY_PLACEHOLDER: &str = "100";

/// The `[from, to]` window the next observe cycle should scan, or `None`
/// when there is no confirmed block beyond the cursor (including the case
/// of a chain younger than its confirmation depth).
pub fn compute_scan_window(
    head: u64,
    confirmation_depth: u64,
    last_scanned: u64,
    max_blocks_per_cycle: u64,
) -> Option<(u64, u64)> {
    let confirmed = head.checked_sub(confirmation_depth)?;
    if confirmed <= last_scanned {
        return None;
    }
    let to_block = (last_scanned + max_blocks_per_cycle).min(confirmed);
    Some((last_scanned + 1, to_block))
}

fn hash_prefix(hash: &H256) -> String {
    format!("{:?}", hash)[..10].to_string()
}

/// One observer per watched chain. Owns its RPC client, cursor store row
/// and tickers; shares the coordinator client and the signer handle.
pub struct ChainObserver<P, C> {
    descriptor: ChainDescriptor,
    eth_client: EthClient<P>,
    coordinator: Arc<CoordinatorClient<C>>,
    tss: Arc<dyn TssSigner>,
    cursor_store: CursorStore,
    // Written only by construction and the observe cycle; the point query
    // and tests read it concurrently.
    last_scanned: AtomicU64,
    sample_logger: SampledLogger,
    metrics: Arc<ObserverMetrics>,
}

impl<C> ChainObserver<Http, C>
where
    C: CoordinatorClientInner + 'static,
{
    /// Dial the chain endpoint and bootstrap the scan cursor. Fails on
    /// dial/validation errors.
    pub async fn new(
        descriptor: ChainDescriptor,
        endpoint: &str,
        coordinator: Arc<CoordinatorClient<C>>,
        tss: Arc<dyn TssSigner>,
        db_root: &Path,
        metrics: Arc<ObserverMetrics>,
    ) -> ObserverResult<Self> {
        let eth_client =
            EthClient::new(endpoint, Some(descriptor.chain_id.0), metrics.clone()).await?;
        Self::new_with_clients(descriptor, eth_client, coordinator, tss, db_root, metrics).await
    }
}

impl<P, C> ChainObserver<P, C>
where
    P: JsonRpcClient + 'static,
    C: CoordinatorClientInner + 'static,
{
    pub async fn new_with_clients(
        descriptor: ChainDescriptor,
        eth_client: EthClient<P>,
        coordinator: Arc<CoordinatorClient<C>>,
        tss: Arc<dyn TssSigner>,
        db_root: &Path,
        metrics: Arc<ObserverMetrics>,
    ) -> ObserverResult<Self> {
        let chain = descriptor.chain;
        let cursor_store = CursorStore::open(db_root, &chain.to_string())?;

        let last_scanned = match cursor_store.load()? {
            Some(height) => height,
            None => {
                info!(
                    "[{}] no stored cursor; asking coordinator for its last height",
                    chain
                );
                let mut height = match coordinator.get_last_block_height(chain).await {
                    Ok(height) => height,
                    Err(e) => {
                        warn!("[{}] get_last_block_height: {:?}", chain, e);
                        0
                    }
                };
                if height == 0 {
                    // Coordinator has never heard from this chain either;
                    // start at the current head.
                    height = match retry_with_max_elapsed_time!(
                        eth_client.head_height(),
                        Duration::from_secs(30)
                    ) {
                        Ok(Ok(head)) => head,
                        _ => {
                            return Err(ObserverError::TransientProviderError(format!(
                                "[{}] failed to fetch head for cursor bootstrap",
                                chain
                            )))
                        }
                    };
                }
                if let Err(e) = cursor_store.store(height) {
                    error!("[{}] error writing initial cursor: {:?}", chain, e);
                    metrics
                        .cursor_store_write_errors
                        .with_label_values(&[&chain.to_string()])
                        .inc();
                }
                height
            }
        };
        info!("[{}] start scanning from block {}", chain, last_scanned);
        info!(
            "[{}] ZetaReceived topic hash {:?}",
            chain, *ZETA_RECEIVED_TOPIC
        );

        Ok(Self {
            descriptor,
            eth_client,
            coordinator,
            tss,
            cursor_store,
            last_scanned: AtomicU64::new(last_scanned),
            sample_logger: SampledLogger::new(OBSERVING_LOG_SAMPLE_EVERY),
            metrics,
        })
    }

    pub fn descriptor(&self) -> &ChainDescriptor {
        &self.descriptor
    }

    pub fn last_scanned(&self) -> u64 {
        self.last_scanned.load(Ordering::SeqCst)
    }

    /// Report the TSS account nonce once, if the coordinator has no nonce
    /// recorded for this chain yet. Invoked at startup, not per cycle.
    pub async fn post_nonce_if_not_recorded(&self) -> ObserverResult<()> {
        let chain = self.descriptor.chain;
        if self.coordinator.get_nonce_by_chain(chain).await.is_ok() {
            return Ok(());
        }
        let nonce = self.eth_client.nonce_at(self.tss.address()).await?;
        debug!("[{}] posting nonce {}", chain, nonce);
        self.coordinator.post_nonce(chain, nonce).await?;
        Ok(())
    }

    /// One observe cycle: scan a bounded window of confirmed blocks for
    /// `ZetaSent` logs, forward each to the coordinator, then advance the
    /// cursor.
    ///
    /// The cursor advances to the window end even when individual posts
    /// errored: the coordinator deduplicates, and the window will have
    /// moved past those blocks on the next cycle.
    pub async fn observe_cycle(&self) -> ObserverResult<()> {
        let chain = self.descriptor.chain;
        let head = self.eth_client.head_height().await?;
        self.metrics
            .observed_head_block
            .with_label_values(&[&chain.to_string()])
            .set(head as i64);

        let last_scanned = self.last_scanned();
        let Some((from_block, to_block)) = compute_scan_window(
            head,
            self.descriptor.confirmation_depth,
            last_scanned,
            self.descriptor.max_blocks_per_cycle,
        ) else {
            // No new confirmed block, or the chain is still booting.
            return Ok(());
        };

        if self.sample_logger.sample() {
            let confirmed = head - self.descriptor.confirmation_depth;
            info!(
                "[{}] current block {}, querying from {} to {}, {} blocks left to catch up, \
                 watching contract {:?}",
                chain,
                head,
                from_block,
                to_block,
                confirmed - to_block,
                self.descriptor.contract_address
            );
        }

        let logs = self
            .eth_client
            .zeta_sent_logs(self.descriptor.contract_address, from_block, to_block)
            .await?;

        // Logs arrive in (block, log index) order and are forwarded in that
        // order.
        for log in &logs {
            let (block_number, tx_hash) = match (log.block_number, log.transaction_hash) {
                (Some(block_number), Some(tx_hash)) => (block_number.as_u64(), tx_hash),
                _ => {
                    warn!(
                        "[{}] provider returned log without block number or tx hash; skipping",
                        chain
                    );
                    self.metrics
                        .decode_errors
                        .with_label_values(&[&chain.to_string()])
                        .inc();
                    continue;
                }
            };
            let topic0 = log
                .topics
                .first()
                .map(hash_prefix)
                .unwrap_or_else(|| "none".to_string());
            info!(
                "[{}] block {} tx {} topic {}",
                chain,
                block_number,
                hash_prefix(&tx_hash),
                topic0
            );
            let send = match ZetaSentEvent::try_from_log(log)
                .and_then(|event| event.into_observed_send(chain, tx_hash, block_number))
            {
                Ok(send) => send,
                Err(e) => {
                    warn!("[{}] decoding error, skipping log: {:?}", chain, e);
                    self.metrics
                        .decode_errors
                        .with_label_values(&[&chain.to_string()])
                        .inc();
                    continue;
                }
            };
            self.metrics
                .observed_zeta_sent_events
                .with_label_values(&[&chain.to_string()])
                .inc();
            match self.coordinator.post_send(&send).await {
                Ok(coordinator_tx) => {
                    debug!(
                        "[{}] send forwarded: coordinator tx {}",
                        chain, coordinator_tx
                    );
                }
                Err(e) => {
                    error!("[{}] error posting send to coordinator: {:?}", chain, e);
                    continue;
                }
            }
        }

        self.advance_cursor(to_block);
        Ok(())
    }

    fn advance_cursor(&self, to_block: u64) {
        let chain = self.descriptor.chain;
        self.last_scanned.store(to_block, Ordering::SeqCst);
        self.metrics
            .last_scanned_block
            .with_label_values(&[&chain.to_string()])
            .set(to_block as i64);
        if let Err(e) = self.cursor_store.store(to_block) {
            // The in-memory cursor stays ahead; the next successful write
            // catches the store up.
            error!("[{}] error writing cursor to store: {:?}", chain, e);
            self.metrics
                .cursor_store_write_errors
                .with_label_values(&[&chain.to_string()])
                .inc();
        } else {
            debug!("[{}] cursor advanced to {}", chain, to_block);
        }
    }

    /// Whether the send identified by `send_hash` has been executed on this
    /// chain: `(included, confirmed)`. A confirmed receive is also posted
    /// to the coordinator.
    pub async fn is_send_processed(&self, send_hash: H256) -> ObserverResult<(bool, bool)> {
        let chain = self.descriptor.chain;
        let logs = self
            .eth_client
            .zeta_received_logs_by_send_hash(self.descriptor.contract_address, send_hash)
            .await?;
        if logs.is_empty() {
            return Ok((false, false));
        }
        if logs.len() > 1 {
            // A send hash resolving to more than one receive is a
            // protocol-level violation, not a recoverable condition.
            error!(
                "[{}] more than one ZetaReceived log with send hash {:?}",
                chain, send_hash
            );
            error!(
                "[{}] first: {:?} second: {:?}",
                chain, logs[0], logs[1]
            );
            panic!(
                "more than one ZetaReceived log with send hash {:?} on {}",
                send_hash, chain
            );
        }

        let log = &logs[0];
        let event = ZetaReceivedEvent::try_from_log(log)?;
        let block_number = log
            .block_number
            .ok_or_else(|| {
                ObserverError::ProviderError("provider returns log without block_number".into())
            })?
            .as_u64();
        let tx_hash = log.transaction_hash.ok_or_else(|| {
            ObserverError::ProviderError("provider returns log without transaction_hash".into())
        })?;

        let last_scanned = self.last_scanned();
        if block_number + self.descriptor.confirmation_depth <= last_scanned {
            info!(
                "[{}] send {:?} confirmed at block {}; posting receive confirmation",
                chain, send_hash, block_number
            );
            let confirmation = ReceiveConfirmation {
                send_hash,
                tx_hash,
                block: block_number,
                minted_amount: event.zeta_amount,
                status: ReceiveStatus::Success,
                chain,
            };
            let coordinator_tx = self
                .coordinator
                .post_receive_confirmation(&confirmation)
                .await?;
            debug!(
                "[{}] receive confirmation recorded: coordinator tx {}",
                chain, coordinator_tx
            );
            Ok((true, true))
        } else {
            info!(
                "[{}] send {:?} included at block {} but not yet confirmed (last scanned {})",
                chain, send_hash, block_number, last_scanned
            );
            Ok((true, false))
        }
    }

    /// One gas cycle: read the suggested gas price and head height, report
    /// both to the coordinator (latest wins there).
    pub async fn post_gas_price(&self) -> ObserverResult<()> {
        let chain = self.descriptor.chain;
        let gas_price = self.eth_client.suggest_gas_price().await?;
        let block_number = self.eth_client.head_height().await?;
        self.metrics
            .gas_price_observed
            .with_label_values(&[&chain.to_string()])
            .set(gas_price.low_u64() as i64);
        self.coordinator
            .post_gas_price(chain, gas_price.low_u64(), SUPPLY_PLACEHOLDER, block_number)
            .await?;
        Ok(())
    }

    /// Spawn the observe and gas tasks for this chain. Both stop on
    /// cancellation; in-flight cycles are allowed to finish.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        let observer = self.clone();
        let cancel_clone = cancel.clone();
        handles.push(tokio::spawn(async move {
            observer.run_observe_task(cancel_clone).await;
        }));

        let observer = self;
        handles.push(tokio::spawn(async move {
            observer.run_gas_task(cancel).await;
        }));

        handles
    }

    async fn run_observe_task(&self, cancel: CancellationToken) {
        let chain = self.descriptor.chain;
        info!(
            "[{}] starting observe task (poll interval {:?})",
            chain, self.descriptor.poll_interval
        );
        let mut interval = time::interval(self.descriptor.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("[{}] observe task cancelled", chain);
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.observe_cycle().await {
                        warn!("[{}] observe cycle error: {:?}", chain, e);
                    }
                }
            }
        }
    }

    async fn run_gas_task(&self, cancel: CancellationToken) {
        let chain = self.descriptor.chain;
        info!(
            "[{}] starting gas price task (poll interval {:?})",
            chain, self.descriptor.gas_poll_interval
        );
        let mut interval = time::interval(self.descriptor.gas_poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("[{}] gas price task cancelled", chain);
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.post_gas_price().await {
                        warn!("[{}] gas price cycle error: {:?}", chain, e);
                    }
                }
            }
        }
    }

    /// Close the cursor store. Call after cancelling and joining the tasks.
    pub fn stop(&self) {
        self.cursor_store.close();
    }
}
