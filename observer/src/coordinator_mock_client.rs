// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! A mock coordinator transport used in test environments. Records every
//! post and serves query results from settable tables.

use crate::chains::{ChainId, ChainName};
use crate::coordinator_client::{
    CoordinatorClientInner, PostGasPriceRequest, PostReceiveConfirmationRequest, PostSendRequest,
};
use crate::error::{ObserverError, ObserverResult};
use crate::types::{BlockHeaderRecord, BlockHeaderState};
use async_trait::async_trait;
use ethers::types::H256;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone, Debug, Default)]
pub struct CoordinatorMockClient {
    sends: Arc<Mutex<Vec<PostSendRequest>>>,
    receive_confirmations: Arc<Mutex<Vec<PostReceiveConfirmationRequest>>>,
    gas_prices: Arc<Mutex<Vec<PostGasPriceRequest>>>,
    nonces_posted: Arc<Mutex<Vec<(ChainName, u64)>>>,
    nonce_by_chain: Arc<Mutex<HashMap<ChainName, u64>>>,
    last_block_height: Arc<Mutex<HashMap<ChainName, u64>>>,
    header_states: Arc<Mutex<HashMap<ChainId, BlockHeaderState>>>,
    headers_by_hash: Arc<Mutex<HashMap<H256, BlockHeaderRecord>>>,
    post_send_failures: Arc<AtomicU64>,
    next_tx_hash: Arc<AtomicU64>,
}

impl CoordinatorMockClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_tx_hash(&self) -> String {
        format!(
            "coordinator-tx-{}",
            self.next_tx_hash.fetch_add(1, Ordering::Relaxed)
        )
    }

    pub fn recorded_sends(&self) -> Vec<PostSendRequest> {
        self.sends.lock().unwrap().clone()
    }

    pub fn recorded_receive_confirmations(&self) -> Vec<PostReceiveConfirmationRequest> {
        self.receive_confirmations.lock().unwrap().clone()
    }

    pub fn recorded_gas_prices(&self) -> Vec<PostGasPriceRequest> {
        self.gas_prices.lock().unwrap().clone()
    }

    pub fn recorded_nonces(&self) -> Vec<(ChainName, u64)> {
        self.nonces_posted.lock().unwrap().clone()
    }

    /// Make the next `post_send` call fail; calling this repeatedly queues
    /// one failure per call.
    pub fn fail_next_post_send(&self) {
        self.post_send_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_nonce(&self, chain: ChainName, nonce: u64) {
        self.nonce_by_chain.lock().unwrap().insert(chain, nonce);
    }

    pub fn set_last_block_height(&self, chain: ChainName, height: u64) {
        self.last_block_height.lock().unwrap().insert(chain, height);
    }

    pub fn set_block_header_state(&self, chain_id: ChainId, state: BlockHeaderState) {
        self.header_states.lock().unwrap().insert(chain_id, state);
    }

    pub fn add_block_header(&self, hash: H256, record: BlockHeaderRecord) {
        self.headers_by_hash.lock().unwrap().insert(hash, record);
    }
}

#[async_trait]
impl CoordinatorClientInner for CoordinatorMockClient {
    async fn post_send(&self, request: PostSendRequest) -> ObserverResult<String> {
        if self
            .post_send_failures
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ObserverError::CoordinatorError(
                "injected post_send failure".to_string(),
            ));
        }
        self.sends.lock().unwrap().push(request);
        Ok(self.next_tx_hash())
    }

    async fn post_receive_confirmation(
        &self,
        request: PostReceiveConfirmationRequest,
    ) -> ObserverResult<String> {
        self.receive_confirmations.lock().unwrap().push(request);
        Ok(self.next_tx_hash())
    }

    async fn post_gas_price(&self, request: PostGasPriceRequest) -> ObserverResult<String> {
        self.gas_prices.lock().unwrap().push(request);
        Ok(self.next_tx_hash())
    }

    async fn post_nonce(&self, chain: ChainName, nonce: u64) -> ObserverResult<String> {
        self.nonces_posted.lock().unwrap().push((chain, nonce));
        self.nonce_by_chain.lock().unwrap().insert(chain, nonce);
        Ok(self.next_tx_hash())
    }

    async fn get_nonce_by_chain(&self, chain: ChainName) -> ObserverResult<u64> {
        self.nonce_by_chain
            .lock()
            .unwrap()
            .get(&chain)
            .copied()
            .ok_or_else(|| {
                ObserverError::CoordinatorNotFound(format!("no nonce recorded for {}", chain))
            })
    }

    async fn get_last_block_height(&self, chain: ChainName) -> ObserverResult<u64> {
        Ok(self
            .last_block_height
            .lock()
            .unwrap()
            .get(&chain)
            .copied()
            .unwrap_or(0))
    }

    async fn get_block_header_state(
        &self,
        chain_id: ChainId,
    ) -> ObserverResult<BlockHeaderState> {
        self.header_states
            .lock()
            .unwrap()
            .get(&chain_id)
            .cloned()
            .ok_or_else(|| {
                ObserverError::CoordinatorNotFound(format!(
                    "no header state for chain id {}",
                    chain_id
                ))
            })
    }

    async fn get_block_header_by_hash(&self, hash: H256) -> ObserverResult<BlockHeaderRecord> {
        self.headers_by_hash
            .lock()
            .unwrap()
            .get(&hash)
            .cloned()
            .ok_or_else(|| {
                ObserverError::CoordinatorNotFound(format!("no header for hash {:?}", hash))
            })
    }
}
