// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::chains::{ChainId, ChainName};
use ethers::types::{Address as EthAddress, H256, U256};
use serde::{Deserialize, Serialize};

/// A `ZetaSent` observation on its source chain, produced and forwarded
/// within one observe cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedSend {
    pub source_chain: ChainName,
    pub source_tx_hash: H256,
    pub source_block: u64,
    pub sender: EthAddress,
    pub dest_chain_id: ChainId,
    pub dest_contract: Vec<u8>,
    pub zeta_amount: U256,
    pub gas_limit: U256,
    pub message: Vec<u8>,
    pub params: Vec<u8>,
}

/// Outcome reported with a receive confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceiveStatus {
    Success,
    Failed,
}

impl std::fmt::Display for ReceiveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReceiveStatus::Success => write!(f, "Success"),
            ReceiveStatus::Failed => write!(f, "Failed"),
        }
    }
}

/// A confirmed `ZetaReceived` observation on a destination chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveConfirmation {
    pub send_hash: H256,
    pub tx_hash: H256,
    pub block: u64,
    pub minted_amount: U256,
    pub status: ReceiveStatus,
    pub chain: ChainName,
}

/// Coordinator-side summary of the block headers it has recorded for one
/// chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeaderState {
    pub earliest_height: u64,
    pub latest_height: u64,
    pub latest_hash: H256,
}

/// One stored block header, addressed by hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeaderRecord {
    pub height: u64,
    pub parent_hash: H256,
}

/// Handle to the threshold signer. The observer only ever reads the
/// signer's address; signing itself happens elsewhere.
pub trait TssSigner: Send + Sync {
    fn address(&self) -> EthAddress;
}

/// Signer handle backed by a fixed address, for wiring and tests.
#[derive(Debug, Clone)]
pub struct StaticTssSigner {
    address: EthAddress,
}

impl StaticTssSigner {
    pub fn new(address: EthAddress) -> Self {
        Self { address }
    }
}

impl TssSigner for StaticTssSigner {
    fn address(&self) -> EthAddress {
        self.address
    }
}
