// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Static chain descriptors and the registry of watched chains.
//!
//! Per-chain differences are purely data; a single observer implementation
//! parameterized by a [`ChainDescriptor`] covers all EVM chains.

use crate::error::{ObserverError, ObserverResult};
use ethers::types::Address as EthAddress;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

/// Blocks read per observe cycle, at most.
pub const MAX_BLOCKS_PER_CYCLE: u64 = 10;

/// Baseline interval of the gas price reporting task.
pub const GAS_PRICE_POLL_INTERVAL: Duration = Duration::from_secs(24);

/// Stable numeric identifier of an external chain. Distinct from the
/// symbolic name; used as the primary key throughout.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct ChainId(pub u64);

impl std::fmt::Display for ChainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The set of chains the coordinator knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ChainName {
    Eth,
    Ropsten,
    Goerli,
    Bsc,
    BscTestnet,
    Polygon,
    Mumbai,
    Baobab,
    BtcTestnet,
}

impl ChainName {
    pub const ALL: &'static [ChainName] = &[
        ChainName::Eth,
        ChainName::Ropsten,
        ChainName::Goerli,
        ChainName::Bsc,
        ChainName::BscTestnet,
        ChainName::Polygon,
        ChainName::Mumbai,
        ChainName::Baobab,
        ChainName::BtcTestnet,
    ];

    pub fn chain_id(&self) -> ChainId {
        match self {
            ChainName::Eth => ChainId(1),
            ChainName::Ropsten => ChainId(3),
            ChainName::Goerli => ChainId(5),
            ChainName::Bsc => ChainId(56),
            ChainName::BscTestnet => ChainId(97),
            ChainName::Polygon => ChainId(137),
            ChainName::Mumbai => ChainId(80001),
            ChainName::Baobab => ChainId(1001),
            ChainName::BtcTestnet => ChainId(18332),
        }
    }

    pub fn from_chain_id(id: ChainId) -> Option<ChainName> {
        Self::ALL.iter().copied().find(|c| c.chain_id() == id)
    }

    /// The Bitcoin-style chain has a dedicated node client outside this
    /// crate; only EVM chains can be observed here.
    pub fn is_evm(&self) -> bool {
        !matches!(self, ChainName::BtcTestnet)
    }
}

impl std::fmt::Display for ChainName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ChainName::Eth => "Eth",
            ChainName::Ropsten => "Ropsten",
            ChainName::Goerli => "Goerli",
            ChainName::Bsc => "Bsc",
            ChainName::BscTestnet => "BscTestnet",
            ChainName::Polygon => "Polygon",
            ChainName::Mumbai => "Mumbai",
            ChainName::Baobab => "Baobab",
            ChainName::BtcTestnet => "BtcTestnet",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for ChainName {
    type Err = ObserverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| ObserverError::UnknownChain(s.to_string()))
    }
}

/// Which contract ABI the watched address speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ContractAbi {
    /// The MPI bridge connector emitting `ZetaSent` / `ZetaReceived`.
    #[default]
    MpiConnector,
}

/// Immutable per-chain configuration, created at process start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainDescriptor {
    pub chain: ChainName,
    pub chain_id: ChainId,
    pub contract_address: EthAddress,
    pub abi: ContractAbi,
    pub poll_interval: Duration,
    pub gas_poll_interval: Duration,
    pub confirmation_depth: u64,
    pub max_blocks_per_cycle: u64,
}

impl ChainDescriptor {
    /// Descriptor with the chain's default poll interval and confirmation
    /// depth, watching `contract_address`.
    pub fn evm_default(chain: ChainName, contract_address: EthAddress) -> ObserverResult<Self> {
        if !chain.is_evm() {
            return Err(ObserverError::Configuration(format!(
                "{} is not an EVM chain; it has no EVM observer descriptor",
                chain
            )));
        }
        let (block_time_secs, confirmation_depth) = match chain {
            ChainName::Eth => (14, 12),
            ChainName::Ropsten => (14, 12),
            ChainName::Goerli => (15, 12),
            ChainName::Bsc => (3, 15),
            ChainName::BscTestnet => (3, 15),
            ChainName::Polygon => (2, 64),
            ChainName::Mumbai => (2, 64),
            ChainName::Baobab => (1, 10),
            ChainName::BtcTestnet => unreachable!("rejected above"),
        };
        Ok(Self {
            chain,
            chain_id: chain.chain_id(),
            contract_address,
            abi: ContractAbi::MpiConnector,
            poll_interval: Duration::from_secs(block_time_secs),
            gas_poll_interval: GAS_PRICE_POLL_INTERVAL,
            confirmation_depth,
            max_blocks_per_cycle: MAX_BLOCKS_PER_CYCLE,
        })
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_confirmation_depth(mut self, depth: u64) -> Self {
        self.confirmation_depth = depth;
        self
    }

    pub fn with_max_blocks_per_cycle(mut self, max_blocks: u64) -> Self {
        self.max_blocks_per_cycle = max_blocks;
        self
    }
}

/// Lookup of watched chains by id or symbolic name. Built once during
/// startup validation; unknown chains are rejected there, not lazily.
#[derive(Debug, Clone, Default)]
pub struct ChainRegistry {
    chains: BTreeMap<ChainId, ChainDescriptor>,
}

impl ChainRegistry {
    pub fn from_descriptors(descriptors: Vec<ChainDescriptor>) -> ObserverResult<Self> {
        let mut chains = BTreeMap::new();
        for descriptor in descriptors {
            if chains
                .insert(descriptor.chain_id, descriptor.clone())
                .is_some()
            {
                return Err(ObserverError::Configuration(format!(
                    "duplicate descriptor for chain {}",
                    descriptor.chain
                )));
            }
        }
        Ok(Self { chains })
    }

    pub fn get_by_id(&self, id: ChainId) -> ObserverResult<&ChainDescriptor> {
        self.chains
            .get(&id)
            .ok_or_else(|| ObserverError::UnknownChain(format!("chain id {}", id)))
    }

    pub fn get_by_name(&self, name: ChainName) -> ObserverResult<&ChainDescriptor> {
        self.get_by_id(name.chain_id())
            .map_err(|_| ObserverError::UnknownChain(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChainDescriptor> {
        self.chains.values()
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}
