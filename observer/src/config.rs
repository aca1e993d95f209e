// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::chains::{ChainDescriptor, ChainName, ChainRegistry};
use crate::error::{ObserverError, ObserverResult};
use ethers::types::Address as EthAddress;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;
use url::Url;
use zeta_observer_config::Config;

/// One watched chain as written in the node config file.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ChainConfig {
    // Symbolic chain name, e.g. "Eth" or "Polygon".
    pub chain: String,
    // Rpc url of the chain fullnode.
    pub endpoint: String,
    // The MPI connector contract emitting the bridge events.
    pub mpi_contract_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_interval_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation_depth: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_blocks_per_cycle: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ObserverNodeConfig {
    // JSON-RPC url of the coordinator.
    pub coordinator_rpc_url: String,
    // Root directory of the per-chain cursor stores.
    pub db_path: PathBuf,
    // The port for the metrics server.
    pub metrics_port: u16,
    // Address of the threshold signer this node reports nonces for.
    pub tss_address: String,
    pub chains: Vec<ChainConfig>,
}

impl Config for ObserverNodeConfig {}

/// Outcome of config validation: everything the node needs to construct
/// its observers.
#[derive(Debug)]
pub struct ValidatedObserverConfig {
    pub coordinator_rpc_url: Url,
    pub db_path: PathBuf,
    pub metrics_port: u16,
    pub tss_address: EthAddress,
    pub registry: ChainRegistry,
    /// Descriptor plus endpoint, in config order.
    pub chains: Vec<(ChainDescriptor, Url)>,
}

impl ObserverNodeConfig {
    /// Reject unknown chains, non-EVM chains, and malformed addresses or
    /// endpoints. Runs at startup; nothing here is checked lazily.
    pub fn validate(&self) -> ObserverResult<ValidatedObserverConfig> {
        info!("Starting config validation");
        if self.chains.is_empty() {
            return Err(ObserverError::Configuration(
                "no chains configured".to_string(),
            ));
        }
        let coordinator_rpc_url = self.coordinator_rpc_url.parse::<Url>().map_err(|e| {
            ObserverError::Configuration(format!(
                "invalid coordinator rpc url {}: {}",
                self.coordinator_rpc_url, e
            ))
        })?;
        let tss_address = EthAddress::from_str(&self.tss_address).map_err(|e| {
            ObserverError::Configuration(format!(
                "invalid tss address {}: {}",
                self.tss_address, e
            ))
        })?;

        let mut chains = Vec::with_capacity(self.chains.len());
        for entry in &self.chains {
            let chain = ChainName::from_str(&entry.chain)?;
            let contract_address = EthAddress::from_str(&entry.mpi_contract_address)
                .map_err(|e| {
                    ObserverError::Configuration(format!(
                        "invalid contract address {} for {}: {}",
                        entry.mpi_contract_address, chain, e
                    ))
                })?;
            let endpoint = entry.endpoint.parse::<Url>().map_err(|e| {
                ObserverError::Configuration(format!(
                    "invalid endpoint {} for {}: {}",
                    entry.endpoint, chain, e
                ))
            })?;

            let mut descriptor = ChainDescriptor::evm_default(chain, contract_address)?;
            if let Some(secs) = entry.poll_interval_secs {
                descriptor = descriptor.with_poll_interval(Duration::from_secs(secs));
            }
            if let Some(depth) = entry.confirmation_depth {
                descriptor = descriptor.with_confirmation_depth(depth);
            }
            if let Some(max_blocks) = entry.max_blocks_per_cycle {
                descriptor = descriptor.with_max_blocks_per_cycle(max_blocks);
            }
            chains.push((descriptor, endpoint));
        }

        let registry =
            ChainRegistry::from_descriptors(chains.iter().map(|(d, _)| d.clone()).collect())?;
        info!("Config validation complete: {} chains", registry.len());
        Ok(ValidatedObserverConfig {
            coordinator_rpc_url,
            db_path: self.db_path.clone(),
            metrics_port: self.metrics_port,
            tss_address,
            registry,
            chains,
        })
    }
}
