// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Decoding of the two bridge events emitted by the MPI connector
//! contract.
//!
//! topic0 is the keccak256 of the canonical signature string with no
//! spaces. Logs with an unknown topic0 or undecodable data produce a
//! non-fatal [`ObserverError::DecodingError`]; the caller skips the log and
//! continues its cycle.

use crate::chains::{ChainId, ChainName};
use crate::error::{ObserverError, ObserverResult};
use crate::types::ObservedSend;
use ethers::abi::{self, ParamType, Token};
use ethers::types::{Address as EthAddress, Log, H256, U256};
use ethers::utils::keccak256;
use once_cell::sync::Lazy;

//    event ZetaSent(
//        address indexed originSenderAddress,
//        uint256 destinationChainId,
//        bytes destinationAddress,
//        uint256 zetaAmount,
//        uint256 gasLimit,
//        bytes message,
//        bytes zetaParams
//    );
pub const ZETA_SENT_SIGNATURE: &str =
    "ZetaSent(address,uint256,bytes,uint256,uint256,bytes,bytes)";

//    event ZetaReceived(
//        bytes originSenderAddress,
//        uint256 indexed originChainId,
//        address indexed destinationAddress,
//        uint256 zetaAmount,
//        bytes message,
//        bytes32 indexed internalSendHash
//    );
pub const ZETA_RECEIVED_SIGNATURE: &str =
    "ZetaReceived(bytes,uint256,address,uint256,bytes,bytes32)";

pub static ZETA_SENT_TOPIC: Lazy<H256> =
    Lazy::new(|| H256::from(keccak256(ZETA_SENT_SIGNATURE.as_bytes())));

pub static ZETA_RECEIVED_TOPIC: Lazy<H256> =
    Lazy::new(|| H256::from(keccak256(ZETA_RECEIVED_SIGNATURE.as_bytes())));

/// Decoded `ZetaSent` log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZetaSentEvent {
    pub sender: EthAddress,
    pub dest_chain_id: U256,
    pub dest_contract: Vec<u8>,
    pub zeta_amount: U256,
    pub gas_limit: U256,
    pub message: Vec<u8>,
    pub params: Vec<u8>,
}

/// Decoded `ZetaReceived` log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZetaReceivedEvent {
    pub origin_sender: Vec<u8>,
    pub origin_chain_id: U256,
    pub dest_address: EthAddress,
    pub zeta_amount: U256,
    pub message: Vec<u8>,
    pub send_hash: H256,
}

fn check_topic0(log: &Log, expected: H256, event: &str) -> ObserverResult<()> {
    match log.topics.first() {
        Some(topic0) if *topic0 == expected => Ok(()),
        Some(topic0) => Err(ObserverError::DecodingError(format!(
            "topic0 {:?} does not match {}",
            topic0, event
        ))),
        None => Err(ObserverError::DecodingError(format!(
            "log without topics cannot be {}",
            event
        ))),
    }
}

impl ZetaSentEvent {
    pub fn try_from_log(log: &Log) -> ObserverResult<Self> {
        check_topic0(log, *ZETA_SENT_TOPIC, "ZetaSent")?;
        if log.topics.len() != 2 {
            return Err(ObserverError::DecodingError(format!(
                "ZetaSent expects 2 topics, got {}",
                log.topics.len()
            )));
        }
        let sender = EthAddress::from(log.topics[1]);

        let mut tokens = abi::decode(
            &[
                ParamType::Uint(256),
                ParamType::Bytes,
                ParamType::Uint(256),
                ParamType::Uint(256),
                ParamType::Bytes,
                ParamType::Bytes,
            ],
            &log.data,
        )
        .map_err(|e| ObserverError::DecodingError(format!("ZetaSent data: {}", e)))?
        .into_iter();

        // Token order matches the non-indexed fields of the declaration.
        let dest_chain_id = next_uint(&mut tokens, "destinationChainId")?;
        let dest_contract = next_bytes(&mut tokens, "destinationAddress")?;
        let zeta_amount = next_uint(&mut tokens, "zetaAmount")?;
        let gas_limit = next_uint(&mut tokens, "gasLimit")?;
        let message = next_bytes(&mut tokens, "message")?;
        let params = next_bytes(&mut tokens, "zetaParams")?;

        Ok(Self {
            sender,
            dest_chain_id,
            dest_contract,
            zeta_amount,
            gas_limit,
            message,
            params,
        })
    }

    /// Attach source-chain context, producing the record forwarded to the
    /// coordinator.
    pub fn into_observed_send(
        self,
        source_chain: ChainName,
        source_tx_hash: H256,
        source_block: u64,
    ) -> ObserverResult<ObservedSend> {
        if self.dest_chain_id > U256::from(u64::MAX) {
            return Err(ObserverError::DecodingError(format!(
                "destination chain id {} exceeds u64",
                self.dest_chain_id
            )));
        }
        Ok(ObservedSend {
            source_chain,
            source_tx_hash,
            source_block,
            sender: self.sender,
            dest_chain_id: ChainId(self.dest_chain_id.as_u64()),
            dest_contract: self.dest_contract,
            zeta_amount: self.zeta_amount,
            gas_limit: self.gas_limit,
            message: self.message,
            params: self.params,
        })
    }
}

impl ZetaReceivedEvent {
    pub fn try_from_log(log: &Log) -> ObserverResult<Self> {
        check_topic0(log, *ZETA_RECEIVED_TOPIC, "ZetaReceived")?;
        if log.topics.len() != 4 {
            return Err(ObserverError::DecodingError(format!(
                "ZetaReceived expects 4 topics, got {}",
                log.topics.len()
            )));
        }
        let origin_chain_id = U256::from_big_endian(log.topics[1].as_bytes());
        let dest_address = EthAddress::from(log.topics[2]);
        let send_hash = log.topics[3];

        let mut tokens = abi::decode(
            &[ParamType::Bytes, ParamType::Uint(256), ParamType::Bytes],
            &log.data,
        )
        .map_err(|e| ObserverError::DecodingError(format!("ZetaReceived data: {}", e)))?
        .into_iter();

        let origin_sender = next_bytes(&mut tokens, "originSenderAddress")?;
        let zeta_amount = next_uint(&mut tokens, "zetaAmount")?;
        let message = next_bytes(&mut tokens, "message")?;

        Ok(Self {
            origin_sender,
            origin_chain_id,
            dest_address,
            zeta_amount,
            message,
            send_hash,
        })
    }
}

fn next_uint(
    tokens: &mut std::vec::IntoIter<Token>,
    field: &str,
) -> ObserverResult<U256> {
    tokens
        .next()
        .and_then(Token::into_uint)
        .ok_or_else(|| ObserverError::DecodingError(format!("{} is not a uint256", field)))
}

fn next_bytes(
    tokens: &mut std::vec::IntoIter<Token>,
    field: &str,
) -> ObserverResult<Vec<u8>> {
    tokens
        .next()
        .and_then(Token::into_bytes)
        .ok_or_else(|| ObserverError::DecodingError(format!("{} is not bytes", field)))
}
