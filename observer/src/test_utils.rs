// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Builders for correctly ABI-encoded bridge event logs.

use crate::events::{ZETA_RECEIVED_TOPIC, ZETA_SENT_TOPIC};
use ethers::abi::{self, Token};
use ethers::types::{Address as EthAddress, Bytes, Log, H256, U256, U64};

/// Deterministic transaction hash derived from the block number, so tests
/// can assert on forwarded hashes.
pub fn test_tx_hash(block: u64) -> H256 {
    H256::from_low_u64_be(0xfeed_0000_0000 + block)
}

pub fn zeta_sent_log(
    contract: EthAddress,
    block: u64,
    sender: EthAddress,
    dest_chain_id: U256,
    dest_contract: Vec<u8>,
    zeta_amount: U256,
    gas_limit: U256,
    message: Vec<u8>,
    params: Vec<u8>,
) -> Log {
    let data = abi::encode(&[
        Token::Uint(dest_chain_id),
        Token::Bytes(dest_contract),
        Token::Uint(zeta_amount),
        Token::Uint(gas_limit),
        Token::Bytes(message),
        Token::Bytes(params),
    ]);
    Log {
        address: contract,
        topics: vec![*ZETA_SENT_TOPIC, H256::from(sender)],
        data: Bytes::from(data),
        block_number: Some(U64::from(block)),
        transaction_hash: Some(test_tx_hash(block)),
        log_index: Some(U256::zero()),
        ..Default::default()
    }
}

pub fn zeta_received_log(
    contract: EthAddress,
    block: u64,
    origin_chain_id: U256,
    dest_address: EthAddress,
    send_hash: H256,
    zeta_amount: U256,
    message: Vec<u8>,
) -> Log {
    let mut origin_chain_topic = [0u8; 32];
    origin_chain_id.to_big_endian(&mut origin_chain_topic);
    let data = abi::encode(&[
        Token::Bytes(vec![0xaa; 20]),
        Token::Uint(zeta_amount),
        Token::Bytes(message),
    ]);
    Log {
        address: contract,
        topics: vec![
            *ZETA_RECEIVED_TOPIC,
            H256::from(origin_chain_topic),
            H256::from(dest_address),
            send_hash,
        ],
        data: Bytes::from(data),
        block_number: Some(U64::from(block)),
        transaction_hash: Some(test_tx_hash(block)),
        log_index: Some(U256::zero()),
        ..Default::default()
    }
}
