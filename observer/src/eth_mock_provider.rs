// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! A mock EVM JSON-RPC transport keyed by `(method, params)`, with
//! per-method wildcard fallbacks for calls whose exact parameter encoding
//! is irrelevant to the test.

use async_trait::async_trait;
use ethers::providers::{JsonRpcClient, JsonRpcError, ProviderError, RpcError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MockError {
    #[error("no mock response registered for {0}")]
    NoResponse(String),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl RpcError for MockError {
    fn as_error_response(&self) -> Option<&JsonRpcError> {
        None
    }

    fn as_serde_error(&self) -> Option<&serde_json::Error> {
        match self {
            MockError::SerdeJson(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MockError> for ProviderError {
    fn from(e: MockError) -> Self {
        ProviderError::JsonRpcClientError(Box::new(e))
    }
}

#[derive(Clone, Debug, Default)]
pub struct EthMockProvider {
    responses: Arc<Mutex<HashMap<(String, String), Value>>>,
    wildcard_responses: Arc<Mutex<HashMap<String, Value>>>,
}

impl EthMockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the response for an exact `(method, params)` pair.
    pub fn add_response<P: Serialize, R: Serialize>(
        &self,
        method: &str,
        params: P,
        response: R,
    ) -> Result<(), MockError> {
        let key = (method.to_string(), serde_json::to_value(params)?.to_string());
        self.responses
            .lock()
            .unwrap()
            .insert(key, serde_json::to_value(response)?);
        Ok(())
    }

    /// Register the response for `method` regardless of its params. Exact
    /// matches registered with [`Self::add_response`] take precedence.
    pub fn add_wildcard_response<R: Serialize>(
        &self,
        method: &str,
        response: R,
    ) -> Result<(), MockError> {
        self.wildcard_responses
            .lock()
            .unwrap()
            .insert(method.to_string(), serde_json::to_value(response)?);
        Ok(())
    }
}

#[async_trait]
impl JsonRpcClient for EthMockProvider {
    type Error = MockError;

    async fn request<T: Serialize + Send + Sync + Debug, R: DeserializeOwned + Send>(
        &self,
        method: &str,
        params: T,
    ) -> Result<R, MockError> {
        let key = (method.to_string(), serde_json::to_value(&params)?.to_string());
        let value = {
            let exact = self.responses.lock().unwrap().get(&key).cloned();
            match exact {
                Some(value) => value,
                None => self
                    .wildcard_responses
                    .lock()
                    .unwrap()
                    .get(method)
                    .cloned()
                    .ok_or_else(|| MockError::NoResponse(format!("{} {}", key.0, key.1)))?,
            }
        };
        Ok(serde_json::from_value(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::U64;

    #[tokio::test]
    async fn test_exact_match_beats_wildcard() {
        let provider = EthMockProvider::new();
        provider
            .add_wildcard_response("eth_blockNumber", U64::from(1))
            .unwrap();
        provider
            .add_response("eth_blockNumber", (), U64::from(2))
            .unwrap();
        let result: U64 = provider.request("eth_blockNumber", ()).await.unwrap();
        assert_eq!(result, U64::from(2));
    }

    #[tokio::test]
    async fn test_missing_response_is_an_error() {
        let provider = EthMockProvider::new();
        let result: Result<U64, _> = provider.request("eth_blockNumber", ()).await;
        assert!(matches!(result, Err(MockError::NoResponse(_))));
    }

    #[tokio::test]
    async fn test_params_distinguish_responses() {
        let provider = EthMockProvider::new();
        provider
            .add_response("eth_getBalance", ("0x01",), U64::from(10))
            .unwrap();
        provider
            .add_response("eth_getBalance", ("0x02",), U64::from(20))
            .unwrap();
        let a: U64 = provider.request("eth_getBalance", ("0x01",)).await.unwrap();
        let b: U64 = provider.request("eth_getBalance", ("0x02",)).await.unwrap();
        assert_eq!(a, U64::from(10));
        assert_eq!(b, U64::from(20));
    }
}
