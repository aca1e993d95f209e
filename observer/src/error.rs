// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use ethers::providers::ProviderError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObserverError {
    // Network/timeout class of RPC failure; the current cycle is skipped and
    // the scan cursor is retained.
    TransientProviderError(String),
    // Malformed or inconsistent RPC response
    ProviderError(String),
    // A log failed event decoding; the log is skipped
    DecodingError(String),
    // Coordinator submit/query failure
    CoordinatorError(String),
    // Coordinator has no record for the queried key
    CoordinatorNotFound(String),
    // Cursor store I/O failure
    StorageError(String),
    // Chain is not registered
    UnknownChain(String),
    // Invalid configuration detected at startup
    Configuration(String),
    // Coordinator header bookkeeping is internally inconsistent
    HeaderTraceError(String),
    // Uncategorized error
    Generic(String),
}

impl ObserverError {
    /// Returns a short string identifying the error type for metrics labels
    pub fn error_type(&self) -> &'static str {
        match self {
            ObserverError::TransientProviderError(_) => "transient_provider_error",
            ObserverError::ProviderError(_) => "provider_error",
            ObserverError::DecodingError(_) => "decoding_error",
            ObserverError::CoordinatorError(_) => "coordinator_error",
            ObserverError::CoordinatorNotFound(_) => "coordinator_not_found",
            ObserverError::StorageError(_) => "storage_error",
            ObserverError::UnknownChain(_) => "unknown_chain",
            ObserverError::Configuration(_) => "configuration",
            ObserverError::HeaderTraceError(_) => "header_trace_error",
            ObserverError::Generic(_) => "generic",
        }
    }

    /// Whether retrying the same call on a later tick can succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ObserverError::TransientProviderError(_) | ObserverError::CoordinatorError(_)
        )
    }
}

impl std::fmt::Display for ObserverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for ObserverError {}

impl From<ProviderError> for ObserverError {
    fn from(e: ProviderError) -> Self {
        match e {
            // Transport level failures come back wrapped in the JSON-RPC client
            // error; these are the retryable class.
            ProviderError::JsonRpcClientError(e) => {
                ObserverError::TransientProviderError(format!("{e:?}"))
            }
            ProviderError::HTTPError(e) => ObserverError::TransientProviderError(format!("{e:?}")),
            // A response that does not deserialize is malformed, not retryable.
            ProviderError::SerdeJson(e) => ObserverError::ProviderError(format!("{e:?}")),
            other => ObserverError::ProviderError(format!("{other:?}")),
        }
    }
}

pub type ObserverResult<T> = Result<T, ObserverError>;
