// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Cross-validation of the coordinator's stored block headers: the chain
//! of headers reachable from the latest recorded hash must link back to
//! the earliest recorded height.

use crate::chains::ChainId;
use crate::coordinator_client::{CoordinatorClient, CoordinatorClientInner};
use crate::error::{ObserverError, ObserverResult};
use tracing::{debug, info};

/// Walk the coordinator's headers for `chain_id` from the latest recorded
/// hash along `parent_hash` links until a lookup fails (the natural stop),
/// then require the lowest reached height to be at or below the earliest
/// recorded height.
///
/// A trace that bottoms out above the earliest height means the
/// coordinator's header store has a gap, which is a fatal inconsistency.
pub async fn verify_header_trace<P>(
    coordinator: &CoordinatorClient<P>,
    chain_id: ChainId,
) -> ObserverResult<()>
where
    P: CoordinatorClientInner,
{
    let state = coordinator.get_block_header_state(chain_id).await?;
    if state.earliest_height == 0 {
        return Err(ObserverError::HeaderTraceError(format!(
            "chain {}: no earliest height recorded",
            chain_id
        )));
    }
    if state.latest_height <= state.earliest_height {
        return Err(ObserverError::HeaderTraceError(format!(
            "chain {}: latest height {} not beyond earliest {}",
            chain_id, state.latest_height, state.earliest_height
        )));
    }

    info!(
        "chain {}: tracing headers back from height {} (earliest recorded {})",
        chain_id, state.latest_height, state.earliest_height
    );

    let mut reached = state.latest_height;
    let mut current_hash = state.latest_hash;
    loop {
        match coordinator.get_block_header_by_hash(current_hash).await {
            Ok(header) => {
                reached = header.height;
                current_hash = header.parent_hash;
            }
            Err(e) => {
                debug!(
                    "chain {}: cannot get block header, tracing stops: {:?}",
                    chain_id, e
                );
                break;
            }
        }
    }

    if reached > state.earliest_height {
        return Err(ObserverError::HeaderTraceError(format!(
            "chain {}: header tracing stopped at height {}, above earliest recorded {}",
            chain_id, reached, state.earliest_height
        )));
    }
    info!(
        "chain {}: header tracing succeeded; reached height {} <= earliest {}",
        chain_id, reached, state.earliest_height
    );
    Ok(())
}
