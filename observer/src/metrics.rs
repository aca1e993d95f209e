// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use prometheus::{
    register_histogram_vec_with_registry, register_int_counter_vec_with_registry,
    register_int_gauge_vec_with_registry, HistogramVec, IntCounterVec, IntGaugeVec, Registry,
};

const LATENCY_SEC_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10., 15., 20., 30., 60., 120.,
];

#[derive(Clone, Debug)]
pub struct ObserverMetrics {
    pub(crate) last_scanned_block: IntGaugeVec,
    pub(crate) observed_head_block: IntGaugeVec,
    pub(crate) observed_zeta_sent_events: IntCounterVec,
    pub(crate) decode_errors: IntCounterVec,
    pub(crate) coordinator_posts_ok: IntCounterVec,
    pub(crate) coordinator_posts_err: IntCounterVec,
    pub(crate) receive_confirmations: IntCounterVec,
    pub(crate) cursor_store_write_errors: IntCounterVec,
    pub(crate) gas_price_observed: IntGaugeVec,
    pub(crate) eth_rpc_queries: IntCounterVec,
    pub(crate) eth_rpc_queries_latency: HistogramVec,
}

impl ObserverMetrics {
    pub fn new(registry: &Registry) -> Self {
        Self {
            last_scanned_block: register_int_gauge_vec_with_registry!(
                "observer_last_scanned_block",
                "Last block whose logs were fully observed and posted, per chain",
                &["chain"],
                registry,
            )
            .unwrap(),
            observed_head_block: register_int_gauge_vec_with_registry!(
                "observer_head_block",
                "Head block reported by the chain RPC, per chain",
                &["chain"],
                registry,
            )
            .unwrap(),
            observed_zeta_sent_events: register_int_counter_vec_with_registry!(
                "observer_zeta_sent_events",
                "Decoded ZetaSent events, per chain",
                &["chain"],
                registry,
            )
            .unwrap(),
            decode_errors: register_int_counter_vec_with_registry!(
                "observer_decode_errors",
                "Logs skipped because event decoding failed, per chain",
                &["chain"],
                registry,
            )
            .unwrap(),
            coordinator_posts_ok: register_int_counter_vec_with_registry!(
                "observer_coordinator_posts_ok",
                "Successful coordinator submissions, per chain and kind",
                &["chain", "kind"],
                registry,
            )
            .unwrap(),
            coordinator_posts_err: register_int_counter_vec_with_registry!(
                "observer_coordinator_posts_err",
                "Failed coordinator submissions, per chain and kind",
                &["chain", "kind"],
                registry,
            )
            .unwrap(),
            receive_confirmations: register_int_counter_vec_with_registry!(
                "observer_receive_confirmations",
                "Receive confirmations posted to the coordinator, per chain",
                &["chain"],
                registry,
            )
            .unwrap(),
            cursor_store_write_errors: register_int_counter_vec_with_registry!(
                "observer_cursor_store_write_errors",
                "Failed durable writes of the scan cursor, per chain",
                &["chain"],
                registry,
            )
            .unwrap(),
            gas_price_observed: register_int_gauge_vec_with_registry!(
                "observer_gas_price",
                "Last suggested gas price read from the chain RPC, per chain",
                &["chain"],
                registry,
            )
            .unwrap(),
            eth_rpc_queries: register_int_counter_vec_with_registry!(
                "observer_eth_rpc_queries",
                "EVM RPC queries issued, per method",
                &["method"],
                registry,
            )
            .unwrap(),
            eth_rpc_queries_latency: register_histogram_vec_with_registry!(
                "observer_eth_rpc_queries_latency",
                "Latency of EVM RPC queries, per method",
                &["method"],
                LATENCY_SEC_BUCKETS.to_vec(),
                registry,
            )
            .unwrap(),
        }
    }

    pub fn new_for_testing() -> Self {
        let registry = Registry::new();
        Self::new(&registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_register_once() {
        let registry = Registry::new();
        let metrics = ObserverMetrics::new(&registry);
        metrics.last_scanned_block.with_label_values(&["Eth"]).set(10);
        metrics
            .coordinator_posts_ok
            .with_label_values(&["Eth", "send"])
            .inc();
        let families = registry.gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "observer_last_scanned_block"));
    }

    #[test]
    fn test_new_for_testing_is_isolated() {
        // two instances register against separate registries without panicking
        let _a = ObserverMetrics::new_for_testing();
        let _b = ObserverMetrics::new_for_testing();
    }
}
