// Copyright (c) Starcoin, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::{AtomicU64, Ordering};

/// Counter-based 1-in-N sampler for hot log lines.
///
/// The per-tick "observing" line would otherwise dominate log volume on
/// fast chains; callers gate it behind [`SampledLogger::sample`].
#[derive(Debug)]
pub struct SampledLogger {
    every: u64,
    counter: AtomicU64,
}

impl SampledLogger {
    pub fn new(every: u64) -> Self {
        assert!(every > 0, "sampling interval must be positive");
        Self {
            every,
            counter: AtomicU64::new(0),
        }
    }

    /// True on the first call and every `every`-th call thereafter.
    pub fn sample(&self) -> bool {
        self.counter.fetch_add(1, Ordering::Relaxed) % self.every == 0
    }
}
