//! Backend call accounting.
//!
//! Every `generate` call made on behalf of a [`Verifier`](crate::Verifier)
//! is counted here, so a batch can report how many round-trips it cost.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::providers::{LlmProvider, ProviderError};

#[derive(Debug, Default)]
struct StatsInner {
    calls: u64,
    failures: u64,
    total_latency: Duration,
    max_latency: Duration,
}

/// Thread-safe counters for backend calls.
#[derive(Debug, Default)]
pub struct CallStats {
    inner: Mutex<StatsInner>,
}

/// Point-in-time copy of [`CallStats`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CallStatsSnapshot {
    pub calls: u64,
    pub failures: u64,
    pub total_latency_ms: u64,
    pub max_latency_ms: u64,
}

impl CallStatsSnapshot {
    pub fn mean_latency_ms(&self) -> u64 {
        if self.calls == 0 {
            0
        } else {
            self.total_latency_ms / self.calls
        }
    }
}

impl CallStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, latency: Duration, success: bool) {
        let mut inner = self.inner.lock();
        inner.calls += 1;
        if !success {
            inner.failures += 1;
        }
        inner.total_latency += latency;
        if latency > inner.max_latency {
            inner.max_latency = latency;
        }
    }

    pub fn snapshot(&self) -> CallStatsSnapshot {
        let inner = self.inner.lock();
        CallStatsSnapshot {
            calls: inner.calls,
            failures: inner.failures,
            total_latency_ms: inner.total_latency.as_millis() as u64,
            max_latency_ms: inner.max_latency.as_millis() as u64,
        }
    }

    pub fn reset(&self) {
        *self.inner.lock() = StatsInner::default();
    }
}

/// Wraps a provider and records every call in [`CallStats`].
pub struct InstrumentedProvider {
    inner: Arc<dyn LlmProvider>,
    stats: Arc<CallStats>,
}

impl InstrumentedProvider {
    pub fn new(inner: Arc<dyn LlmProvider>, stats: Arc<CallStats>) -> Self {
        Self { inner, stats }
    }
}

#[async_trait]
impl LlmProvider for InstrumentedProvider {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let started = Instant::now();
        let result = self.inner.generate(prompt).await;
        let latency = started.elapsed();

        self.stats.record(latency, result.is_ok());
        if let Err(e) = &result {
            tracing::warn!(
                provider = self.inner.name(),
                error = %e,
                latency_ms = latency.as_millis() as u64,
                "Backend call failed"
            );
        }
        result
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
