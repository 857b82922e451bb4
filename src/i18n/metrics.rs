//! Translation metrics.
//!
//! Counters for provider traffic and reconcile outcomes. One instance is
//! shared (behind an `Arc`) by the orchestrator and the HTTP layer.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct TranslationMetrics {
    /// Provider calls actually issued (retries included, empty inputs excluded)
    provider_calls: AtomicUsize,

    /// Provider calls that returned an error or timed out
    provider_failures: AtomicUsize,

    /// Retry attempts made after a retryable failure
    retries: AtomicUsize,

    /// (field, language) pairs left out of a patch after failing
    omitted_pairs: AtomicUsize,

    /// Patches accepted by the conditional write
    patches_applied: AtomicUsize,

    /// Patches rejected by the staleness guard
    conflicts: AtomicUsize,

    /// Reconciles that finished without writing
    noops: AtomicUsize,
}

impl TranslationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_provider_call(&self) {
        self.provider_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_provider_failure(&self) {
        self.provider_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_omitted_pair(&self) {
        self.omitted_pairs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_patch_applied(&self) {
        self.patches_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_conflict(&self) {
        self.conflicts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_noop(&self) {
        self.noops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn provider_calls(&self) -> usize {
        self.provider_calls.load(Ordering::Relaxed)
    }

    pub fn provider_failures(&self) -> usize {
        self.provider_failures.load(Ordering::Relaxed)
    }

    pub fn retries(&self) -> usize {
        self.retries.load(Ordering::Relaxed)
    }

    pub fn omitted_pairs(&self) -> usize {
        self.omitted_pairs.load(Ordering::Relaxed)
    }

    pub fn patches_applied(&self) -> usize {
        self.patches_applied.load(Ordering::Relaxed)
    }

    pub fn conflicts(&self) -> usize {
        self.conflicts.load(Ordering::Relaxed)
    }

    pub fn noops(&self) -> usize {
        self.noops.load(Ordering::Relaxed)
    }

    /// Generate a metrics report.
    pub fn report(&self) -> MetricsReport {
        let calls = self.provider_calls();
        let failures = self.provider_failures();
        let provider_success_rate = if calls > 0 {
            (calls.saturating_sub(failures) as f64 / calls as f64) * 100.0
        } else {
            0.0
        };

        MetricsReport {
            provider_calls: calls,
            provider_failures: failures,
            provider_success_rate,
            retries: self.retries(),
            omitted_pairs: self.omitted_pairs(),
            patches_applied: self.patches_applied(),
            conflicts: self.conflicts(),
            noops: self.noops(),
        }
    }
}

/// Snapshot of the counters, serialised by `GET /metrics`.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub provider_calls: usize,
    pub provider_failures: usize,

    /// Provider success rate as a percentage (0-100)
    pub provider_success_rate: f64,

    pub retries: usize,
    pub omitted_pairs: usize,
    pub patches_applied: usize,
    pub conflicts: usize,
    pub noops: usize,
}
