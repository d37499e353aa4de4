//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the ledger.
//!
//! # Metrics
//!
//! - `coin_ledger_wagers_settled_total` - Wagers that moved coins
//! - `coin_ledger_wagers_tied_total` - Dice duels that ended level
//! - `coin_ledger_wagers_rejected_total` - Wagers refused before rolling
//! - `coin_ledger_fees_burned_total` - Coins removed by the house fee
//! - `coin_ledger_transfers_total` - Completed transfers
//! - `coin_ledger_operation_duration_seconds` - Histogram of operation latencies

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Settled wagers
    pub wagers_settled: IntCounter,

    /// Tied wagers
    pub wagers_tied: IntCounter,

    /// Rejected wagers
    pub wagers_rejected: IntCounter,

    /// Coins burned as fees
    pub fees_burned: IntCounter,

    /// Completed transfers
    pub transfers_total: IntCounter,

    /// Operation duration histogram
    pub operation_duration: Histogram,

    registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let wagers_settled = IntCounter::new(
            "coin_ledger_wagers_settled_total",
            "Wagers that moved coins",
        )?;
        registry.register(Box::new(wagers_settled.clone()))?;

        let wagers_tied = IntCounter::new(
            "coin_ledger_wagers_tied_total",
            "Dice duels that ended level",
        )?;
        registry.register(Box::new(wagers_tied.clone()))?;

        let wagers_rejected = IntCounter::new(
            "coin_ledger_wagers_rejected_total",
            "Wagers refused before rolling",
        )?;
        registry.register(Box::new(wagers_rejected.clone()))?;

        let fees_burned = IntCounter::new(
            "coin_ledger_fees_burned_total",
            "Coins removed by the house fee",
        )?;
        registry.register(Box::new(fees_burned.clone()))?;

        let transfers_total = IntCounter::new(
            "coin_ledger_transfers_total",
            "Completed transfers",
        )?;
        registry.register(Box::new(transfers_total.clone()))?;

        let operation_duration = Histogram::with_opts(
            HistogramOpts::new(
                "coin_ledger_operation_duration_seconds",
                "Histogram of operation latencies",
            )
            .buckets(vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0]),
        )?;
        registry.register(Box::new(operation_duration.clone()))?;

        Ok(Self {
            wagers_settled,
            wagers_tied,
            wagers_rejected,
            fees_burned,
            transfers_total,
            operation_duration,
            registry,
        })
    }

    /// Record a settled wager and its fee
    pub fn record_settled(&self, fee: u64) {
        self.wagers_settled.inc();
        self.fees_burned.inc_by(fee);
    }

    /// Record a tie
    pub fn record_tied(&self) {
        self.wagers_tied.inc();
    }

    /// Record a rejected wager
    pub fn record_rejected(&self) {
        self.wagers_rejected.inc();
    }

    /// Record a transfer
    pub fn record_transfer(&self) {
        self.transfers_total.inc();
    }

    /// Record operation duration
    pub fn record_duration(&self, duration_seconds: f64) {
        self.operation_duration.observe(duration_seconds);
    }

    /// Text exposition of every metric
    pub fn gather_text(&self) -> String {
        let mut buffer = Vec::new();
        if TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .is_err()
        {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
