//! Prometheus metrics for the election engine.
//!
//! Exposes election activity and current leadership:
//! - Acquisition attempts and elections won/lost
//! - Renewal heartbeats and their failures
//! - Watch stream reconnects

use prometheus::{self, Encoder, IntCounter, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Election metrics registry.
///
/// Thread-safe container for all election metrics; shared through
/// [`SharedMetrics`].
#[derive(Clone)]
pub struct ElectionMetrics {
    registry: Registry,
    /// Total lease acquisition attempts (bootstrap and watch-driven)
    pub acquisition_attempts_total: IntCounter,
    /// Times this replica became leader
    pub elections_won_total: IntCounter,
    /// Times this replica was preempted or demoted
    pub leadership_lost_total: IntCounter,
    /// Successful heartbeat renewals
    pub renewals_total: IntCounter,
    /// Renewals that failed (remote error, conflict, or ownership loss)
    pub renewal_failures_total: IntCounter,
    /// Watch stream reconnections
    pub watch_reconnects_total: IntCounter,
    /// 1 while this replica sees itself as leader, 0 otherwise
    pub is_leader: IntGauge,
}

impl ElectionMetrics {
    /// Create a new metrics registry with all election metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let acquisition_attempts_total = IntCounter::with_opts(Opts::new(
            "johto_acquisition_attempts_total",
            "Total lease acquisition attempts",
        ))?;
        registry.register(Box::new(acquisition_attempts_total.clone()))?;

        let elections_won_total = IntCounter::with_opts(Opts::new(
            "johto_elections_won_total",
            "Times this replica became leader",
        ))?;
        registry.register(Box::new(elections_won_total.clone()))?;

        let leadership_lost_total = IntCounter::with_opts(Opts::new(
            "johto_leadership_lost_total",
            "Times this replica lost leadership",
        ))?;
        registry.register(Box::new(leadership_lost_total.clone()))?;

        let renewals_total = IntCounter::with_opts(Opts::new(
            "johto_renewals_total",
            "Successful lease heartbeat renewals",
        ))?;
        registry.register(Box::new(renewals_total.clone()))?;

        let renewal_failures_total = IntCounter::with_opts(Opts::new(
            "johto_renewal_failures_total",
            "Failed lease heartbeat renewals",
        ))?;
        registry.register(Box::new(renewal_failures_total.clone()))?;

        let watch_reconnects_total = IntCounter::with_opts(Opts::new(
            "johto_watch_reconnects_total",
            "Lease watch stream reconnections",
        ))?;
        registry.register(Box::new(watch_reconnects_total.clone()))?;

        let is_leader = IntGauge::with_opts(Opts::new(
            "johto_is_leader",
            "Whether this replica currently holds leadership",
        ))?;
        registry.register(Box::new(is_leader.clone()))?;

        Ok(Self {
            registry,
            acquisition_attempts_total,
            elections_won_total,
            leadership_lost_total,
            renewals_total,
            renewal_failures_total,
            watch_reconnects_total,
            is_leader,
        })
    }

    /// Encode all metrics to Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| {
            prometheus::Error::Msg(format!("Failed to encode metrics as UTF-8: {}", e))
        })
    }
}

/// Shared metrics handle for use across the elector.
pub type SharedMetrics = Arc<ElectionMetrics>;

/// Create a new shared metrics instance.
pub fn create_metrics() -> Result<SharedMetrics, prometheus::Error> {
    Ok(Arc::new(ElectionMetrics::new()?))
}
