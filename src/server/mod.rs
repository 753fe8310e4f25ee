//! HTTP server and process-lifecycle plumbing
//!
//! Provides Kubernetes health probes:
//! - `/healthz` - Liveness probe (process is running)
//! - `/readyz` - Readiness probe (elector is initialized and serving)
//! - `/leaderz` - Leadership probe (this replica holds the lease)
//! - `/metrics` - Prometheus metrics endpoint
//!
//! Also provides:
//! - Graceful shutdown handling for SIGTERM/SIGINT

mod health;
pub mod metrics;
pub mod shutdown;

pub use health::{run_health_server, ReadinessState};
pub use metrics::{create_metrics, ElectionMetrics, SharedMetrics};
pub use shutdown::{shutdown_channel, wait_for_signal, ShutdownController, ShutdownSignal};

#[cfg(test)]
#[path = "health_test.rs"]
mod health_tests;

#[cfg(test)]
#[path = "shutdown_test.rs"]
mod shutdown_tests;

#[cfg(test)]
#[path = "metrics_test.rs"]
mod metrics_tests;
