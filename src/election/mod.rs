//! Kubernetes Lease-backed leader election.
//!
//! Exactly one participant across a replicated deployment holds the lease
//! at a time; the others observe themselves as followers. Transitions are
//! surfaced as typed "elected"/"lost" events so hosts can gate singleton
//! work (periodic jobs, queue consumers, schedulers) on leadership.
//!
//! Outside a cluster the elector degrades to single-node mode: it assumes
//! leadership immediately and never touches the coordination API.

pub mod config;
pub mod events;
pub mod identity;
pub mod lease;
pub mod store;

mod engine;
mod watch;

pub use config::{ElectorConfig, LogAtLevel};
pub use engine::LeaderState;
pub use events::{EventSink, LeadershipEvent, ELECTED_TOPIC, LOST_TOPIC};

use crate::election::engine::{Command, ElectionEngine, COMMAND_CHANNEL_CAPACITY};
use crate::election::store::{KubeLeaseStore, LeaseStore};
use crate::server::metrics::{create_metrics, SharedMetrics};
use crate::server::shutdown::{shutdown_channel, ShutdownController};
use k8s_openapi::api::coordination::v1::Lease;
use kube::api::Api;
use kube::Client;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::sync::{mpsc, oneshot};
use tracing::info;

#[cfg(test)]
#[path = "config_test.rs"]
mod config_tests;

#[cfg(test)]
#[path = "identity_test.rs"]
mod identity_tests;

#[cfg(test)]
#[path = "lease_test.rs"]
mod lease_tests;

#[cfg(test)]
#[path = "store_test.rs"]
mod store_tests;

#[cfg(test)]
#[path = "events_test.rs"]
mod events_tests;

#[cfg(test)]
#[path = "watch_test.rs"]
mod watch_tests;

/// Environment variable the kubelet injects into every container; its
/// absence means we are not running under the orchestrator.
const SERVICE_HOST_ENV: &str = "KUBERNETES_SERVICE_HOST";

pub(crate) fn running_in_cluster() -> bool {
    std::env::var_os(SERVICE_HOST_ENV).is_some()
}

/// Errors surfaced by [`LeaderElector::start`].
///
/// Nothing after startup is fatal; a running elector only ever degrades to
/// "never becomes leader".
#[derive(Debug, Error)]
pub enum ElectorError {
    #[error("failed to build Kubernetes client: {0}")]
    Client(#[source] kube::Error),

    #[error("failed to register election metrics: {0}")]
    Metrics(#[source] prometheus::Error),
}

struct EngineHandles {
    cmd_tx: mpsc::Sender<Command>,
    watch_shutdown: ShutdownController,
}

/// Handle to a running election participant.
///
/// Owned by the host's lifecycle: create once at startup, call
/// [`shutdown`](Self::shutdown) on termination signals.
pub struct LeaderElector {
    config: Arc<ElectorConfig>,
    identity: String,
    state: LeaderState,
    sink: EventSink,
    metrics: SharedMetrics,
    // None in degenerate single-node mode.
    inner: Option<EngineHandles>,
}

impl LeaderElector {
    /// Start the elector.
    ///
    /// When not running under Kubernetes, leadership is assumed
    /// immediately and no lease operation is ever attempted. Otherwise the
    /// lease watch starts first (so peers' writes are observed promptly),
    /// then the bootstrap acquisition sequence runs, blocking for its
    /// completion when `await_leadership` is set.
    pub async fn start(config: ElectorConfig) -> Result<Self, ElectorError> {
        let metrics = create_metrics().map_err(ElectorError::Metrics)?;
        let config = Arc::new(config);
        let identity = identity::compute_identity();
        let state = LeaderState::new();
        let sink = EventSink::new(events::EVENT_CHANNEL_CAPACITY);

        if !running_in_cluster() {
            info!(
                holder_id = %identity,
                "not running under Kubernetes; assuming leadership without lease operations"
            );
            state.set_leader(true);
            metrics.is_leader.set(1);
            sink.emit(LeadershipEvent::elected(&config.lease_name));
            return Ok(Self {
                config,
                identity,
                state,
                sink,
                metrics,
                inner: None,
            });
        }

        let client = Client::try_default().await.map_err(ElectorError::Client)?;
        let store: Arc<dyn LeaseStore> =
            Arc::new(KubeLeaseStore::new(client.clone(), &config.namespace));
        let api: Api<Lease> = Api::namespaced(client, &config.namespace);

        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (watch_shutdown, watch_signal) = shutdown_channel();

        info!(
            holder_id = %identity,
            lease_name = %config.lease_name,
            namespace = %config.namespace,
            "starting leader election"
        );

        // Watch before the first acquisition attempt.
        tokio::spawn(watch::run_watch_loop(
            api,
            config.clone(),
            cmd_tx.clone(),
            watch_signal,
            metrics.clone(),
        ));

        let engine = ElectionEngine::new(
            store,
            config.clone(),
            identity.clone(),
            state.clone(),
            sink.clone(),
            metrics.clone(),
            cmd_tx.clone(),
        );
        let (bootstrap_tx, bootstrap_rx) = oneshot::channel();
        tokio::spawn(engine.run(cmd_rx, bootstrap_tx));

        if config.await_leadership {
            // Block until the first acquisition sequence completes,
            // success or exhausted retries.
            let _ = bootstrap_rx.await;
        }

        Ok(Self {
            config,
            identity,
            state,
            sink,
            metrics,
            inner: Some(EngineHandles {
                cmd_tx,
                watch_shutdown,
            }),
        })
    }

    /// Non-blocking leadership snapshot.
    pub fn is_leader(&self) -> bool {
        self.state.is_leader()
    }

    /// This participant's holder identity.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// The configuration the elector runs with.
    pub fn config(&self) -> &ElectorConfig {
        &self.config
    }

    /// Cheap shared snapshot handle, e.g. for health endpoints.
    pub fn state(&self) -> LeaderState {
        self.state.clone()
    }

    /// Subscribe to leadership transitions.
    pub fn subscribe(&self) -> broadcast::Receiver<LeadershipEvent> {
        self.sink.subscribe()
    }

    /// Election metrics registry handle.
    pub fn metrics(&self) -> SharedMetrics {
        self.metrics.clone()
    }

    /// Release the lease if held, cancel the renewal timer and stop the
    /// watch. Outstanding release RPCs are allowed to complete; there is
    /// no forced abort. Safe to call more than once. A no-op in degenerate
    /// single-node mode, where leadership lasts the process lifetime.
    pub async fn shutdown(&self) {
        let Some(inner) = &self.inner else {
            return;
        };
        inner.watch_shutdown.shutdown();

        let (ack_tx, ack_rx) = oneshot::channel();
        if inner.cmd_tx.send(Command::Shutdown(ack_tx)).await.is_ok() {
            let _ = ack_rx.await;
        }
    }
}
