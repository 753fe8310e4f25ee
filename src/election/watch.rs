//! Long-lived lease watch with reconnection.
//!
//! The watch is the system's only reliable cross-process signal path:
//! after bootstrap, every acquisition opportunity and every preemption
//! arrives through here. Stream termination (error or graceful close) is
//! never fatal; the loop sleeps and reconnects until shut down.

use crate::election::config::ElectorConfig;
use crate::election::engine::Command;
use crate::server::metrics::SharedMetrics;
use crate::server::shutdown::ShutdownSignal;
use futures::{pin_mut, TryStreamExt};
use k8s_openapi::api::coordination::v1::Lease;
use kube::api::{Api, WatchEvent, WatchParams};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Pause before re-establishing a terminated watch stream.
pub(crate) const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Pause before acting on an observed mutation, so a writer's follow-up
/// events settle and racing replicas don't thrash.
pub(crate) const SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Whether a watch event concerns the lease this elector coordinates on.
/// The watch subscribes to the whole namespace, so peers' unrelated
/// leases stream through here too.
pub(crate) fn is_target(lease: &Lease, lease_name: &str) -> bool {
    lease.metadata.name.as_deref() == Some(lease_name)
}

/// Subscribe to lease mutations and forward them to the engine until
/// shutdown. Restarts the stream after [`RECONNECT_DELAY`] on any
/// termination, clean or not.
pub(crate) async fn run_watch_loop(
    api: Api<Lease>,
    config: Arc<ElectorConfig>,
    cmd_tx: mpsc::Sender<Command>,
    mut shutdown: ShutdownSignal,
    metrics: SharedMetrics,
) {
    loop {
        tokio::select! {
            _ = shutdown.wait() => return,
            result = watch_stream(&api, &config, &cmd_tx) => {
                match result {
                    Ok(()) => debug!(
                        lease_name = %config.lease_name,
                        "lease watch stream closed"
                    ),
                    Err(err) => warn!(
                        error = %err,
                        lease_name = %config.lease_name,
                        "lease watch stream failed"
                    ),
                }
            }
        }

        metrics.watch_reconnects_total.inc();
        tokio::select! {
            _ = shutdown.wait() => return,
            _ = tokio::time::sleep(RECONNECT_DELAY) => {}
        }
    }
}

/// Consume one watch stream until it terminates.
async fn watch_stream(
    api: &Api<Lease>,
    config: &ElectorConfig,
    cmd_tx: &mpsc::Sender<Command>,
) -> Result<(), kube::Error> {
    let stream = api.watch(&WatchParams::default(), "0").await?;
    pin_mut!(stream);

    while let Some(event) = stream.try_next().await? {
        match event {
            WatchEvent::Added(lease) | WatchEvent::Modified(lease) => {
                if !is_target(&lease, &config.lease_name) {
                    continue;
                }
                tokio::time::sleep(SETTLE_DELAY).await;
                if cmd_tx
                    .send(Command::LeaseChanged(Box::new(lease)))
                    .await
                    .is_err()
                {
                    // Engine is gone; nothing left to notify.
                    return Ok(());
                }
            }
            WatchEvent::Deleted(lease) => {
                if !is_target(&lease, &config.lease_name) {
                    continue;
                }
                tokio::time::sleep(SETTLE_DELAY).await;
                if cmd_tx.send(Command::LeaseDeleted).await.is_err() {
                    return Ok(());
                }
            }
            WatchEvent::Bookmark(_) => {}
            WatchEvent::Error(status) => {
                return Err(kube::Error::Api(status));
            }
        }
    }

    Ok(())
}
