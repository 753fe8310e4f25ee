//! Coordinated shutdown plumbing.
//!
//! One controller fans out to any number of cloned signals; background
//! tasks select on `wait()` next to their real work. Process termination
//! signals are wired through [`wait_for_signal`].

use tokio::sync::watch;
use tracing::warn;

/// Create a linked shutdown controller/signal pair.
pub fn shutdown_channel() -> (ShutdownController, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownController { tx }, ShutdownSignal { rx })
}

/// Triggers shutdown for every signal cloned from this channel.
pub struct ShutdownController {
    tx: watch::Sender<bool>,
}

impl ShutdownController {
    /// Request shutdown. Idempotent.
    pub fn shutdown(&self) {
        let _ = self.tx.send(true);
    }
}

/// Clonable handle tasks wait on to learn shutdown was requested.
#[derive(Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Resolve once shutdown has been requested. Returns immediately if it
    /// already was; a dropped controller counts as shutdown.
    pub async fn wait(&mut self) {
        while !*self.rx.borrow() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Wait for SIGINT or SIGTERM; returns the signal name for logging.
#[cfg(unix)]
pub async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => "SIGINT",
                _ = sigterm.recv() => "SIGTERM",
            }
        }
        Err(err) => {
            warn!(error = %err, "failed to install SIGTERM handler; listening for SIGINT only");
            let _ = tokio::signal::ctrl_c().await;
            "SIGINT"
        }
    }
}

/// Wait for Ctrl-C on platforms without unix signals.
#[cfg(not(unix))]
pub async fn wait_for_signal() -> &'static str {
    let _ = tokio::signal::ctrl_c().await;
    "SIGINT"
}
