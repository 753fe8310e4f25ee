//! Election state machine.
//!
//! All transitions run on one task that drains a command channel; timer
//! fires and watch callbacks only enqueue commands. The state machine is
//! not reentrancy-safe, so this serialization boundary is load-bearing.

use crate::election::config::ElectorConfig;
use crate::election::events::{EventSink, LeadershipEvent};
use crate::election::lease as lease_logic;
use crate::election::store::{LeaseStore, StoreError};
use crate::server::metrics::SharedMetrics;
use chrono::Utc;
use k8s_openapi::api::coordination::v1::Lease;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Acquisition attempts at bootstrap before the watch loop takes over as
/// the only driver of future opportunities.
pub(crate) const BOOTSTRAP_ATTEMPTS: u32 = 3;

/// Command channel depth; watch events and timer fires queue here while
/// the engine is mid-RPC.
pub(crate) const COMMAND_CHANNEL_CAPACITY: usize = 32;

/// Inputs serialized into the engine task.
pub(crate) enum Command {
    /// The renewal timer fired.
    Renew,
    /// The watch observed the lease added or modified.
    LeaseChanged(Box<Lease>),
    /// The watch observed the lease deleted.
    LeaseDeleted,
    /// Release if held, then stop; acked once the release finished.
    Shutdown(oneshot::Sender<()>),
}

/// Shared leadership snapshot.
///
/// The sole source of truth for event-emission gating; mutated only by the
/// engine task, read from anywhere.
#[derive(Clone)]
pub struct LeaderState {
    is_leader: Arc<AtomicBool>,
}

impl LeaderState {
    /// Create new leader state (initially not leader).
    pub fn new() -> Self {
        Self {
            is_leader: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Check if this instance currently sees itself as the leader.
    pub fn is_leader(&self) -> bool {
        self.is_leader.load(Ordering::SeqCst)
    }

    pub(crate) fn set_leader(&self, is_leader: bool) {
        self.is_leader.store(is_leader, Ordering::SeqCst);
    }
}

impl Default for LeaderState {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) struct ElectionEngine {
    store: Arc<dyn LeaseStore>,
    config: Arc<ElectorConfig>,
    identity: String,
    state: LeaderState,
    sink: EventSink,
    metrics: SharedMetrics,
    cmd_tx: mpsc::Sender<Command>,
    renewal_timer: Option<JoinHandle<()>>,
}

impl ElectionEngine {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        store: Arc<dyn LeaseStore>,
        config: Arc<ElectorConfig>,
        identity: String,
        state: LeaderState,
        sink: EventSink,
        metrics: SharedMetrics,
        cmd_tx: mpsc::Sender<Command>,
    ) -> Self {
        Self {
            store,
            config,
            identity,
            state,
            sink,
            metrics,
            cmd_tx,
            renewal_timer: None,
        }
    }

    /// Drive the engine until shutdown.
    ///
    /// Runs the bootstrap acquisition sequence first, signals its
    /// completion through `bootstrap_done`, then serves commands until a
    /// `Shutdown` arrives or every sender is gone.
    pub(crate) async fn run(
        mut self,
        mut rx: mpsc::Receiver<Command>,
        bootstrap_done: oneshot::Sender<()>,
    ) {
        let stopped = self.bootstrap(&mut rx).await;
        let _ = bootstrap_done.send(());
        if stopped {
            return;
        }

        while let Some(cmd) = rx.recv().await {
            if self.handle(cmd).await {
                break;
            }
        }
    }

    /// Bootstrap acquisition: up to [`BOOTSTRAP_ATTEMPTS`] tries spaced by
    /// half the lease duration. Commands arriving during the spacing sleep
    /// are served so watch events never starve. Returns true if a shutdown
    /// was handled mid-bootstrap.
    async fn bootstrap(&mut self, rx: &mut mpsc::Receiver<Command>) -> bool {
        for attempt in 1..=BOOTSTRAP_ATTEMPTS {
            self.try_acquire().await;
            if self.state.is_leader() {
                return false;
            }
            if attempt == BOOTSTRAP_ATTEMPTS {
                break;
            }

            let deadline = tokio::time::Instant::now() + self.config.retry_backoff();
            loop {
                match tokio::time::timeout_at(deadline, rx.recv()).await {
                    Ok(Some(cmd)) => {
                        if self.handle(cmd).await {
                            return true;
                        }
                    }
                    // All senders dropped; the elector is gone.
                    Ok(None) => return true,
                    Err(_) => break,
                }
            }
            if self.state.is_leader() {
                return false;
            }
        }

        self.log_routine("acquisition attempts exhausted; relying on lease watch");
        false
    }

    /// Apply one command; returns true when the engine should stop.
    async fn handle(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::Renew => {
                self.renew().await;
                false
            }
            Command::LeaseChanged(lease) => {
                self.handle_lease_update(&lease);
                false
            }
            Command::LeaseDeleted => {
                self.handle_lease_deleted().await;
                false
            }
            Command::Shutdown(ack) => {
                self.release().await;
                let _ = ack.send(());
                true
            }
        }
    }

    /// One acquisition pass: read, then create or take over as the record
    /// allows. Conflicts and races mean "someone else acted" and leave us
    /// a follower; the watch surfaces the next opportunity.
    async fn try_acquire(&mut self) {
        self.metrics.acquisition_attempts_total.inc();
        let now = Utc::now();

        match self.store.get(&self.config.lease_name).await {
            Ok(lease) => {
                if lease_logic::held_by_us(&lease, &self.identity) {
                    // Crash-restart inside our own lease window: reclaim
                    // without a write, the renewal timer heartbeats next.
                    self.become_leader();
                    return;
                }

                if lease_logic::is_expired(&lease, now) || lease_logic::is_unheld(&lease) {
                    let claimed = lease_logic::claim(
                        lease,
                        &self.identity,
                        self.config.lease_duration_seconds(),
                        now,
                    );
                    match self.store.replace(&self.config.lease_name, &claimed).await {
                        Ok(updated) if lease_logic::held_by_us(&updated, &self.identity) => {
                            self.become_leader();
                        }
                        Ok(_) => {
                            self.log_routine("lease write did not grant leadership");
                        }
                        Err(StoreError::Conflict) => {
                            self.log_routine("lost the acquisition race to another instance");
                        }
                        Err(err) => {
                            error!(
                                error = %err,
                                lease_name = %self.config.lease_name,
                                "failed to claim lease"
                            );
                        }
                    }
                } else {
                    self.log_routine("lease held by another instance and not expired");
                }
            }
            Err(StoreError::NotFound) => {
                let fresh = lease_logic::build(
                    &self.config.lease_name,
                    &self.config.namespace,
                    &self.identity,
                    self.config.lease_duration_seconds(),
                    now,
                );
                match self.store.create(&fresh).await {
                    Ok(created) if lease_logic::held_by_us(&created, &self.identity) => {
                        self.become_leader();
                    }
                    Ok(_) => {}
                    Err(StoreError::AlreadyExists) => {
                        self.log_routine("lease created by another instance first");
                    }
                    Err(err) => {
                        error!(
                            error = %err,
                            lease_name = %self.config.lease_name,
                            "failed to create lease"
                        );
                    }
                }
            }
            Err(err) => {
                error!(
                    error = %err,
                    lease_name = %self.config.lease_name,
                    "failed to read lease"
                );
            }
        }
    }

    /// Heartbeat: re-read, confirm ownership, push `renewTime` forward.
    /// Any failure demotes us; the next watch event or peer takeover
    /// resolves the ambiguity.
    async fn renew(&mut self) {
        if !self.state.is_leader() {
            // Stale timer fire after a loss.
            return;
        }
        let now = Utc::now();

        match self.store.get(&self.config.lease_name).await {
            Ok(lease) if lease_logic::held_by_us(&lease, &self.identity) => {
                let renewed =
                    lease_logic::renewed(lease, self.config.lease_duration_seconds(), now);
                match self.store.replace(&self.config.lease_name, &renewed).await {
                    Ok(_) => {
                        debug!(holder_id = %self.identity, "renewed lease");
                        self.metrics.renewals_total.inc();
                        self.schedule_renewal();
                    }
                    Err(err) => {
                        warn!(error = %err, "failed to renew lease");
                        self.metrics.renewal_failures_total.inc();
                        self.lose_leadership();
                    }
                }
            }
            Ok(lease) => {
                warn!(
                    holder_id = %self.identity,
                    current_holder = ?lease_logic::holder(&lease),
                    "lease no longer held by us"
                );
                self.metrics.renewal_failures_total.inc();
                self.lose_leadership();
            }
            Err(err) => {
                warn!(error = %err, "failed to read lease for renewal");
                self.metrics.renewal_failures_total.inc();
                self.lose_leadership();
            }
        }
    }

    /// React to a remote ADDED/MODIFIED observation.
    fn handle_lease_update(&mut self, lease: &Lease) {
        if lease_logic::held_by_us(lease, &self.identity) {
            if self.state.is_leader() {
                // Our own write echoed back; push the next renewal out.
                self.schedule_renewal();
            } else {
                self.become_leader();
            }
        } else if self.state.is_leader() {
            self.lose_leadership();
        }
    }

    /// React to a remote DELETED observation: followers race for the now
    /// absent record. A leader ignores it; its next renewal resolves.
    async fn handle_lease_deleted(&mut self) {
        if self.state.is_leader() {
            return;
        }
        self.try_acquire().await;
    }

    /// Transition to leader. Idempotent; emits exactly one "elected" per
    /// false→true edge.
    fn become_leader(&mut self) {
        if self.state.is_leader() {
            return;
        }
        self.state.set_leader(true);
        self.metrics.elections_won_total.inc();
        self.metrics.is_leader.set(1);
        info!(
            holder_id = %self.identity,
            lease_name = %self.config.lease_name,
            "acquired leadership"
        );
        self.sink
            .emit(LeadershipEvent::elected(&self.config.lease_name));
        self.schedule_renewal();
    }

    /// Transition to follower. Idempotent; emits exactly one "lost" per
    /// true→false edge and cancels the pending renewal.
    fn lose_leadership(&mut self) {
        if !self.state.is_leader() {
            return;
        }
        self.state.set_leader(false);
        self.cancel_renewal();
        self.metrics.leadership_lost_total.inc();
        self.metrics.is_leader.set(0);
        warn!(
            holder_id = %self.identity,
            lease_name = %self.config.lease_name,
            "lost leadership"
        );
        self.sink.emit(LeadershipEvent::lost(&self.config.lease_name));
    }

    /// Graceful release on shutdown: empty the holder so peers can take
    /// over before the lease expires. Remote failures are logged and
    /// swallowed; termination must not block on the store. No "lost" event
    /// is emitted, the release is caller-initiated.
    async fn release(&mut self) {
        self.cancel_renewal();
        if !self.state.is_leader() {
            return;
        }

        match self.store.get(&self.config.lease_name).await {
            Ok(lease) if lease_logic::held_by_us(&lease, &self.identity) => {
                let cleared = lease_logic::cleared(lease);
                match self.store.replace(&self.config.lease_name, &cleared).await {
                    Ok(_) => {
                        info!(holder_id = %self.identity, "released lease");
                    }
                    Err(err) => {
                        warn!(error = %err, "failed to release lease; it will expire naturally");
                    }
                }
            }
            Ok(_) => {
                debug!(holder_id = %self.identity, "lease already taken over; nothing to release");
            }
            Err(err) => {
                warn!(error = %err, "failed to read lease during release");
            }
        }

        // Local leadership ends regardless of what the store said.
        self.state.set_leader(false);
        self.metrics.is_leader.set(0);
    }

    /// Arm the one-shot renewal timer, replacing any pending one so at
    /// most a single timer exists.
    fn schedule_renewal(&mut self) {
        self.cancel_renewal();
        let tx = self.cmd_tx.clone();
        let interval = self.config.renewal_interval;
        self.renewal_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            let _ = tx.send(Command::Renew).await;
        }));
    }

    fn cancel_renewal(&mut self) {
        if let Some(timer) = self.renewal_timer.take() {
            timer.abort();
        }
    }

    #[cfg(test)]
    pub(crate) fn has_renewal_timer(&self) -> bool {
        self.renewal_timer.is_some()
    }

    /// Informational message at the configured verbosity.
    fn log_routine(&self, message: &str) {
        match self.config.log_at_level {
            crate::election::config::LogAtLevel::Info => {
                info!(holder_id = %self.identity, lease_name = %self.config.lease_name, "{}", message);
            }
            crate::election::config::LogAtLevel::Debug => {
                debug!(holder_id = %self.identity, lease_name = %self.config.lease_name, "{}", message);
            }
        }
    }
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
