//! Elector configuration.

use std::time::Duration;

/// Default lease name targeted by the elector.
pub const DEFAULT_LEASE_NAME: &str = "johto-leader-election";

/// Default namespace for the lease.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Default time between heartbeat renewals.
pub const DEFAULT_RENEWAL_INTERVAL: Duration = Duration::from_millis(10_000);

/// Level used for informational election messages.
///
/// Errors always log at warn/error; this only selects how chatty the
/// routine "held by another instance" style messages are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogAtLevel {
    Info,
    Debug,
}

impl LogAtLevel {
    /// Parse the configured value; `"log"` is the wire spelling of Info.
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "debug" => LogAtLevel::Debug,
            _ => LogAtLevel::Info,
        }
    }
}

/// Leader election configuration.
#[derive(Debug, Clone)]
pub struct ElectorConfig {
    /// Name of the Lease resource shared by all replicas.
    pub lease_name: String,
    /// Namespace the Lease lives in.
    pub namespace: String,
    /// How often the leader renews its heartbeat.
    pub renewal_interval: Duration,
    /// If true, startup blocks until the first acquisition sequence
    /// finishes (success or exhausted retries).
    pub await_leadership: bool,
    /// Verbosity of informational messages.
    pub log_at_level: LogAtLevel,
}

impl Default for ElectorConfig {
    fn default() -> Self {
        Self {
            lease_name: DEFAULT_LEASE_NAME.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            renewal_interval: DEFAULT_RENEWAL_INTERVAL,
            await_leadership: false,
            log_at_level: LogAtLevel::Info,
        }
    }
}

impl ElectorConfig {
    /// Create config from environment variables.
    ///
    /// Uses:
    /// - `JOHTO_LEASE_NAME` for the lease name
    /// - `JOHTO_NAMESPACE` (falls back to `POD_NAMESPACE`) for the namespace
    /// - `JOHTO_RENEWAL_INTERVAL_MS` for the renewal interval
    /// - `JOHTO_AWAIT_LEADERSHIP` ("true"/"1") to block startup on the
    ///   first acquisition sequence
    /// - `JOHTO_LOG_AT_LEVEL` ("log" or "debug")
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let lease_name =
            std::env::var("JOHTO_LEASE_NAME").unwrap_or(defaults.lease_name);

        let namespace = std::env::var("JOHTO_NAMESPACE")
            .or_else(|_| std::env::var("POD_NAMESPACE"))
            .unwrap_or(defaults.namespace);

        let renewal_interval = std::env::var("JOHTO_RENEWAL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.renewal_interval);

        let await_leadership = std::env::var("JOHTO_AWAIT_LEADERSHIP")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let log_at_level = std::env::var("JOHTO_LOG_AT_LEVEL")
            .map(|v| LogAtLevel::parse(&v))
            .unwrap_or(defaults.log_at_level);

        Self {
            lease_name,
            namespace,
            renewal_interval,
            await_leadership,
            log_at_level,
        }
    }

    /// Validity window written into the lease, in seconds.
    ///
    /// Twice the renewal interval, so one missed renewal still leaves a
    /// full interval of safety margin before peers may take over. Clamped
    /// to at least one second so a sub-second interval cannot produce an
    /// instantly-expired lease.
    pub fn lease_duration_seconds(&self) -> i32 {
        let seconds = self.renewal_interval.as_millis() * 2 / 1000;
        (seconds as i32).max(1)
    }

    /// Spacing between bootstrap acquisition attempts: half the lease
    /// duration.
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.lease_duration_seconds() as u64 * 500)
    }
}
