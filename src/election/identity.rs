//! Holder identity for this participant.

/// Prefix baked into every holder identity this crate produces.
pub const IDENTITY_PREFIX: &str = "johto";

/// Compute the stable holder identity for this replica.
///
/// Format is `"johto-<hostname>"`, with the hostname read from the
/// environment once (the kubelet sets `HOSTNAME` to the pod name in every
/// container). Falls back to a random UUID when no hostname is present so
/// two replicas never collide. The value must stay fixed for the lifetime
/// of the process; callers compute it once at construction.
pub fn compute_identity() -> String {
    match std::env::var("HOSTNAME") {
        Ok(hostname) if !hostname.is_empty() => format!("{}-{}", IDENTITY_PREFIX, hostname),
        _ => format!("{}-{}", IDENTITY_PREFIX, uuid::Uuid::new_v4()),
    }
}
