//! Pure predicates and record helpers for coordination.k8s.io/v1 Leases.
//!
//! Everything here is side-effect free so the election engine's branching
//! can be tested without a cluster.

use chrono::{DateTime, Utc};
use k8s_openapi::api::coordination::v1::{Lease, LeaseSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::MicroTime;
use kube::api::ObjectMeta;

/// Check whether a lease's validity window has passed.
///
/// A lease is expired when `now` is strictly past `renewTime +
/// leaseDurationSeconds`. Ties favor the incumbent: a lease exactly at its
/// expiry instant is still valid, which reduces flapping between replicas
/// whose clocks run close together. A lease with no `renewTime` is expired.
pub fn is_expired(lease: &Lease, now: DateTime<Utc>) -> bool {
    let spec = lease.spec.as_ref();
    let duration = spec
        .and_then(|s| s.lease_duration_seconds)
        .unwrap_or(0);

    match spec.and_then(|s| s.renew_time.as_ref()) {
        Some(MicroTime(renewed)) => now > *renewed + chrono::Duration::seconds(i64::from(duration)),
        None => true,
    }
}

/// Current holder identity, if any. An empty string counts as unheld.
pub fn holder(lease: &Lease) -> Option<&str> {
    lease
        .spec
        .as_ref()?
        .holder_identity
        .as_deref()
        .filter(|h| !h.is_empty())
}

/// Whether this participant currently owns the lease.
pub fn held_by_us(lease: &Lease, identity: &str) -> bool {
    holder(lease) == Some(identity)
}

/// Whether no participant currently owns the lease.
pub fn is_unheld(lease: &Lease) -> bool {
    holder(lease).is_none()
}

/// Build a fresh lease record claiming ownership for `identity`.
///
/// Used when the lease does not exist yet; both `acquireTime` and
/// `renewTime` start at `now`.
pub fn build(
    name: &str,
    namespace: &str,
    identity: &str,
    duration_seconds: i32,
    now: DateTime<Utc>,
) -> Lease {
    Lease {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: Some(LeaseSpec {
            holder_identity: Some(identity.to_string()),
            lease_duration_seconds: Some(duration_seconds),
            acquire_time: Some(MicroTime(now)),
            renew_time: Some(MicroTime(now)),
            lease_transitions: Some(0),
            ..Default::default()
        }),
    }
}

/// Take ownership of an existing lease record in place.
///
/// The metadata (including `resourceVersion`) is preserved so the write
/// goes through the store's optimistic-concurrency check.
pub fn claim(mut lease: Lease, identity: &str, duration_seconds: i32, now: DateTime<Utc>) -> Lease {
    let spec = lease.spec.get_or_insert_with(LeaseSpec::default);
    let transitions = spec.lease_transitions.unwrap_or(0);

    spec.holder_identity = Some(identity.to_string());
    spec.lease_duration_seconds = Some(duration_seconds);
    spec.acquire_time = Some(MicroTime(now));
    spec.renew_time = Some(MicroTime(now));
    spec.lease_transitions = Some(transitions + 1);
    lease
}

/// Refresh the heartbeat on a lease we already hold.
///
/// Only `renewTime` moves; `acquireTime` keeps marking the last ownership
/// transition.
pub fn renewed(mut lease: Lease, duration_seconds: i32, now: DateTime<Utc>) -> Lease {
    let spec = lease.spec.get_or_insert_with(LeaseSpec::default);
    spec.lease_duration_seconds = Some(duration_seconds);
    spec.renew_time = Some(MicroTime(now));
    lease
}

/// Empty the holder on graceful release.
///
/// The record itself is never deleted; peers observe the cleared holder
/// through the watch and race for acquisition.
pub fn cleared(mut lease: Lease) -> Lease {
    let spec = lease.spec.get_or_insert_with(LeaseSpec::default);
    let transitions = spec.lease_transitions.unwrap_or(0);

    spec.holder_identity = None;
    spec.renew_time = None;
    spec.lease_transitions = Some(transitions + 1);
    lease
}
