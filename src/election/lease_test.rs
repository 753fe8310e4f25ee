//! Tests for lease predicates and record helpers

use super::lease::*;
use chrono::Utc;
use k8s_openapi::api::coordination::v1::{Lease, LeaseSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::MicroTime;
use kube::api::ObjectMeta;

fn lease_with(
    holder: Option<&str>,
    renew_secs_ago: Option<i64>,
    duration: Option<i32>,
) -> Lease {
    let now = Utc::now();
    Lease {
        metadata: ObjectMeta {
            name: Some("test-lease".to_string()),
            namespace: Some("default".to_string()),
            resource_version: Some("42".to_string()),
            ..Default::default()
        },
        spec: Some(LeaseSpec {
            holder_identity: holder.map(str::to_string),
            renew_time: renew_secs_ago.map(|s| MicroTime(now - chrono::Duration::seconds(s))),
            lease_duration_seconds: duration,
            lease_transitions: Some(3),
            ..Default::default()
        }),
    }
}

/// Test lease is not expired when within its validity window
#[test]
fn test_lease_not_expired_within_window() {
    let now = Utc::now();
    let lease = lease_with(Some("johto-hostB"), Some(5), Some(15));
    assert!(!is_expired(&lease, now), "5s into a 15s window");
}

/// Test lease is expired when past its validity window
#[test]
fn test_lease_expired_past_window() {
    let now = Utc::now();
    let lease = lease_with(Some("johto-hostB"), Some(20), Some(15));
    assert!(is_expired(&lease, now), "20s into a 15s window");
}

/// Test a lease exactly at its expiry instant is not expired.
/// Ties favor the incumbent.
#[test]
fn test_lease_not_expired_at_exact_boundary() {
    let now = Utc::now();
    let renew = MicroTime(now - chrono::Duration::seconds(15));
    let mut lease = lease_with(Some("johto-hostB"), None, Some(15));
    if let Some(spec) = lease.spec.as_mut() {
        spec.renew_time = Some(renew);
    }
    assert!(
        !is_expired(&lease, now),
        "now == renewTime + duration is still valid"
    );
}

/// Test lease is expired just past the boundary
#[test]
fn test_lease_expired_just_past_boundary() {
    let now = Utc::now();
    let lease = lease_with(Some("johto-hostB"), Some(16), Some(15));
    assert!(is_expired(&lease, now), "1s past the boundary");
}

/// Test lease with no renew time is treated as expired
#[test]
fn test_lease_expired_without_renew_time() {
    let now = Utc::now();
    let lease = lease_with(Some("johto-hostB"), None, Some(15));
    assert!(is_expired(&lease, now));
}

/// Test lease with no duration expires as soon as renewTime passes
#[test]
fn test_lease_without_duration_expires_immediately() {
    let now = Utc::now();
    let lease = lease_with(Some("johto-hostB"), Some(1), None);
    assert!(is_expired(&lease, now));
}

/// Test lease with no spec is treated as expired
#[test]
fn test_lease_without_spec_is_expired() {
    let lease = Lease::default();
    assert!(is_expired(&lease, Utc::now()));
}

/// Test expiry is monotone in time for a fixed lease
#[test]
fn test_expiry_monotone_in_time() {
    let now = Utc::now();
    let lease = lease_with(Some("johto-hostB"), Some(10), Some(15));

    let mut was_expired = false;
    for offset in 0..30 {
        let t = now + chrono::Duration::seconds(offset);
        let expired = is_expired(&lease, t);
        assert!(
            expired || !was_expired,
            "expired lease must not become valid again at +{}s",
            offset
        );
        was_expired = expired;
    }
}

/// Test holder extraction and ownership predicates
#[test]
fn test_holder_predicates() {
    let held = lease_with(Some("johto-hostA"), Some(1), Some(15));
    assert_eq!(holder(&held), Some("johto-hostA"));
    assert!(held_by_us(&held, "johto-hostA"));
    assert!(!held_by_us(&held, "johto-hostB"));
    assert!(!is_unheld(&held));
}

/// Test absent holder identity counts as unheld
#[test]
fn test_absent_holder_is_unheld() {
    let lease = lease_with(None, Some(1), Some(15));
    assert!(is_unheld(&lease));
    assert!(!held_by_us(&lease, "johto-hostA"));
}

/// Test empty holder identity counts as unheld
#[test]
fn test_empty_holder_is_unheld() {
    let lease = lease_with(Some(""), Some(1), Some(15));
    assert!(is_unheld(&lease));
    assert!(holder(&lease).is_none());
    assert!(!held_by_us(&lease, ""));
}

/// Test a freshly built record claims ownership with both timestamps
#[test]
fn test_build_sets_ownership_and_timestamps() {
    let now = Utc::now();
    let lease = build("my-lease", "my-ns", "johto-hostA", 20, now);

    assert_eq!(lease.metadata.name.as_deref(), Some("my-lease"));
    assert_eq!(lease.metadata.namespace.as_deref(), Some("my-ns"));

    let spec = lease.spec.expect("spec");
    assert_eq!(spec.holder_identity.as_deref(), Some("johto-hostA"));
    assert_eq!(spec.lease_duration_seconds, Some(20));
    assert_eq!(spec.acquire_time, Some(MicroTime(now)));
    assert_eq!(spec.renew_time, Some(MicroTime(now)));
    assert_eq!(spec.lease_transitions, Some(0));
}

/// Test claiming preserves the resource version and counts the transition
#[test]
fn test_claim_preserves_version_and_counts_transition() {
    let now = Utc::now();
    let existing = lease_with(Some("johto-hostB"), Some(60), Some(15));
    let claimed = claim(existing, "johto-hostA", 20, now);

    assert_eq!(
        claimed.metadata.resource_version.as_deref(),
        Some("42"),
        "resourceVersion must ride along for the optimistic-concurrency check"
    );

    let spec = claimed.spec.expect("spec");
    assert_eq!(spec.holder_identity.as_deref(), Some("johto-hostA"));
    assert_eq!(spec.lease_duration_seconds, Some(20));
    assert_eq!(spec.acquire_time, Some(MicroTime(now)));
    assert_eq!(spec.renew_time, Some(MicroTime(now)));
    assert_eq!(spec.lease_transitions, Some(4));
}

/// Test renewal only moves the heartbeat
#[test]
fn test_renewed_moves_only_renew_time() {
    let now = Utc::now();
    let existing = lease_with(Some("johto-hostA"), Some(9), Some(20));
    let acquire_before = existing.spec.as_ref().and_then(|s| s.acquire_time.clone());

    let renewed = renewed(existing, 20, now);
    let spec = renewed.spec.expect("spec");

    assert_eq!(spec.renew_time, Some(MicroTime(now)));
    assert_eq!(spec.acquire_time, acquire_before, "acquireTime untouched");
    assert_eq!(spec.holder_identity.as_deref(), Some("johto-hostA"));
    assert_eq!(spec.lease_transitions, Some(3), "renewal is not a transition");
}

/// Test release clears holder and heartbeat but keeps the record
#[test]
fn test_cleared_empties_holder_and_heartbeat() {
    let existing = lease_with(Some("johto-hostA"), Some(1), Some(20));
    let cleared = cleared(existing);

    let spec = cleared.spec.expect("spec");
    assert_eq!(spec.holder_identity, None);
    assert_eq!(spec.renew_time, None);
    assert_eq!(spec.lease_transitions, Some(4));
    assert!(is_unheld(&Lease {
        metadata: ObjectMeta::default(),
        spec: Some(spec),
    }));
}
