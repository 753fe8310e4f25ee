//! Tests for election metrics

use super::metrics::*;

/// Test all metrics register without collisions
#[test]
fn test_create_metrics_succeeds() {
    let metrics = create_metrics().expect("metrics should register");
    assert_eq!(metrics.elections_won_total.get(), 0);
    assert_eq!(metrics.is_leader.get(), 0);
}

/// Test counters and the leadership gauge move independently
#[test]
fn test_metrics_record_election_activity() {
    let metrics = ElectionMetrics::new().expect("metrics");

    metrics.acquisition_attempts_total.inc();
    metrics.elections_won_total.inc();
    metrics.is_leader.set(1);
    metrics.renewals_total.inc();
    metrics.renewals_total.inc();

    assert_eq!(metrics.acquisition_attempts_total.get(), 1);
    assert_eq!(metrics.elections_won_total.get(), 1);
    assert_eq!(metrics.renewals_total.get(), 2);
    assert_eq!(metrics.is_leader.get(), 1);

    metrics.is_leader.set(0);
    metrics.leadership_lost_total.inc();
    assert_eq!(metrics.is_leader.get(), 0);
    assert_eq!(metrics.leadership_lost_total.get(), 1);
}

/// Test the text encoding carries every election metric
#[test]
fn test_encode_contains_all_metrics() {
    let metrics = ElectionMetrics::new().expect("metrics");
    metrics.acquisition_attempts_total.inc();

    let body = metrics.encode().expect("encode");

    assert!(body.contains("johto_acquisition_attempts_total"));
    assert!(body.contains("johto_elections_won_total"));
    assert!(body.contains("johto_leadership_lost_total"));
    assert!(body.contains("johto_renewals_total"));
    assert!(body.contains("johto_renewal_failures_total"));
    assert!(body.contains("johto_watch_reconnects_total"));
    assert!(body.contains("johto_is_leader"));
}

/// Test two instances keep independent registries
#[test]
fn test_registries_are_independent() {
    let a = ElectionMetrics::new().expect("metrics");
    let b = ElectionMetrics::new().expect("metrics");

    a.elections_won_total.inc();

    assert_eq!(a.elections_won_total.get(), 1);
    assert_eq!(b.elections_won_total.get(), 0);
}
