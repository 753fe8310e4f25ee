//! Tests for elector configuration

use super::config::*;
use std::sync::Mutex;
use std::time::Duration;

// Serializes the tests that mutate process-wide env vars.
static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Test defaults
#[test]
fn test_config_defaults() {
    let config = ElectorConfig::default();

    assert_eq!(config.lease_name, DEFAULT_LEASE_NAME);
    assert_eq!(config.namespace, DEFAULT_NAMESPACE);
    assert_eq!(config.renewal_interval, DEFAULT_RENEWAL_INTERVAL);
    assert!(!config.await_leadership);
    assert_eq!(config.log_at_level, LogAtLevel::Info);
}

/// Test lease duration derivation: twice the renewal interval, in seconds
#[test]
fn test_lease_duration_is_twice_renewal_interval() {
    let config = ElectorConfig::default();
    assert_eq!(config.lease_duration_seconds(), 20);

    let fast = ElectorConfig {
        renewal_interval: Duration::from_millis(1000),
        ..ElectorConfig::default()
    };
    assert_eq!(fast.lease_duration_seconds(), 2);
}

/// Test duration never derives to zero
#[test]
fn test_lease_duration_clamped_to_one_second() {
    let tiny = ElectorConfig {
        renewal_interval: Duration::from_millis(100),
        ..ElectorConfig::default()
    };
    assert_eq!(tiny.lease_duration_seconds(), 1);
}

/// Test bootstrap retry spacing is half the lease duration
#[test]
fn test_retry_backoff_is_half_lease_duration() {
    let config = ElectorConfig::default();
    assert_eq!(config.retry_backoff(), Duration::from_secs(10));

    let fast = ElectorConfig {
        renewal_interval: Duration::from_millis(1000),
        ..ElectorConfig::default()
    };
    assert_eq!(fast.retry_backoff(), Duration::from_millis(1000));
}

/// Test the renewal timer fires strictly before lease expiry
#[test]
fn test_renewal_interval_within_lease_duration() {
    let config = ElectorConfig::default();
    let duration = Duration::from_secs(config.lease_duration_seconds() as u64);
    assert!(config.renewal_interval < duration);
}

/// Test log level parsing; "log" is the wire spelling of Info
#[test]
fn test_log_at_level_parse() {
    assert_eq!(LogAtLevel::parse("log"), LogAtLevel::Info);
    assert_eq!(LogAtLevel::parse("debug"), LogAtLevel::Debug);
    assert_eq!(LogAtLevel::parse("DEBUG"), LogAtLevel::Debug);
    assert_eq!(LogAtLevel::parse("anything-else"), LogAtLevel::Info);
}

/// Test config reads from env
#[test]
fn test_config_from_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    std::env::set_var("JOHTO_LEASE_NAME", "custom-lease");
    std::env::set_var("JOHTO_NAMESPACE", "custom-ns");
    std::env::set_var("JOHTO_RENEWAL_INTERVAL_MS", "5000");
    std::env::set_var("JOHTO_AWAIT_LEADERSHIP", "true");
    std::env::set_var("JOHTO_LOG_AT_LEVEL", "debug");

    let config = ElectorConfig::from_env();

    assert_eq!(config.lease_name, "custom-lease");
    assert_eq!(config.namespace, "custom-ns");
    assert_eq!(config.renewal_interval, Duration::from_millis(5000));
    assert!(config.await_leadership);
    assert_eq!(config.log_at_level, LogAtLevel::Debug);
    assert_eq!(config.lease_duration_seconds(), 10);

    // Clean up
    std::env::remove_var("JOHTO_LEASE_NAME");
    std::env::remove_var("JOHTO_NAMESPACE");
    std::env::remove_var("JOHTO_RENEWAL_INTERVAL_MS");
    std::env::remove_var("JOHTO_AWAIT_LEADERSHIP");
    std::env::remove_var("JOHTO_LOG_AT_LEVEL");
}

/// Test unparseable interval falls back to the default
#[test]
fn test_config_from_env_ignores_bad_interval() {
    let _guard = ENV_LOCK.lock().unwrap();
    std::env::set_var("JOHTO_RENEWAL_INTERVAL_MS", "not-a-number");

    let config = ElectorConfig::from_env();
    assert_eq!(config.renewal_interval, DEFAULT_RENEWAL_INTERVAL);

    std::env::remove_var("JOHTO_RENEWAL_INTERVAL_MS");
}
