//! Thin wrapper over the Lease coordination API.
//!
//! The trait keeps the election engine testable against an in-memory
//! store; the kube binding maps HTTP status codes into explicit outcomes
//! so the state machine's branches are total.

use async_trait::async_trait;
use k8s_openapi::api::coordination::v1::Lease;
use kube::api::{Api, PostParams};
use kube::Client;
use thiserror::Error;

/// Outcomes of lease store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("lease not found")]
    NotFound,

    #[error("lease already exists")]
    AlreadyExists,

    #[error("lease resource version conflict")]
    Conflict,

    #[error("Kubernetes API error: {0}")]
    Api(kube::Error),
}

/// Read/create/replace access to a single namespace's leases.
#[async_trait]
pub trait LeaseStore: Send + Sync {
    /// Fetch a lease by name.
    async fn get(&self, name: &str) -> Result<Lease, StoreError>;

    /// Create a lease; fails with `AlreadyExists` if a peer won the race.
    async fn create(&self, lease: &Lease) -> Result<Lease, StoreError>;

    /// Replace a lease. The record must carry the `resourceVersion` from
    /// the read it is based on; a stale version fails with `Conflict`.
    async fn replace(&self, name: &str, lease: &Lease) -> Result<Lease, StoreError>;
}

/// Lease store backed by the cluster's coordination API.
///
/// Stateless beyond the client's ambient authentication (service-account
/// token mounted by the kubelet).
pub struct KubeLeaseStore {
    api: Api<Lease>,
}

impl KubeLeaseStore {
    pub fn new(client: Client, namespace: &str) -> Self {
        Self {
            api: Api::namespaced(client, namespace),
        }
    }
}

pub(crate) fn map_read_err(err: kube::Error) -> StoreError {
    match err {
        kube::Error::Api(resp) if resp.code == 404 => StoreError::NotFound,
        other => StoreError::Api(other),
    }
}

pub(crate) fn map_create_err(err: kube::Error) -> StoreError {
    match err {
        kube::Error::Api(resp) if resp.code == 409 => StoreError::AlreadyExists,
        other => StoreError::Api(other),
    }
}

pub(crate) fn map_replace_err(err: kube::Error) -> StoreError {
    match err {
        kube::Error::Api(resp) if resp.code == 409 => StoreError::Conflict,
        kube::Error::Api(resp) if resp.code == 404 => StoreError::NotFound,
        other => StoreError::Api(other),
    }
}

#[async_trait]
impl LeaseStore for KubeLeaseStore {
    async fn get(&self, name: &str) -> Result<Lease, StoreError> {
        self.api.get(name).await.map_err(map_read_err)
    }

    async fn create(&self, lease: &Lease) -> Result<Lease, StoreError> {
        self.api
            .create(&PostParams::default(), lease)
            .await
            .map_err(map_create_err)
    }

    async fn replace(&self, name: &str, lease: &Lease) -> Result<Lease, StoreError> {
        self.api
            .replace(name, &PostParams::default(), lease)
            .await
            .map_err(map_replace_err)
    }
}
