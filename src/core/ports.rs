// Ports define what the sync engine needs from the outside world, without
// implementing it.
//
// Purpose
// - Describe the consumed collaborators as traits: the persistent key-value
//   substrate, the remote submit-brew operation, and a reachability probe.
//
// Responsibilities
// - Keep the core independent of any storage backend or HTTP client.
// - Expose the retryable-vs-terminal failure classification the orchestrator
//   and the connectivity monitor depend on.
//
// Testing guidance
// - In-memory implementations live under adapters/in_memory.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::core::brew::{BrewPayload, ServerBrew};

/// Failures of the persistent substrate. Never swallowed: silent loss of a
/// draft is the single worst outcome this subsystem can produce.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("storage quota exceeded")]
    QuotaExceeded,

    #[error("corrupt record under {key}: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Durable key-value storage scoped to the local installation, surviving
/// process restarts. `put` must not return before the write is durable.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn put(&self, key: &str, value: &str) -> Result<(), StorageError>;
    /// Removing an absent key is a no-op, not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
    async fn keys(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}

/// Why a submit attempt failed. The split between the first three variants
/// and `Rejected` decides whether the engine retries automatically or asks
/// a human to intervene.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("network failure: {0}")]
    Network(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    /// The server answered 5xx. Worth retrying, but the link itself is fine,
    /// so this never degrades the connectivity state.
    #[error("server error: {0}")]
    Server(String),

    /// The server rejected this draft's content (validation, conflict, a
    /// referenced bean or bag no longer exists). Retrying cannot help.
    #[error("brew rejected by server: {0}")]
    Rejected(String),
}

impl SubmitError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, SubmitError::Rejected(_))
    }

    /// True for failure classes that indicate the network itself is gone and
    /// the monitor should degrade to offline.
    pub fn is_connectivity_loss(&self) -> bool {
        matches!(self, SubmitError::Network(_) | SubmitError::Timeout(_))
    }
}

/// The remote create-brew operation. `client_id` is the idempotency key, so
/// a retried submit after a lost acknowledgement cannot double-create.
#[async_trait]
pub trait SubmitBrew: Send + Sync {
    async fn submit(&self, client_id: Uuid, payload: &BrewPayload) -> Result<ServerBrew, SubmitError>;
}

/// A cheap reachability check, used by the optional probe loop. Link-layer
/// "online" is necessary but not sufficient (captive portals, outages), so
/// probes go over the real network path.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    async fn check(&self) -> bool;
}
