// Domain records for locally drafted brews.
//
// Purpose
// - Represent a brew exactly as the create-brew endpoint expects it, plus the
//   local bookkeeping the sync engine needs around it.
//
// Boundaries
// - This file must not perform input or output.
// - Keep it framework-free: serde derives only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The create-brew request body. Opaque to the sync engine beyond being
/// serializable; the field set mirrors the backend's brew table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrewPayload {
    pub name: String,
    pub machine_id: i64,
    pub bag_id: i64,
    pub grinder_id: i64,
    pub barista_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brew_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dose: Option<f64>,
    // The backend column is literally named "yield".
    #[serde(rename = "yield", default, skip_serializing_if = "Option::is_none")]
    pub yield_grams: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasting_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reflections: Option<String>,
}

/// A brew as confirmed by the server: the payload plus its server-assigned id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerBrew {
    pub id: i64,
    #[serde(flatten)]
    pub payload: BrewPayload,
}

/// Lifecycle of a draft. `InFlight` and `Synced` are transient: a record is
/// persisted only as `Pending` or `Failed`, and removed once confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DraftState {
    Pending,
    InFlight,
    Synced,
    Failed,
}

/// A brew recorded locally and not yet confirmed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftBrew {
    /// Generated at enqueue, unique within the store, never reused. Also the
    /// idempotency key for resubmission.
    pub client_id: Uuid,
    pub payload: BrewPayload,
    pub created_at: DateTime<Utc>,
    pub state: DraftState,
    /// Push attempts so far. Telemetry, not a retry ceiling: the queue never
    /// silently drops a draft.
    pub attempt_count: u32,
}

impl DraftBrew {
    pub fn new(client_id: Uuid, payload: BrewPayload, created_at: DateTime<Utc>) -> Self {
        Self {
            client_id,
            payload,
            created_at,
            state: DraftState::Pending,
            attempt_count: 0,
        }
    }
}
