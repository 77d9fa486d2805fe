// Run-level value types and the event vocabulary the UI subscribes to.
//
// Purpose
// - Describe one drain-and-submit pass (SyncRun) and its observable outcome.
//
// Boundaries
// - No input or output here; the orchestrator produces these values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a single draft fared within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftOutcome {
    Succeeded,
    FailedRetryable,
    FailedTerminal,
}

/// One execution of the drain protocol over a pending-queue snapshot.
/// Ephemeral: never persisted. The sequence number lets observers discard
/// progress reports from superseded runs.
#[derive(Debug, Clone)]
pub struct SyncRun {
    pub sequence: u64,
    pub drafts: Vec<Uuid>,
    pub outcomes: Vec<(Uuid, DraftOutcome)>,
}

impl SyncRun {
    pub fn new(sequence: u64, drafts: Vec<Uuid>) -> Self {
        Self {
            sequence,
            drafts,
            outcomes: Vec::new(),
        }
    }

    pub fn record(&mut self, client_id: Uuid, outcome: DraftOutcome) {
        self.outcomes.push((client_id, outcome));
    }

    pub fn synced_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| *o == DraftOutcome::Succeeded)
            .count()
    }

    pub fn terminal_drafts(&self) -> Vec<Uuid> {
        self.outcomes
            .iter()
            .filter(|(_, o)| *o == DraftOutcome::FailedTerminal)
            .map(|(id, _)| *id)
            .collect()
    }
}

/// What went wrong in a run, in a shape the UI can render. Cloneable so the
/// single-flight channel can hand it to every attached caller.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncErrorReport {
    pub message: String,
    /// True when the run halted on a network-class failure and the next
    /// online transition (or a manual trigger) will retry automatically.
    pub retryable: bool,
    /// Drafts the server rejected during this run. They moved to the
    /// persisted failed state and need human attention.
    pub terminal_drafts: Vec<Uuid>,
}

/// Events published to sync listeners. Late subscribers do not see events
/// from a run already past that point; there is no replay.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    Started { drafts_count: usize },
    Completed { synced_count: usize },
    Error { report: SyncErrorReport },
}

/// Result of `sync_pending_drafts`, shared with every caller that attached
/// to the run.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// Every snapshotted draft reached the server.
    Completed { synced_count: usize },
    /// The snapshot was empty; nothing was attempted and no events fired.
    NoOp,
    /// The run halted on a retryable failure, or finished with server
    /// rejections. Some drafts may still have synced before the error.
    Errored { report: SyncErrorReport },
}

/// Read-only storage projection for the UI ("3 pending, synced 5m ago").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageInfo {
    pub pending_drafts: usize,
    pub failed_drafts: usize,
    pub last_sync: Option<DateTime<Utc>>,
}
