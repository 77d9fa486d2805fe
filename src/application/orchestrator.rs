// Sync orchestrator: drives the drain-and-submit protocol.
//
// Purpose
// - Drain the pending queue oldest-first against the remote service, with
//   at-most-one-active-run semantics and progress events for the UI.
//
// Responsibilities
// - Single-flight: a call arriving while a run is active attaches to that
//   run's result instead of starting a second drain.
// - Per record: count the attempt, submit once, settle the store immediately
//   on success so a crash mid-run leaves it consistent.
// - Halt on the first retryable failure; route server rejections to the
//   persisted failed state and keep draining.
// - Advance the last-sync timestamp only on a fully clean run.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::Utc;
use tokio::sync::watch;

use crate::application::connectivity::ConnectivityMonitor;
use crate::application::draft_store::DraftStore;
use crate::application::subscriptions::{SubscriberRegistry, Subscription};
use crate::core::ports::{KeyValueStore, StorageError, SubmitBrew};
use crate::core::sync::{
    DraftOutcome, StorageInfo, SyncErrorReport, SyncEvent, SyncOutcome, SyncRun,
};

type RunResult = watch::Receiver<Option<SyncOutcome>>;

enum RunEntry {
    Leader(watch::Sender<Option<SyncOutcome>>),
    Follower(RunResult),
}

struct RunSlot {
    active: Option<RunResult>,
}

pub struct SyncOrchestrator<K: KeyValueStore, S: SubmitBrew> {
    store: Arc<DraftStore<K>>,
    remote: Arc<S>,
    monitor: Arc<ConnectivityMonitor>,
    listeners: SubscriberRegistry<SyncEvent>,
    run: tokio::sync::Mutex<RunSlot>,
    running: AtomicBool,
    sequence: AtomicU64,
}

impl<K, S> SyncOrchestrator<K, S>
where
    K: KeyValueStore + 'static,
    S: SubmitBrew + 'static,
{
    pub fn new(store: Arc<DraftStore<K>>, remote: Arc<S>, monitor: Arc<ConnectivityMonitor>) -> Self {
        Self {
            store,
            remote,
            monitor,
            listeners: SubscriberRegistry::new(),
            run: tokio::sync::Mutex::new(RunSlot { active: None }),
            running: AtomicBool::new(false),
            sequence: AtomicU64::new(0),
        }
    }

    /// Subscribes to run events (`Started`, `Completed`, `Error`). No replay:
    /// a late subscriber does not see events from a run already past them.
    pub fn add_sync_listener(
        &self,
        callback: impl Fn(&SyncEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.listeners.subscribe(callback)
    }

    pub fn is_sync_in_progress(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Pending drafts as the store sees them right now, mid-run included.
    pub async fn pending_sync_count(&self) -> Result<usize, StorageError> {
        self.store.pending_count().await
    }

    pub async fn storage_info(&self) -> Result<StorageInfo, StorageError> {
        Ok(StorageInfo {
            pending_drafts: self.store.pending_count().await?,
            failed_drafts: self.store.list_failed().await?.len(),
            last_sync: self.store.last_sync().await?,
        })
    }

    /// Drains the pending queue. If a run is already active this attaches to
    /// it and returns that run's outcome; otherwise it becomes the run.
    pub async fn sync_pending_drafts(&self) -> SyncOutcome {
        let entry = {
            let mut slot = self.run.lock().await;
            match &slot.active {
                Some(result) => RunEntry::Follower(result.clone()),
                None => {
                    let (tx, rx) = watch::channel(None);
                    slot.active = Some(rx);
                    self.running.store(true, Ordering::SeqCst);
                    RunEntry::Leader(tx)
                }
            }
        };

        match entry {
            RunEntry::Leader(tx) => {
                let outcome = self.drive_run().await;
                {
                    let mut slot = self.run.lock().await;
                    slot.active = None;
                    self.running.store(false, Ordering::SeqCst);
                }
                // Followers may already be gone; that is fine.
                let _ = tx.send(Some(outcome.clone()));
                outcome
            }
            RunEntry::Follower(mut rx) => loop {
                if let Some(outcome) = rx.borrow_and_update().clone() {
                    return outcome;
                }
                if rx.changed().await.is_err() {
                    // Leader dropped without settling; treat as retryable.
                    return SyncOutcome::Errored {
                        report: SyncErrorReport {
                            message: "sync run aborted".to_string(),
                            retryable: true,
                            terminal_drafts: Vec::new(),
                        },
                    };
                }
            },
        }
    }

    /// Wires the automatic trigger: an offline-to-online edge with pending
    /// drafts starts a run in the background. Outcomes surface through the
    /// event stream since the edge has no caller to return to.
    pub fn start_auto_sync(self: &Arc<Self>) -> Subscription {
        let orchestrator = Arc::downgrade(self);
        self.monitor.add_listener(move |online| {
            if !*online {
                return;
            }
            let Some(orchestrator) = orchestrator.upgrade() else {
                return;
            };
            tokio::spawn(async move {
                match orchestrator.pending_sync_count().await {
                    Ok(0) => {}
                    Ok(count) => {
                        tracing::info!(count, "connection restored, draining pending drafts");
                        orchestrator.sync_pending_drafts().await;
                    }
                    Err(error) => {
                        tracing::warn!(%error, "could not read pending count after reconnect");
                    }
                }
            });
        })
    }

    async fn drive_run(&self) -> SyncOutcome {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;

        let snapshot = match self.store.list_pending().await {
            Ok(snapshot) => snapshot,
            Err(error) => return self.storage_halt(sequence, error),
        };
        if snapshot.is_empty() {
            tracing::debug!(sequence, "nothing to sync");
            return SyncOutcome::NoOp;
        }

        let mut run = SyncRun::new(sequence, snapshot.iter().map(|d| d.client_id).collect());
        tracing::info!(sequence, drafts = snapshot.len(), "sync run started");
        self.listeners.notify(&SyncEvent::Started {
            drafts_count: snapshot.len(),
        });

        for draft in &snapshot {
            if let Err(error) = self.store.record_attempt(draft.client_id).await {
                return self.storage_halt(sequence, error);
            }
            match self.remote.submit(draft.client_id, &draft.payload).await {
                Ok(confirmed) => {
                    self.monitor.report_success();
                    if let Err(error) = self.store.mark_synced(draft.client_id).await {
                        return self.storage_halt(sequence, error);
                    }
                    run.record(draft.client_id, DraftOutcome::Succeeded);
                    tracing::debug!(sequence, client_id = %draft.client_id, server_id = confirmed.id, "draft synced");
                }
                Err(error) if error.is_retryable() => {
                    // Stop at once: later drafts must not jump the queue.
                    self.monitor.report_submit_error(&error);
                    run.record(draft.client_id, DraftOutcome::FailedRetryable);
                    let report = SyncErrorReport {
                        message: error.to_string(),
                        retryable: true,
                        terminal_drafts: run.terminal_drafts(),
                    };
                    tracing::warn!(sequence, client_id = %draft.client_id, %error, "sync run halted");
                    self.listeners.notify(&SyncEvent::Error {
                        report: report.clone(),
                    });
                    return SyncOutcome::Errored { report };
                }
                Err(error) => {
                    // Rejection is per-record, not connectivity: park it and
                    // keep draining the rest in order.
                    self.monitor.report_submit_error(&error);
                    if let Err(storage_error) = self.store.mark_failed(draft.client_id).await {
                        return self.storage_halt(sequence, storage_error);
                    }
                    run.record(draft.client_id, DraftOutcome::FailedTerminal);
                    tracing::warn!(sequence, client_id = %draft.client_id, %error, "draft rejected by server");
                }
            }
        }

        let synced_count = run.synced_count();
        let terminal = run.terminal_drafts();
        if terminal.is_empty() {
            if let Err(error) = self.store.set_last_sync(Utc::now()).await {
                // Drafts are durably settled; the timestamp is display-only.
                tracing::warn!(sequence, %error, "could not persist last-sync timestamp");
            }
            tracing::info!(sequence, synced_count, "sync run completed");
            self.listeners.notify(&SyncEvent::Completed { synced_count });
            SyncOutcome::Completed { synced_count }
        } else {
            let report = SyncErrorReport {
                message: format!("{} draft(s) rejected by the server", terminal.len()),
                retryable: false,
                terminal_drafts: terminal,
            };
            tracing::warn!(sequence, synced_count, rejected = report.terminal_drafts.len(), "sync run finished with rejections");
            self.listeners.notify(&SyncEvent::Error {
                report: report.clone(),
            });
            SyncOutcome::Errored { report }
        }
    }

    fn storage_halt(&self, sequence: u64, error: StorageError) -> SyncOutcome {
        let report = SyncErrorReport {
            message: error.to_string(),
            retryable: true,
            terminal_drafts: Vec::new(),
        };
        tracing::error!(sequence, %error, "sync run halted on storage failure");
        self.listeners.notify(&SyncEvent::Error {
            report: report.clone(),
        });
        SyncOutcome::Errored { report }
    }
}
