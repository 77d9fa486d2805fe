// In memory implementation of the SubmitBrew port.
//
// Purpose
// - Script the remote service for orchestrator tests: which calls fail, how,
//   and how slowly.
//
// Responsibilities
// - Log every call so tests can assert at-most-once delivery and ordering.
// - Fail specific calls (1-based, counted across runs) with a planned error.
// - Optionally delay responses so single-flight behavior can be observed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::core::brew::{BrewPayload, ServerBrew};
use crate::core::ports::{SubmitBrew, SubmitError};

#[derive(Default)]
pub struct InMemorySubmitBrew {
    calls: Mutex<Vec<Uuid>>,
    planned_failures: Mutex<HashMap<u64, SubmitError>>,
    delay: Mutex<Option<Duration>>,
    call_counter: AtomicU64,
    next_server_id: AtomicI64,
}

impl InMemorySubmitBrew {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the nth call (1-based, across all runs) fail with `error`.
    pub async fn fail_on_call(&self, nth: u64, error: SubmitError) {
        self.planned_failures.lock().await.insert(nth, error);
    }

    /// Sleeps before answering each call.
    pub async fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().await = delay;
    }

    /// Every client id submitted so far, in call order.
    pub async fn calls(&self) -> Vec<Uuid> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }
}

#[async_trait::async_trait]
impl SubmitBrew for InMemorySubmitBrew {
    async fn submit(&self, client_id: Uuid, payload: &BrewPayload) -> Result<ServerBrew, SubmitError> {
        let delay = *self.delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let nth = self.call_counter.fetch_add(1, Ordering::SeqCst) + 1;
        self.calls.lock().await.push(client_id);

        if let Some(error) = self.planned_failures.lock().await.remove(&nth) {
            return Err(error);
        }

        Ok(ServerBrew {
            id: self.next_server_id.fetch_add(1, Ordering::SeqCst) + 1,
            payload: payload.clone(),
        })
    }
}
