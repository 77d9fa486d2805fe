// HTTP implementation of the SubmitBrew port against the brew-log backend.
//
// Purpose
// - POST drafts to the create-brew endpoint and translate transport
//   failures into the port's retryable/terminal taxonomy.
//
// Responsibilities
// - Send the client id as an idempotency key so a resubmit after a lost
//   acknowledgement cannot double-create.
// - Classify: timeout/connect failures are retryable and mean the link is
//   down; 5xx is retryable with the link up; 4xx is terminal.

use async_trait::async_trait;
use std::time::Duration;
use uuid::Uuid;

use crate::core::brew::{BrewPayload, ServerBrew};
use crate::core::ports::{ReachabilityProbe, SubmitBrew, SubmitError};

const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

pub struct HttpSubmitBrew {
    base_url: String,
    client: reqwest::Client,
}

impl HttpSubmitBrew {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SubmitError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SubmitError::Network(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }
}

fn classify_transport(e: reqwest::Error) -> SubmitError {
    if e.is_timeout() {
        SubmitError::Timeout(e.to_string())
    } else {
        SubmitError::Network(e.to_string())
    }
}

#[async_trait]
impl SubmitBrew for HttpSubmitBrew {
    async fn submit(&self, client_id: Uuid, payload: &BrewPayload) -> Result<ServerBrew, SubmitError> {
        let url = format!("{}/brews/", self.base_url);
        let response = self
            .client
            .post(&url)
            .header(IDEMPOTENCY_HEADER, client_id.to_string())
            .json(payload)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(SubmitError::Rejected(format!("{status}: {body}")));
        }
        if status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(SubmitError::Server(format!("{status}: {body}")));
        }

        response
            .json::<ServerBrew>()
            .await
            .map_err(|e| SubmitError::Server(format!("unparsable confirmation: {e}")))
    }
}

/// Cheap reachability check against the API root. Goes over the real network
/// path, so captive portals and dead backends read as unreachable; any HTTP
/// answer at all (including errors) proves the link works.
pub struct HttpReachabilityProbe {
    base_url: String,
    client: reqwest::Client,
}

impl HttpReachabilityProbe {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SubmitError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SubmitError::Network(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }
}

#[async_trait]
impl ReachabilityProbe for HttpReachabilityProbe {
    async fn check(&self) -> bool {
        self.client.get(&self.base_url).send().await.is_ok()
    }
}
