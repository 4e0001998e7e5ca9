// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Forwarding accepted submissions to the upstream form processor.

use crate::config::RelayConfig;
use crate::submission::FormPayload;
use async_trait::async_trait;
use axum::http::{header, StatusCode};
use thiserror::Error;
use tracing::debug;

/// Message returned to the caller when the upstream gives no usable error.
pub const GENERIC_UPSTREAM_ERROR: &str = "Upstream error";

/// Relay failures.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Upstream rejected submission ({status}): {message}")]
    Rejected { status: StatusCode, message: String },

    #[error("Upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl RelayError {
    /// Message safe to pass back to the form.
    pub fn client_message(&self) -> &str {
        match self {
            RelayError::Rejected { message, .. } => message,
            RelayError::Transport(_) => GENERIC_UPSTREAM_ERROR,
        }
    }
}

/// Delivers a submission upstream.
#[async_trait]
pub trait SubmissionRelay: Send + Sync {
    async fn relay(&self, payload: &FormPayload) -> Result<(), RelayError>;
}

/// Relays the original form body over HTTP (Formspree by default).
pub struct HttpRelay {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpRelay {
    pub fn new(endpoint: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            endpoint: endpoint.into(),
            client,
        }
    }

    /// Build a relay with its own client honouring the configured timeout.
    pub fn from_config(config: &RelayConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self::new(config.endpoint.clone(), client))
    }
}

#[async_trait]
impl SubmissionRelay for HttpRelay {
    async fn relay(&self, payload: &FormPayload) -> Result<(), RelayError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(header::ACCEPT, "application/json")
            .header(header::CONTENT_TYPE, payload.content_type())
            .body(payload.body().clone())
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!(%status, "Submission relayed");
            return Ok(());
        }

        let body = response.bytes().await.unwrap_or_default();
        Err(RelayError::Rejected {
            status,
            message: upstream_error_message(&body),
        })
    }
}

/// Pull a string `error` field out of an upstream JSON body.
pub fn upstream_error_message(body: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .filter(|msg| !msg.is_empty())
        .unwrap_or_else(|| GENERIC_UPSTREAM_ERROR.to_string())
}
