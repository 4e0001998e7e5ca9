// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! CAPTCHA token verification against Cloudflare Turnstile.

use crate::config::CaptchaConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Verification errors. Both variants mean no success flag was obtained.
#[derive(Debug, Error)]
pub enum CaptchaError {
    #[error("Verification request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Verification response unreadable: {0}")]
    Decode(String),
}

/// Verification outcome reported by the challenge service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptchaVerification {
    #[serde(default)]
    pub success: bool,

    #[serde(default, rename = "error-codes")]
    pub error_codes: Vec<String>,
}

/// Verifies a client-supplied challenge token.
#[async_trait]
pub trait CaptchaVerifier: Send + Sync {
    async fn verify(
        &self,
        secret: &str,
        token: &str,
        remote_ip: &str,
    ) -> Result<CaptchaVerification, CaptchaError>;
}

/// Turnstile `siteverify` client.
pub struct TurnstileVerifier {
    verify_url: String,
    client: reqwest::Client,
}

impl TurnstileVerifier {
    pub fn new(verify_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            verify_url: verify_url.into(),
            client,
        }
    }

    /// Build a verifier with its own client honouring the configured timeout.
    pub fn from_config(config: &CaptchaConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self::new(config.verify_url.clone(), client))
    }
}

#[async_trait]
impl CaptchaVerifier for TurnstileVerifier {
    async fn verify(
        &self,
        secret: &str,
        token: &str,
        remote_ip: &str,
    ) -> Result<CaptchaVerification, CaptchaError> {
        let response = self
            .client
            .post(&self.verify_url)
            .form(&[("secret", secret), ("response", token), ("remoteip", remote_ip)])
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        let verification: CaptchaVerification = serde_json::from_slice(&body)
            .map_err(|e| CaptchaError::Decode(format!("{status}: {e}")))?;

        debug!(
            %status,
            success = verification.success,
            error_codes = ?verification.error_codes,
            "Turnstile verification completed"
        );
        Ok(verification)
    }
}
