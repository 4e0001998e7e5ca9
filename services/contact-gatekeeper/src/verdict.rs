// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Terminal outcomes of a submission and their HTTP representation.

use axum::{
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Why a submission was refused. The display text is what the form shows.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Invalid origin")]
    InvalidOrigin,

    #[error("Invalid form data")]
    InvalidForm,

    #[error("Payload too large")]
    PayloadTooLarge,

    #[error("Missing required fields")]
    MissingFields,

    #[error("Form submitted too quickly")]
    TooFast,

    #[error("Too many requests. Please try later.")]
    RateLimited { retry_after: Duration },

    #[error("Server misconfiguration (captcha secret)")]
    CaptchaNotConfigured,

    #[error("Captcha required")]
    CaptchaRequired,

    #[error("Captcha failed")]
    CaptchaFailed,

    #[error("{0}")]
    Upstream(String),

    #[error("Unexpected error")]
    Unexpected,
}

impl Rejection {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidOrigin
            | Self::InvalidForm
            | Self::MissingFields
            | Self::CaptchaRequired
            | Self::CaptchaFailed => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::TooFast | Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::CaptchaNotConfigured | Self::Unexpected => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Stable machine-readable code, also used as the metrics label.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidOrigin => "invalid_origin",
            Self::InvalidForm => "invalid_form",
            Self::PayloadTooLarge => "payload_too_large",
            Self::MissingFields => "missing_fields",
            Self::TooFast => "too_fast",
            Self::RateLimited { .. } => "rate_limited",
            Self::CaptchaNotConfigured => "captcha_not_configured",
            Self::CaptchaRequired => "captcha_required",
            Self::CaptchaFailed => "captcha_failed",
            Self::Upstream(_) => "upstream_error",
            Self::Unexpected => "unexpected",
        }
    }

    /// Whole seconds a rate-limited caller should wait, rounded up.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after } => {
                let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
                Some(secs.max(1))
            }
            _ => None,
        }
    }
}

/// Final result of running a submission through the gatekeeper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// All checks passed and the submission was relayed
    Accepted,
    /// Honeypot tripped: reported as success, silently dropped
    Discarded,
    /// Refused with a caller-visible reason
    Rejected(Rejection),
}

impl Verdict {
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Accepted => "accepted",
            Verdict::Discarded => "discarded",
            Verdict::Rejected(rejection) => rejection.code(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Verdict::Accepted | Verdict::Discarded => StatusCode::OK,
            Verdict::Rejected(rejection) => rejection.status(),
        }
    }
}

impl From<Rejection> for Verdict {
    fn from(rejection: Rejection) -> Self {
        Verdict::Rejected(rejection)
    }
}

/// Success response body.
#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub ok: bool,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl ErrorResponse {
    pub fn unexpected() -> Self {
        Self::from(&Rejection::Unexpected)
    }
}

impl From<&Rejection> for ErrorResponse {
    fn from(rejection: &Rejection) -> Self {
        Self {
            error: rejection.to_string(),
            code: rejection.code(),
            retry_after_secs: rejection.retry_after_secs(),
        }
    }
}

impl IntoResponse for Verdict {
    fn into_response(self) -> Response {
        match self {
            Verdict::Accepted | Verdict::Discarded => {
                (StatusCode::OK, Json(SubmissionResponse { ok: true })).into_response()
            }
            Verdict::Rejected(rejection) => {
                let body = ErrorResponse::from(&rejection);
                let retry_after = body.retry_after_secs;
                let mut response = (rejection.status(), Json(body)).into_response();
                if let Some(secs) = retry_after {
                    if let Ok(v) = HeaderValue::from_str(&secs.to_string()) {
                        response.headers_mut().insert(RETRY_AFTER, v);
                    }
                }
                response
            }
        }
    }
}
