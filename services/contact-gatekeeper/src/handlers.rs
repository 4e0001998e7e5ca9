// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the contact gatekeeper service.

use crate::config::Config;
use crate::gatekeeper::{Gatekeeper, SubmissionContext};
use crate::verdict::{ErrorResponse, Rejection, Verdict};
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

/// Path the contact page posts to.
pub const CONTACT_PATH: &str = "/api/contact";

/// Shared application state.
pub struct AppState {
    pub gatekeeper: Gatekeeper,
    pub config: Config,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Public settings the contact page needs to render its challenge widget.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetConfigResponse {
    pub site_key: Option<String>,
    pub captcha_enabled: bool,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "contact-gatekeeper",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Accept a contact form submission.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            warn!("Submission body exceeds limit");
            let verdict = Verdict::Rejected(Rejection::PayloadTooLarge);
            state.gatekeeper.metrics().record_outcome(verdict.label());
            return verdict.into_response();
        }
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Failed to read submission body");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::unexpected()),
            )
                .into_response();
        }
    };

    state
        .gatekeeper
        .handle_submission(SubmissionContext::new(headers, body))
        .await
        .into_response()
}

/// Site key and CAPTCHA availability for the contact page.
pub async fn widget_config(State(state): State<Arc<AppState>>) -> Json<WidgetConfigResponse> {
    let captcha = &state.config.captcha;
    Json(WidgetConfigResponse {
        site_key: captcha.site_key.clone(),
        captcha_enabled: captcha.secret.is_some() && captcha.site_key.is_some(),
    })
}

/// Prometheus scrape endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.gatekeeper.metrics().render() {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(detail = %detail, "Handler panicked");

    Verdict::Rejected(Rejection::Unexpected).into_response()
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    let mut router = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route(CONTACT_PATH, post(submit))
        .route("/api/contact/config", get(widget_config));

    if state.config.metrics.enabled {
        router = router.route(&state.config.metrics.path, get(metrics));
    }

    router
        .layer(DefaultBodyLimit::max(state.config.submission.max_body_bytes))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
