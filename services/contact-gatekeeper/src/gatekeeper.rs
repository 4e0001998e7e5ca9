// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! The contact submission pipeline.
//!
//! A submission passes through [`Stage::PIPELINE`] in order. Each stage
//! either lets the submission continue or ends it with a [`Verdict`]; the
//! first terminal verdict wins, so stage order is also the precedence of
//! rejection reasons. The upstream relay is the last stage and runs at
//! most once per submission.

use crate::captcha::CaptchaVerifier;
use crate::config::Config;
use crate::limiter::{RateLimit, RateLimitResult};
use crate::metrics::GatekeeperMetrics;
use crate::relay::SubmissionRelay;
use crate::submission::{client_ip, FieldLimits, FormPayload, SubmissionRequest};
use crate::verdict::{Rejection, Verdict};
use axum::body::Bytes;
use axum::http::{header, HeaderMap};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Origin,
    Decode,
    RequiredFields,
    Honeypot,
    FillTime,
    RateLimit,
    Captcha,
    Relay,
}

impl Stage {
    pub const PIPELINE: [Stage; 8] = [
        Stage::Origin,
        Stage::Decode,
        Stage::RequiredFields,
        Stage::Honeypot,
        Stage::FillTime,
        Stage::RateLimit,
        Stage::Captcha,
        Stage::Relay,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Origin => "origin",
            Stage::Decode => "decode",
            Stage::RequiredFields => "required_fields",
            Stage::Honeypot => "honeypot",
            Stage::FillTime => "fill_time",
            Stage::RateLimit => "rate_limit",
            Stage::Captcha => "captcha",
            Stage::Relay => "relay",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything the gatekeeper sees of an inbound request.
#[derive(Debug, Clone)]
pub struct SubmissionContext {
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl SubmissionContext {
    pub fn new(headers: HeaderMap, body: Bytes) -> Self {
        Self { headers, body }
    }
}

/// `Err` ends the pipeline with that verdict.
type StageResult = Result<(), Verdict>;

/// Per-submission state accumulated as stages run.
struct Flow {
    ctx: SubmissionContext,
    client_ip: String,
    decoded: Option<(FormPayload, SubmissionRequest)>,
}

impl Flow {
    fn decoded(&self) -> Result<&(FormPayload, SubmissionRequest), Verdict> {
        // Only reachable if a stage is ordered before Decode.
        self.decoded
            .as_ref()
            .ok_or(Verdict::Rejected(Rejection::Unexpected))
    }
}

/// Validates, rate-limits and bot-filters contact submissions, then relays
/// the survivors upstream.
pub struct Gatekeeper {
    limiter: Arc<dyn RateLimit>,
    verifier: Arc<dyn CaptchaVerifier>,
    relay: Arc<dyn SubmissionRelay>,
    metrics: Arc<GatekeeperMetrics>,
    captcha_secret: Option<String>,
    limits: FieldLimits,
    min_fill_ms: i64,
}

impl Gatekeeper {
    pub fn new(
        config: &Config,
        limiter: Arc<dyn RateLimit>,
        verifier: Arc<dyn CaptchaVerifier>,
        relay: Arc<dyn SubmissionRelay>,
        metrics: Arc<GatekeeperMetrics>,
    ) -> Self {
        Self {
            limiter,
            verifier,
            relay,
            metrics,
            captcha_secret: config.captcha.secret.clone(),
            limits: FieldLimits::from(&config.submission),
            min_fill_ms: config.submission.min_fill_ms,
        }
    }

    pub fn metrics(&self) -> &GatekeeperMetrics {
        &self.metrics
    }

    /// Run a submission through every stage and return the final verdict.
    pub async fn handle_submission(&self, ctx: SubmissionContext) -> Verdict {
        let mut flow = Flow {
            client_ip: client_ip(&ctx.headers),
            ctx,
            decoded: None,
        };

        let verdict = match self.run_pipeline(&mut flow).await {
            Ok(()) => Verdict::Accepted,
            Err(verdict) => verdict,
        };

        self.metrics.record_outcome(verdict.label());
        match &verdict {
            Verdict::Accepted => info!(ip = %flow.client_ip, "Submission accepted and relayed"),
            Verdict::Discarded => warn!(ip = %flow.client_ip, "Honeypot filled, submission discarded"),
            Verdict::Rejected(rejection) => info!(
                ip = %flow.client_ip,
                code = rejection.code(),
                status = rejection.status().as_u16(),
                "Submission rejected"
            ),
        }
        verdict
    }

    async fn run_pipeline(&self, flow: &mut Flow) -> StageResult {
        for stage in Stage::PIPELINE {
            debug!(stage = %stage, ip = %flow.client_ip, "Running stage");
            self.run_stage(stage, flow).await?;
        }
        Ok(())
    }

    async fn run_stage(&self, stage: Stage, flow: &mut Flow) -> StageResult {
        match stage {
            Stage::Origin => check_origin(&flow.ctx.headers),
            Stage::Decode => self.decode(flow).await,
            Stage::RequiredFields => {
                let (_, request) = flow.decoded()?;
                if request.has_required_fields() {
                    Ok(())
                } else {
                    Err(Rejection::MissingFields.into())
                }
            }
            Stage::Honeypot => {
                let (_, request) = flow.decoded()?;
                if request.is_honeypot_filled() {
                    Err(Verdict::Discarded)
                } else {
                    Ok(())
                }
            }
            Stage::FillTime => {
                let (_, request) = flow.decoded()?;
                let now_ms = chrono::Utc::now().timestamp_millis();
                check_fill_time(request.started_at_ms, now_ms, self.min_fill_ms)
            }
            Stage::RateLimit => self.check_rate_limit(&flow.client_ip).await,
            Stage::Captcha => {
                let (_, request) = flow.decoded()?;
                self.verify_captcha(&request.captcha_token, &flow.client_ip)
                    .await
            }
            Stage::Relay => {
                let (payload, _) = flow.decoded()?;
                self.relay_upstream(payload).await
            }
        }
    }

    async fn decode(&self, flow: &mut Flow) -> StageResult {
        let content_type = flow
            .ctx
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());

        let payload = FormPayload::decode(content_type, flow.ctx.body.clone())
            .await
            .map_err(|e| {
                debug!(error = %e, "Form body could not be decoded");
                Verdict::from(Rejection::InvalidForm)
            })?;
        let request = SubmissionRequest::from_payload(&payload, &self.limits);
        flow.decoded = Some((payload, request));
        Ok(())
    }

    async fn check_rate_limit(&self, ip: &str) -> StageResult {
        match self.limiter.check(ip).await {
            RateLimitResult::Allowed { remaining } => {
                debug!(ip = %ip, remaining, "Rate limit passed");
                Ok(())
            }
            RateLimitResult::Limited { retry_after } => {
                Err(Rejection::RateLimited { retry_after }.into())
            }
        }
    }

    async fn verify_captcha(&self, token: &str, ip: &str) -> StageResult {
        let Some(secret) = self.captcha_secret.as_deref() else {
            warn!("TURNSTILE_SECRET_KEY is not configured; refusing submission");
            return Err(Rejection::CaptchaNotConfigured.into());
        };
        if token.is_empty() {
            return Err(Rejection::CaptchaRequired.into());
        }

        let started = Instant::now();
        let result = self.verifier.verify(secret, token, ip).await;
        self.metrics.observe_outbound("captcha", started.elapsed());

        match result {
            Ok(verification) if verification.success => Ok(()),
            Ok(verification) => {
                info!(ip = %ip, error_codes = ?verification.error_codes, "Captcha rejected");
                Err(Rejection::CaptchaFailed.into())
            }
            Err(e) => {
                warn!(ip = %ip, error = %e, "Captcha verification unavailable");
                Err(Rejection::CaptchaFailed.into())
            }
        }
    }

    async fn relay_upstream(&self, payload: &FormPayload) -> StageResult {
        let started = Instant::now();
        let result = self.relay.relay(payload).await;
        self.metrics.observe_outbound("relay", started.elapsed());

        result.map_err(|e| {
            warn!(error = %e, "Upstream relay failed");
            Verdict::from(Rejection::Upstream(e.client_message().to_string()))
        })
    }
}

/// Reject forms submitted less than `min_fill_ms` after render. A render
/// time in the future gives a negative elapsed time and is rejected too.
fn check_fill_time(started_at_ms: Option<i64>, now_ms: i64, min_fill_ms: i64) -> StageResult {
    let Some(started_at_ms) = started_at_ms else {
        return Ok(());
    };
    let elapsed_ms = now_ms.saturating_sub(started_at_ms);
    if elapsed_ms < min_fill_ms {
        warn!(elapsed_ms, min_fill_ms, "Form filled too quickly");
        return Err(Rejection::TooFast.into());
    }
    Ok(())
}

/// Best-effort cross-site check: a present `Origin` must contain `Host`.
fn check_origin(headers: &HeaderMap) -> StageResult {
    let origin = header_str(headers, header::ORIGIN);
    let host = header_str(headers, header::HOST);

    if !origin.is_empty() && !origin.contains(host) {
        debug!(origin = %origin, host = %host, "Origin does not match host");
        return Err(Rejection::InvalidOrigin.into());
    }
    Ok(())
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> &str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}
