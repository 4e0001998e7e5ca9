// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact Gatekeeper
//!
//! This crate guards a website contact form endpoint. A submission is
//! relayed to the upstream form processor only after it passes, in order:
//!
//! - Origin check (best effort, same-host)
//! - Required field check on bounded name/email/message
//! - Honeypot check (tripped submissions get a fake success)
//! - Minimum fill time (1.5s default)
//! - Per-IP sliding-window rate limit (5 per 15 minutes default)
//! - Turnstile CAPTCHA verification (fails closed without a secret)

pub mod captcha;
pub mod config;
pub mod gatekeeper;
pub mod handlers;
pub mod limiter;
pub mod metrics;
pub mod relay;
pub mod submission;
pub mod verdict;

pub use captcha::{CaptchaVerification, CaptchaVerifier, TurnstileVerifier};
pub use config::Config;
pub use gatekeeper::{Gatekeeper, Stage, SubmissionContext};
pub use limiter::{RateLimit, RateLimitResult, SlidingWindowLimiter};
pub use relay::{HttpRelay, RelayError, SubmissionRelay};
pub use submission::{FormPayload, SubmissionRequest};
pub use verdict::{Rejection, Verdict};
