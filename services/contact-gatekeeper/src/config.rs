// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the contact form gatekeeper.
//!
//! Defaults reproduce the behaviour of the site's original contact handler:
//! 5 submissions per IP per 15 minutes, 1.5s minimum fill time, and the
//! Formspree relay endpoint.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Default Cloudflare Turnstile verification endpoint.
pub const TURNSTILE_VERIFY_URL: &str = "https://challenges.cloudflare.com/turnstile/v0/siteverify";

/// Default upstream form processor.
pub const FORMSPREE_ENDPOINT: &str = "https://formspree.io/f/xvgqlaor";

/// Configuration errors detected at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid URL for {field}: {value}")]
    InvalidUrl { field: &'static str, value: String },

    #[error("Invalid bind address: {0}")]
    InvalidBindAddr(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Configuration for the contact gatekeeper service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Upstream relay configuration
    #[serde(default)]
    pub relay: RelayConfig,

    /// CAPTCHA configuration
    #[serde(default)]
    pub captcha: CaptchaConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Submission field handling
    #[serde(default)]
    pub submission: SubmissionConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Where accepted submissions are forwarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Upstream form processor URL (default: Formspree)
    #[serde(default = "default_relay_endpoint")]
    pub endpoint: String,

    /// Request timeout in milliseconds (default: 10000)
    #[serde(default = "default_relay_timeout_ms")]
    pub timeout_ms: u64,
}

/// CAPTCHA (Turnstile) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptchaConfig {
    /// Server-side secret. Verification fails closed when unset.
    #[serde(default, skip_serializing)]
    pub secret: Option<String>,

    /// Public site key handed to the form page
    #[serde(default)]
    pub site_key: Option<String>,

    /// Verification endpoint (default: Cloudflare siteverify)
    #[serde(default = "default_verify_url")]
    pub verify_url: String,

    /// Request timeout in milliseconds (default: 5000)
    #[serde(default = "default_captcha_timeout_ms")]
    pub timeout_ms: u64,
}

/// Sliding-window rate limiting per client IP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum accepted submissions per IP within the window (default: 5)
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Window length in seconds (default: 900)
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Interval between stale-key sweeps in seconds (default: 60)
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

/// Bounds applied to inbound form fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionConfig {
    /// Maximum characters kept from `name` (default: 200)
    #[serde(default = "default_name_max")]
    pub name_max_chars: usize,

    /// Maximum characters kept from `email` (default: 200)
    #[serde(default = "default_email_max")]
    pub email_max_chars: usize,

    /// Maximum characters kept from `message` (default: 5000)
    #[serde(default = "default_message_max")]
    pub message_max_chars: usize,

    /// Minimum time between form render and submit in milliseconds (default: 1500)
    #[serde(default = "default_min_fill_ms")]
    pub min_fill_ms: i64,

    /// Maximum request body size in bytes (default: 1 MiB)
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_relay_endpoint() -> String {
    FORMSPREE_ENDPOINT.to_string()
}

fn default_relay_timeout_ms() -> u64 {
    10_000
}

fn default_verify_url() -> String {
    TURNSTILE_VERIFY_URL.to_string()
}

fn default_captcha_timeout_ms() -> u64 {
    5_000
}

fn default_max_requests() -> u32 {
    5
}

fn default_window_secs() -> u64 {
    15 * 60
}

fn default_cleanup_interval_secs() -> u64 {
    60
}

fn default_name_max() -> usize {
    200
}

fn default_email_max() -> usize {
    200
}

fn default_message_max() -> usize {
    5000
}

fn default_min_fill_ms() -> i64 {
    1500
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            relay: RelayConfig::default(),
            captcha: CaptchaConfig::default(),
            rate_limit: RateLimitConfig::default(),
            submission: SubmissionConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            endpoint: default_relay_endpoint(),
            timeout_ms: default_relay_timeout_ms(),
        }
    }
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            secret: None,
            site_key: None,
            verify_url: default_verify_url(),
            timeout_ms: default_captcha_timeout_ms(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            name_max_chars: default_name_max(),
            email_max_chars: default_email_max(),
            message_max_chars: default_message_max(),
            min_fill_ms: default_min_fill_ms(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl RelayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl CaptchaConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl RateLimitConfig {
    /// Get the rate window duration
    pub fn window_duration(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs.max(1))
    }
}

impl Config {
    /// Build configuration from environment variables, falling back to defaults.
    ///
    /// Empty values are treated as unset, so `TURNSTILE_SECRET_KEY=` still
    /// leaves verification failing closed.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup: &dyn Fn(&str) -> Option<String> = &lookup;
        let defaults = Self::default();
        Self {
            bind_addr: non_empty(lookup, "BIND_ADDR").unwrap_or(defaults.bind_addr),
            relay: RelayConfig {
                endpoint: non_empty(lookup, "FORMSPREE_ENDPOINT").unwrap_or(defaults.relay.endpoint),
                timeout_ms: parsed(lookup, "RELAY_TIMEOUT_MS").unwrap_or(defaults.relay.timeout_ms),
            },
            captcha: CaptchaConfig {
                secret: non_empty(lookup, "TURNSTILE_SECRET_KEY"),
                site_key: non_empty(lookup, "TURNSTILE_SITE_KEY"),
                verify_url: non_empty(lookup, "TURNSTILE_VERIFY_URL")
                    .unwrap_or(defaults.captcha.verify_url),
                timeout_ms: parsed(lookup, "CAPTCHA_TIMEOUT_MS")
                    .unwrap_or(defaults.captcha.timeout_ms),
            },
            rate_limit: RateLimitConfig {
                max_requests: parsed(lookup, "RATE_LIMIT_MAX")
                    .unwrap_or(defaults.rate_limit.max_requests),
                window_secs: parsed(lookup, "RATE_LIMIT_WINDOW_SECS")
                    .unwrap_or(defaults.rate_limit.window_secs),
                ..defaults.rate_limit
            },
            submission: SubmissionConfig {
                min_fill_ms: parsed(lookup, "MIN_FILL_MS")
                    .unwrap_or(defaults.submission.min_fill_ms),
                ..defaults.submission
            },
            metrics: MetricsConfig {
                enabled: parsed(lookup, "METRICS_ENABLED").unwrap_or(defaults.metrics.enabled),
                ..defaults.metrics
            },
        }
    }

    /// Reject configurations the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::InvalidBindAddr(self.bind_addr.clone()));
        }
        check_http_url("relay.endpoint", &self.relay.endpoint)?;
        check_http_url("captcha.verify_url", &self.captcha.verify_url)?;

        if self.rate_limit.max_requests == 0 {
            return Err(ConfigError::Zero("rate_limit.max_requests"));
        }
        if self.rate_limit.window_secs == 0 {
            return Err(ConfigError::Zero("rate_limit.window_secs"));
        }
        if self.submission.max_body_bytes == 0 {
            return Err(ConfigError::Zero("submission.max_body_bytes"));
        }
        Ok(())
    }
}

fn non_empty(lookup: &dyn Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|v| !v.trim().is_empty())
}

fn parsed<T: FromStr>(lookup: &dyn Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    non_empty(lookup, key).and_then(|v| v.trim().parse().ok())
}

fn check_http_url(field: &'static str, value: &str) -> Result<(), ConfigError> {
    match Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => Ok(()),
        _ => Err(ConfigError::InvalidUrl {
            field,
            value: value.to_string(),
        }),
    }
}
