// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact form payload decoding.
//!
//! The raw body is kept next to the decoded fields so an accepted
//! submission can be relayed upstream byte-for-byte.

use crate::config::SubmissionConfig;
use axum::{
    body::{Body, Bytes},
    extract::{FromRequest, Multipart},
    http::{header, HeaderMap, Request},
};
use thiserror::Error;
use tracing::debug;

/// Form field names posted by the contact page.
pub mod fields {
    pub const NAME: &str = "name";
    pub const EMAIL: &str = "email";
    pub const MESSAGE: &str = "message";
    pub const HONEYPOT: &str = "_gotcha";
    pub const STARTED_AT: &str = "ts";
    pub const CAPTCHA_TOKEN: &str = "turnstileToken";
}

/// Client IP used when no proxy header identifies the caller.
pub const UNKNOWN_CLIENT: &str = "unknown";

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
const MULTIPART_FORM_DATA: &str = "multipart/form-data";

/// Errors decoding the submitted form.
#[derive(Debug, Error)]
pub enum FormError {
    #[error("Unsupported Content-Type: {0:?}")]
    UnsupportedContentType(Option<String>),

    #[error("Malformed multipart body: {0}")]
    Multipart(String),
}

/// A decoded form body plus the bytes it came from.
#[derive(Debug, Clone)]
pub struct FormPayload {
    content_type: String,
    body: Bytes,
    fields: Vec<(String, String)>,
}

impl FormPayload {
    /// Decode a urlencoded or multipart form body.
    pub async fn decode(content_type: Option<&str>, body: Bytes) -> Result<Self, FormError> {
        let content_type = content_type.map(str::trim).unwrap_or_default();
        let media_type = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        let fields = match media_type.as_str() {
            FORM_URLENCODED => url::form_urlencoded::parse(&body).into_owned().collect(),
            MULTIPART_FORM_DATA => decode_multipart(content_type, body.clone()).await?,
            _ => {
                debug!(content_type = %content_type, "Unsupported form content type");
                return Err(FormError::UnsupportedContentType(
                    Some(content_type.to_string()).filter(|ct| !ct.is_empty()),
                ));
            }
        };

        Ok(Self {
            content_type: content_type.to_string(),
            body,
            fields,
        })
    }

    /// Build a urlencoded payload from field pairs.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let fields: Vec<(String, String)> = pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields.iter())
            .finish();

        Self {
            content_type: FORM_URLENCODED.to_string(),
            body: Bytes::from(body),
            fields,
        }
    }

    /// First value submitted for `name`, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }
}

async fn decode_multipart(content_type: &str, body: Bytes) -> Result<Vec<(String, String)>, FormError> {
    let request = Request::builder()
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .map_err(|e| FormError::Multipart(e.to_string()))?;

    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| FormError::Multipart(e.body_text()))?;

    let mut fields = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| FormError::Multipart(e.body_text()))?
    {
        // File parts are forwarded in the raw body but carry no form fields we read.
        if field.file_name().is_some() {
            continue;
        }
        let Some(name) = field.name().map(ToString::to_string) else {
            continue;
        };
        let value = field
            .text()
            .await
            .map_err(|e| FormError::Multipart(e.body_text()))?;
        fields.push((name, value));
    }

    Ok(fields)
}

/// Character limits applied to free-text fields.
#[derive(Debug, Clone, Copy)]
pub struct FieldLimits {
    pub name: usize,
    pub email: usize,
    pub message: usize,
}

impl From<&SubmissionConfig> for FieldLimits {
    fn from(config: &SubmissionConfig) -> Self {
        Self {
            name: config.name_max_chars,
            email: config.email_max_chars,
            message: config.message_max_chars,
        }
    }
}

impl Default for FieldLimits {
    fn default() -> Self {
        Self::from(&SubmissionConfig::default())
    }
}

/// The fields the gatekeeper reasons about, bounded and parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRequest {
    pub name: String,
    pub email: String,
    pub message: String,
    pub honeypot: String,
    /// Epoch milliseconds at which the form was rendered
    pub started_at_ms: Option<i64>,
    pub captcha_token: String,
}

impl SubmissionRequest {
    pub fn from_payload(payload: &FormPayload, limits: &FieldLimits) -> Self {
        let field = |name: &str| payload.get(name).unwrap_or_default();

        Self {
            name: truncate_chars(field(fields::NAME), limits.name),
            email: truncate_chars(field(fields::EMAIL), limits.email),
            message: truncate_chars(field(fields::MESSAGE), limits.message),
            honeypot: field(fields::HONEYPOT).to_string(),
            started_at_ms: parse_timestamp(field(fields::STARTED_AT)),
            captcha_token: field(fields::CAPTCHA_TOKEN).to_string(),
        }
    }

    pub fn has_required_fields(&self) -> bool {
        !self.name.is_empty() && !self.email.is_empty() && !self.message.is_empty()
    }

    pub fn is_honeypot_filled(&self) -> bool {
        !self.honeypot.is_empty()
    }
}

fn truncate_chars(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((idx, _)) => value[..idx].to_string(),
        None => value.to_string(),
    }
}

/// Zero, empty, NaN, `-inf` and non-numeric timestamps all mean "not
/// provided". `+inf` saturates to `i64::MAX`, a render time in the future.
fn parse_timestamp(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let ts = raw.parse::<f64>().ok()?;
    if ts.is_nan() || ts == f64::NEG_INFINITY || ts == 0.0 {
        return None;
    }
    // Float-to-int casts saturate.
    Some(ts as i64)
}

/// Derive the client IP from proxy headers.
///
/// Prefers the first `X-Forwarded-For` hop, then `X-Real-IP`, then
/// [`UNKNOWN_CLIENT`]. The value is used verbatim as a rate-limit key.
pub fn client_ip(headers: &HeaderMap) -> String {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(forwarded) = header_value("x-forwarded-for") {
        if let Some(first) = forwarded.split(',').next().map(str::trim) {
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    header_value("x-real-ip")
        .map(ToString::to_string)
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}
