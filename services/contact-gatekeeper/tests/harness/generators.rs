// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Submission generators for gatekeeper tests and bot simulation.

use axum::body::Body;
use axum::http::{header, Method, Request};
use std::net::{IpAddr, Ipv4Addr};

pub const HOST: &str = "studio.example.com";
pub const BOUNDARY: &str = "----gatekeeper-boundary-7MA4YWxkTrZu0gW";

/// Generate a pool of IP addresses for testing.
pub fn generate_ips(count: usize) -> Vec<IpAddr> {
    (0..count)
        .map(|i| {
            // Use 10.x.x.x private range
            let a = ((i >> 16) & 0xFF) as u8;
            let b = ((i >> 8) & 0xFF) as u8;
            let c = (i & 0xFF) as u8;
            IpAddr::V4(Ipv4Addr::new(10, a, b, c))
        })
        .collect()
}

/// Current epoch milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// A contact form as the page would post it.
#[derive(Debug, Clone)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub message: String,
    pub honeypot: String,
    pub ts: Option<i64>,
    pub token: String,
}

impl ContactForm {
    /// A well-formed human submission rendered ten seconds ago.
    pub fn valid() -> Self {
        Self {
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            message: "We'd like a quote for a new marketing site.".to_string(),
            honeypot: String::new(),
            ts: Some(now_ms() - 10_000),
            token: "XXXX.DUMMY.TOKEN.XXXX".to_string(),
        }
    }

    pub fn with_honeypot(mut self, value: &str) -> Self {
        self.honeypot = value.to_string();
        self
    }

    pub fn rendered_ms_ago(mut self, ms: i64) -> Self {
        self.ts = Some(now_ms() - ms);
        self
    }

    pub fn without_ts(mut self) -> Self {
        self.ts = None;
        self
    }

    pub fn without_token(mut self) -> Self {
        self.token = String::new();
        self
    }

    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("name", self.name.clone()),
            ("email", self.email.clone()),
            ("message", self.message.clone()),
            ("_gotcha", self.honeypot.clone()),
            ("turnstileToken", self.token.clone()),
        ];
        if let Some(ts) = self.ts {
            pairs.push(("ts", ts.to_string()));
        }
        pairs
    }

    pub fn urlencoded(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs())
            .finish()
    }

    pub fn multipart(&self) -> String {
        let mut body = String::new();
        for (name, value) in self.pairs() {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        body
    }
}

/// Builder for requests against the contact endpoint.
pub struct SubmissionBuilder {
    builder: axum::http::request::Builder,
}

impl SubmissionBuilder {
    pub fn new() -> Self {
        Self {
            builder: Request::builder()
                .method(Method::POST)
                .uri("/api/contact")
                .header(header::HOST, HOST),
        }
    }

    pub fn origin(mut self, origin: &str) -> Self {
        self.builder = self.builder.header(header::ORIGIN, origin);
        self
    }

    pub fn forwarded_for(mut self, ip: &str) -> Self {
        self.builder = self.builder.header("x-forwarded-for", ip);
        self
    }

    pub fn real_ip(mut self, ip: &str) -> Self {
        self.builder = self.builder.header("x-real-ip", ip);
        self
    }

    pub fn multipart(self, form: &ContactForm) -> Request<Body> {
        self.builder
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(form.multipart()))
            .unwrap()
    }

    pub fn urlencoded(self, form: &ContactForm) -> Request<Body> {
        self.builder
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form.urlencoded()))
            .unwrap()
    }

    pub fn raw(self, content_type: &str, body: impl Into<Body>) -> Request<Body> {
        self.builder
            .header(header::CONTENT_TYPE, content_type)
            .body(body.into())
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_ips() {
        let ips = generate_ips(256);
        assert_eq!(ips.len(), 256);
        // All should be unique
        let unique: std::collections::HashSet<_> = ips.iter().collect();
        assert_eq!(unique.len(), 256);
    }

    #[test]
    fn test_urlencoded_form() {
        let body = ContactForm::valid().without_ts().urlencoded();
        assert!(body.starts_with("name=Ada+Lovelace&email=ada%40example.com"));
        assert!(!body.contains("ts="));
    }
}
