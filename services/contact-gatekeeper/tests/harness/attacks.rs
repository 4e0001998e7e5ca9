// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Automated-submission patterns for security testing.

/// Bot traffic pattern configuration.
#[derive(Debug, Clone)]
pub struct BotPattern {
    /// Total number of submissions to send
    pub total_requests: usize,
    /// Number of unique client IPs to rotate through
    pub unique_ips: usize,
    /// Fill the hidden honeypot field
    pub fills_honeypot: bool,
    /// Milliseconds between form render and submit
    pub fill_time_ms: i64,
    /// Send a challenge token
    pub sends_token: bool,
    /// Leave required fields blank
    pub blank_fields: bool,
}

impl Default for BotPattern {
    fn default() -> Self {
        Self {
            total_requests: 50,
            unique_ips: 1,
            fills_honeypot: false,
            fill_time_ms: 10_000,
            sends_token: true,
            blank_fields: false,
        }
    }
}

/// Predefined patterns.
impl BotPattern {
    /// One IP hammering the form with otherwise valid submissions.
    pub fn single_ip_flood() -> Self {
        Self {
            total_requests: 40,
            ..Default::default()
        }
    }

    /// Many IPs, a handful of submissions each.
    pub fn ip_rotation() -> Self {
        Self {
            total_requests: 120,
            unique_ips: 20,
            ..Default::default()
        }
    }

    /// Naive form-filling bot that populates every input.
    pub fn honeypot_filler() -> Self {
        Self {
            total_requests: 30,
            unique_ips: 3,
            fills_honeypot: true,
            ..Default::default()
        }
    }

    /// Scripted submit straight after page load.
    pub fn instant_submit() -> Self {
        Self {
            total_requests: 30,
            unique_ips: 30,
            fill_time_ms: 50,
            ..Default::default()
        }
    }

    /// Direct POSTs that skip the challenge widget.
    pub fn tokenless() -> Self {
        Self {
            total_requests: 20,
            unique_ips: 20,
            sends_token: false,
            ..Default::default()
        }
    }

    /// Empty-form probes.
    pub fn blank_probe() -> Self {
        Self {
            total_requests: 20,
            unique_ips: 2,
            blank_fields: true,
            fills_honeypot: true,
            fill_time_ms: 0,
            ..Default::default()
        }
    }
}
