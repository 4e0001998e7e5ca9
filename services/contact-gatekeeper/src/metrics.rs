// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus metrics for submission outcomes and outbound calls.

use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::time::Duration;

pub struct GatekeeperMetrics {
    registry: Registry,
    submissions: IntCounterVec,
    outbound: HistogramVec,
}

impl GatekeeperMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let submissions = IntCounterVec::new(
            Opts::new(
                "contact_submissions_total",
                "Contact form submissions by outcome",
            ),
            &["outcome"],
        )?;
        let outbound = HistogramVec::new(
            HistogramOpts::new(
                "contact_outbound_duration_seconds",
                "Latency of outbound CAPTCHA and relay calls",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["call"],
        )?;

        registry.register(Box::new(submissions.clone()))?;
        registry.register(Box::new(outbound.clone()))?;

        Ok(Self {
            registry,
            submissions,
            outbound,
        })
    }

    pub fn record_outcome(&self, outcome: &str) {
        self.submissions.with_label_values(&[outcome]).inc();
    }

    pub fn observe_outbound(&self, call: &str, elapsed: Duration) {
        self.outbound
            .with_label_values(&[call])
            .observe(elapsed.as_secs_f64());
    }

    pub fn outcome_count(&self, outcome: &str) -> u64 {
        self.submissions.with_label_values(&[outcome]).get()
    }

    /// Render all metrics in the Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
