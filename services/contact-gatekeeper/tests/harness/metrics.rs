// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Outcome tallies for bot-traffic simulation.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Possible outcomes for a simulated submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Accepted,
    /// 200 from the honeypot, nothing relayed
    Discarded,
    MissingFields,
    TooFast,
    RateLimited,
    CaptchaFailed,
    OtherRejection,
}

impl Outcome {
    /// Classify by the `code` field of an error body, or `None` for 200s.
    pub fn from_code(code: Option<&str>, relayed: bool) -> Self {
        match code {
            None if relayed => Outcome::Accepted,
            None => Outcome::Discarded,
            Some("missing_fields") => Outcome::MissingFields,
            Some("too_fast") => Outcome::TooFast,
            Some("rate_limited") => Outcome::RateLimited,
            Some("captcha_failed") | Some("captcha_required") => Outcome::CaptchaFailed,
            Some(_) => Outcome::OtherRejection,
        }
    }
}

/// Collects outcomes during a simulation run.
#[derive(Debug, Default)]
pub struct SimulationMetrics {
    start_time: Option<Instant>,
    end_time: Option<Instant>,
    outcomes: HashMap<Outcome, usize>,
    requests_per_ip: HashMap<String, usize>,
    accepted_per_ip: HashMap<String, usize>,
}

impl SimulationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self) {
        self.start_time = Some(Instant::now());
    }

    pub fn finish(&mut self) {
        self.end_time = Some(Instant::now());
    }

    pub fn record(&mut self, outcome: Outcome, ip: &str) {
        *self.outcomes.entry(outcome).or_insert(0) += 1;
        *self.requests_per_ip.entry(ip.to_string()).or_insert(0) += 1;
        if outcome == Outcome::Accepted {
            *self.accepted_per_ip.entry(ip.to_string()).or_insert(0) += 1;
        }
    }

    pub fn total_requests(&self) -> usize {
        self.outcomes.values().sum()
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }

    /// Highest number of accepted submissions from any single IP.
    pub fn max_accepted_per_ip(&self) -> usize {
        self.accepted_per_ip.values().copied().max().unwrap_or(0)
    }

    pub fn unique_ips(&self) -> usize {
        self.requests_per_ip.len()
    }

    pub fn duration(&self) -> Duration {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => end.duration_since(start),
            (Some(start), None) => start.elapsed(),
            _ => Duration::ZERO,
        }
    }

    /// Ratio of submissions that did not reach the relay.
    pub fn block_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            return 0.0;
        }
        (total - self.count(Outcome::Accepted)) as f64 / total as f64
    }
}

impl std::fmt::Display for SimulationMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Bot Simulation Report ===")?;
        writeln!(f, "Duration:          {} ms", self.duration().as_millis())?;
        writeln!(f, "Total Requests:    {}", self.total_requests())?;
        writeln!(f, "Unique IPs:        {}", self.unique_ips())?;
        writeln!(f, "Accepted:          {}", self.count(Outcome::Accepted))?;
        writeln!(f, "Discarded:         {}", self.count(Outcome::Discarded))?;
        writeln!(f, "Too Fast:          {}", self.count(Outcome::TooFast))?;
        writeln!(f, "Rate Limited:      {}", self.count(Outcome::RateLimited))?;
        writeln!(f, "Captcha Failed:    {}", self.count(Outcome::CaptchaFailed))?;
        writeln!(f, "Block Rate:        {:.1}%", self.block_rate() * 100.0)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_classification() {
        assert_eq!(Outcome::from_code(None, true), Outcome::Accepted);
        assert_eq!(Outcome::from_code(None, false), Outcome::Discarded);
        assert_eq!(Outcome::from_code(Some("rate_limited"), false), Outcome::RateLimited);
        assert_eq!(Outcome::from_code(Some("invalid_origin"), false), Outcome::OtherRejection);
    }

    #[test]
    fn test_block_rate() {
        let mut metrics = SimulationMetrics::new();
        for _ in 0..3 {
            metrics.record(Outcome::Accepted, "10.0.0.1");
        }
        for _ in 0..7 {
            metrics.record(Outcome::RateLimited, "10.0.0.1");
        }

        assert!((metrics.block_rate() - 0.7).abs() < 0.01);
        assert_eq!(metrics.max_accepted_per_ip(), 3);
    }
}
