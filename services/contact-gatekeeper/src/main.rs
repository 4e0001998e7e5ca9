// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact Gatekeeper Service
//!
//! Receives contact form posts, filters bots and abusive clients, verifies
//! the Turnstile challenge and relays accepted submissions upstream.
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables:
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `FORMSPREE_ENDPOINT`: Upstream relay URL (default: Formspree form)
//! - `TURNSTILE_SECRET_KEY`: Turnstile secret; submissions fail with 500 when unset
//! - `TURNSTILE_SITE_KEY`: Public site key served at `/api/contact/config`
//! - `RATE_LIMIT_MAX`: Submissions per IP per window (default: 5)
//! - `RATE_LIMIT_WINDOW_SECS`: Window length (default: 900)
//! - `MIN_FILL_MS`: Minimum form fill time (default: 1500)
//! - `RELAY_TIMEOUT_MS` / `CAPTCHA_TIMEOUT_MS`: Outbound call timeouts

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use contact_gatekeeper::{
    config::Config,
    handlers::{router, AppState},
    metrics::GatekeeperMetrics,
    Gatekeeper, HttpRelay, RateLimit, SlidingWindowLimiter, TurnstileVerifier,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    let config = Config::from_env();
    config.validate()?;
    info!(
        bind_addr = %config.bind_addr,
        relay_endpoint = %config.relay.endpoint,
        max_requests = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window_secs,
        min_fill_ms = config.submission.min_fill_ms,
        captcha_configured = config.captcha.secret.is_some(),
        "Starting contact gatekeeper"
    );
    if config.captcha.secret.is_none() {
        warn!("TURNSTILE_SECRET_KEY not set; every submission will be refused");
    }

    // Create application state
    let limiter = Arc::new(SlidingWindowLimiter::new(&config.rate_limit));
    let verifier = Arc::new(TurnstileVerifier::from_config(&config.captcha)?);
    let relay = Arc::new(HttpRelay::from_config(&config.relay)?);
    let metrics = Arc::new(GatekeeperMetrics::new()?);

    let gatekeeper = Gatekeeper::new(&config, limiter.clone(), verifier, relay, metrics);
    let state = Arc::new(AppState {
        gatekeeper,
        config: config.clone(),
    });

    // Spawn cleanup task
    let cleanup_interval = config.rate_limit.cleanup_interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cleanup_interval);
        loop {
            interval.tick().await;
            limiter.cleanup().await;
        }
    });

    let app = router(state);

    // Start server
    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
