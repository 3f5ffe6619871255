//! # Prometheus Metrics
//!
//! Exposes operational metrics for the dashboard. Scraped by Prometheus
//! at the `/metrics` HTTP endpoint on the configured metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so they
//! do not collide with any default global registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

/// Holds all Prometheus metric handles for the dashboard.
///
/// Clone-friendly (wraps `Arc` internally via prometheus handles) so it can
/// be shared across request handlers.
#[derive(Clone)]
pub struct DashboardMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Total number of successful wallet connects.
    pub wallet_connects_total: IntCounter,
    /// Whether a wallet is currently connected (0 or 1).
    pub wallet_connected: IntGauge,
    /// Total number of balance fetch attempts.
    pub balance_fetches_total: IntCounter,
    /// Total number of failed balance fetches.
    pub balance_fetch_failures_total: IntCounter,
    /// Total number of confirmed deposits.
    pub deposits_total: IntCounter,
    /// Total number of confirmed withdrawals.
    pub withdrawals_total: IntCounter,
    /// Total number of failed submissions, rejected or timed out.
    pub submission_failures_total: IntCounter,
    /// Histogram of submit-to-confirmation latency in seconds.
    pub submission_latency_seconds: Histogram,
}

impl DashboardMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("vaultboard".into()), None)
            .expect("failed to create prometheus registry");

        let wallet_connects_total = IntCounter::new(
            "wallet_connects_total",
            "Total number of successful wallet connects",
        )
        .expect("metric creation");
        registry
            .register(Box::new(wallet_connects_total.clone()))
            .expect("metric registration");

        let wallet_connected = IntGauge::new(
            "wallet_connected",
            "Whether a wallet is currently connected (0 or 1)",
        )
        .expect("metric creation");
        registry
            .register(Box::new(wallet_connected.clone()))
            .expect("metric registration");

        let balance_fetches_total = IntCounter::new(
            "balance_fetches_total",
            "Total number of balance fetch attempts",
        )
        .expect("metric creation");
        registry
            .register(Box::new(balance_fetches_total.clone()))
            .expect("metric registration");

        let balance_fetch_failures_total = IntCounter::new(
            "balance_fetch_failures_total",
            "Total number of failed balance fetches",
        )
        .expect("metric creation");
        registry
            .register(Box::new(balance_fetch_failures_total.clone()))
            .expect("metric registration");

        let deposits_total =
            IntCounter::new("deposits_total", "Total number of confirmed deposits")
                .expect("metric creation");
        registry
            .register(Box::new(deposits_total.clone()))
            .expect("metric registration");

        let withdrawals_total = IntCounter::new(
            "withdrawals_total",
            "Total number of confirmed withdrawals",
        )
        .expect("metric creation");
        registry
            .register(Box::new(withdrawals_total.clone()))
            .expect("metric registration");

        let submission_failures_total = IntCounter::new(
            "submission_failures_total",
            "Total number of failed submissions, rejected or timed out",
        )
        .expect("metric creation");
        registry
            .register(Box::new(submission_failures_total.clone()))
            .expect("metric registration");

        let submission_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "submission_latency_seconds",
                "Submit-to-confirmation latency in seconds",
            )
            .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )
        .expect("metric creation");
        registry
            .register(Box::new(submission_latency_seconds.clone()))
            .expect("metric registration");

        Self {
            registry,
            wallet_connects_total,
            wallet_connected,
            balance_fetches_total,
            balance_fetch_failures_total,
            deposits_total,
            withdrawals_total,
            submission_failures_total,
            submission_latency_seconds,
        }
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer).expect("prometheus output is valid utf-8"))
    }
}

/// Shared metrics state passed to axum handlers via extension.
pub type SharedMetrics = Arc<DashboardMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
///
/// Returns HTTP 500 if encoding fails (should never happen in practice).
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
