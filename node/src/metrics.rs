//! # Prometheus Metrics
//!
//! Exposes operational metrics for the vault host. Scraped by Prometheus at
//! the `/metrics` HTTP endpoint on the configured metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so they
//! do not collide with any default global registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

use crate::host::HostSummary;

/// Holds all Prometheus metric handles for the host.
#[derive(Clone)]
pub struct NodeMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Vault calls by method and outcome (`ok` or the numeric error code).
    pub calls_total: IntCounterVec,
    /// Current block height.
    pub block_height: IntGauge,
    /// Configured challenges.
    pub challenges: IntGauge,
    /// Vaults in the active state.
    pub open_vaults: IntGauge,
    /// Locked value held in custody.
    pub locked_in_custody: IntGauge,
    /// Transfer intents recorded.
    pub transfers_recorded: IntGauge,
    /// Histogram of call latency in seconds, lock wait included.
    pub call_latency_seconds: Histogram,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("pledge".into()), None)
            .expect("failed to create prometheus registry");

        let calls_total = IntCounterVec::new(
            Opts::new("vault_calls_total", "Vault calls by method and outcome"),
            &["method", "outcome"],
        )
        .expect("metric creation");
        registry
            .register(Box::new(calls_total.clone()))
            .expect("metric registration");

        let block_height =
            IntGauge::new("block_height", "Current vault clock height").expect("metric creation");
        registry
            .register(Box::new(block_height.clone()))
            .expect("metric registration");

        let challenges = IntGauge::new("challenges", "Number of configured challenges")
            .expect("metric creation");
        registry
            .register(Box::new(challenges.clone()))
            .expect("metric registration");

        let open_vaults = IntGauge::new("open_vaults", "Vaults still holding locked value")
            .expect("metric creation");
        registry
            .register(Box::new(open_vaults.clone()))
            .expect("metric registration");

        let locked_in_custody = IntGauge::new(
            "locked_in_custody",
            "Locked value currently held in vault custody",
        )
        .expect("metric creation");
        registry
            .register(Box::new(locked_in_custody.clone()))
            .expect("metric registration");

        let transfers_recorded = IntGauge::new(
            "transfers_recorded",
            "Transfer intents recorded by the vault",
        )
        .expect("metric creation");
        registry
            .register(Box::new(transfers_recorded.clone()))
            .expect("metric registration");

        let call_latency_seconds = Histogram::with_opts(
            HistogramOpts::new("call_latency_seconds", "Vault call latency in seconds")
                .buckets(vec![0.00001, 0.0001, 0.001, 0.01, 0.1, 1.0]),
        )
        .expect("metric creation");
        registry
            .register(Box::new(call_latency_seconds.clone()))
            .expect("metric registration");

        Self {
            registry,
            calls_total,
            block_height,
            challenges,
            open_vaults,
            locked_in_custody,
            transfers_recorded,
            call_latency_seconds,
        }
    }

    /// Counts one call. `outcome` is `"ok"` or the error code.
    pub fn observe_call(&self, method: &str, outcome: &str, seconds: f64) {
        self.calls_total.with_label_values(&[method, outcome]).inc();
        self.call_latency_seconds.observe(seconds);
    }

    /// Copies the host totals into the gauges.
    pub fn refresh(&self, summary: &HostSummary) {
        self.block_height.set(summary.block_height as i64);
        self.challenges.set(summary.challenges as i64);
        self.open_vaults.set(summary.open_vaults as i64);
        self.locked_in_custody
            .set(i64::try_from(summary.locked_in_custody).unwrap_or(i64::MAX));
        self.transfers_recorded.set(summary.transfers as i64);
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

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<NodeMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
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
