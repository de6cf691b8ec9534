//! Prometheus metrics HTTP server.
//!
//! Exposes channel counters and directory size in Prometheus text format.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{Router, extract::State, http::StatusCode, response::IntoResponse, routing::get};
use tokio::net::TcpListener;
use tracing::info;

use crate::channel::{AisChannel, ChannelState, StateCell};
use crate::directory::VesselDirectory;
use crate::stats::ChannelStats;

/// Shared handles to one channel's counters and state.
#[derive(Debug, Clone)]
pub struct ChannelProbe {
    pub ident: String,
    pub stats: Arc<ChannelStats>,
    pub state: Arc<StateCell>,
}

impl From<&AisChannel> for ChannelProbe {
    fn from(channel: &AisChannel) -> Self {
        Self {
            ident: channel.ident().to_string(),
            stats: Arc::clone(channel.stats()),
            state: Arc::clone(channel.state_cell()),
        }
    }
}

/// Everything the metrics endpoint reports on.
#[derive(Debug)]
pub struct MetricsSource {
    pub directory: Arc<VesselDirectory>,
    pub channels: Vec<ChannelProbe>,
    start_time: Instant,
}

impl MetricsSource {
    pub fn new(directory: Arc<VesselDirectory>, channels: Vec<ChannelProbe>) -> Self {
        Self {
            directory,
            channels,
            start_time: Instant::now(),
        }
    }
}

/// Start the Prometheus metrics HTTP server.
///
/// Runs in the background and serves metrics at `/metrics`.
/// Returns an error if the server fails to bind to the port.
pub async fn start_metrics_server(
    port: u16,
    source: Arc<MetricsSource>,
) -> Result<(), std::io::Error> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(source);

    let listener = TcpListener::bind(addr).await?;
    info!("Prometheus metrics server listening on http://{}/metrics", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))
}

/// Health check endpoint.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Prometheus metrics endpoint.
async fn metrics_handler(State(source): State<Arc<MetricsSource>>) -> impl IntoResponse {
    let output = format_prometheus_metrics(&source);
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        output,
    )
}

/// Format statistics as Prometheus text format.
fn format_prometheus_metrics(source: &MetricsSource) -> String {
    let mut output = String::with_capacity(2048);

    output.push_str("# HELP ais_uptime_seconds Time since the tracker started\n");
    output.push_str("# TYPE ais_uptime_seconds gauge\n");
    output.push_str(&format!(
        "ais_uptime_seconds {:.3}\n",
        source.start_time.elapsed().as_secs_f64()
    ));

    output.push_str("# HELP ais_vessels_tracked Vessels currently in the directory\n");
    output.push_str("# TYPE ais_vessels_tracked gauge\n");
    output.push_str(&format!("ais_vessels_tracked {}\n", source.directory.len()));

    output.push_str("# HELP ais_messages_seen_total Reports dispatched per channel\n");
    output.push_str("# TYPE ais_messages_seen_total counter\n");
    for probe in &source.channels {
        output.push_str(&format!(
            "ais_messages_seen_total{{channel=\"{}\"}} {}\n",
            probe.ident,
            probe.stats.messages()
        ));
    }

    output.push_str("# HELP ais_vessels_created_total Vessels first seen per channel\n");
    output.push_str("# TYPE ais_vessels_created_total counter\n");
    for probe in &source.channels {
        output.push_str(&format!(
            "ais_vessels_created_total{{channel=\"{}\"}} {}\n",
            probe.ident,
            probe.stats.vessels()
        ));
    }

    output.push_str("# HELP ais_dispatch_failures_total Reports dropped per channel\n");
    output.push_str("# TYPE ais_dispatch_failures_total counter\n");
    for probe in &source.channels {
        let summary = probe.stats.summary();
        output.push_str(&format!(
            "ais_dispatch_failures_total{{channel=\"{}\"}} {}\n",
            probe.ident, summary.failures
        ));
    }

    output.push_str("# HELP ais_channel_running Whether the channel is receiving reports\n");
    output.push_str("# TYPE ais_channel_running gauge\n");
    for probe in &source.channels {
        let running = u8::from(probe.state.get() == ChannelState::Running);
        output.push_str(&format!(
            "ais_channel_running{{channel=\"{}\"}} {}\n",
            probe.ident, running
        ));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_probe(ident: &str) -> ChannelProbe {
        ChannelProbe {
            ident: ident.to_string(),
            stats: Arc::new(ChannelStats::new()),
            state: Arc::new(StateCell::new(ChannelState::Off)),
        }
    }

    #[test]
    fn test_format_prometheus_metrics_empty() {
        let source = MetricsSource::new(Arc::new(VesselDirectory::new(10)), Vec::new());
        let output = format_prometheus_metrics(&source);

        assert!(output.contains("ais_uptime_seconds"));
        assert!(output.contains("ais_vessels_tracked 0"));
    }

    #[test]
    fn test_format_prometheus_metrics_with_data() {
        let directory = Arc::new(VesselDirectory::new(10));
        directory.get_or_create(257_000_001, None);

        let probe = make_probe("north");
        probe.stats.record_message();
        probe.stats.record_vessel_created();
        probe.state.set(ChannelState::Running);

        let source = MetricsSource::new(directory, vec![probe, make_probe("south")]);
        let output = format_prometheus_metrics(&source);

        assert!(output.contains("ais_vessels_tracked 1"));
        assert!(output.contains("ais_messages_seen_total{channel=\"north\"} 1"));
        assert!(output.contains("ais_vessels_created_total{channel=\"north\"} 1"));
        assert!(output.contains("ais_dispatch_failures_total{channel=\"south\"} 0"));
        assert!(output.contains("ais_channel_running{channel=\"north\"} 1"));
        assert!(output.contains("ais_channel_running{channel=\"south\"} 0"));
    }

    #[test]
    fn test_prometheus_format_validity() {
        let source = MetricsSource::new(
            Arc::new(VesselDirectory::new(10)),
            vec![make_probe("north")],
        );
        let output = format_prometheus_metrics(&source);

        for line in output.lines() {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let parts: Vec<&str> = line.split_whitespace().collect();
            assert!(parts.len() >= 2, "Invalid metric line: {}", line);
        }
    }
}
