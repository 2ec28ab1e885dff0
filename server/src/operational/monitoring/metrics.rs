// bbox_sync/server/src/operational/monitoring/metrics.rs
use crate::core::types::DimensionId;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;
use anyhow::{Context, Result};

pub struct MetricsSystem {
    start_time: Instant,
}

impl MetricsSystem {
    /// Describes every metric and, when `listen_addr` is set, installs the
    /// Prometheus exporter on it.
    pub fn new(listen_addr: Option<SocketAddr>) -> Result<Self> {
        if let Some(addr) = listen_addr {
            PrometheusBuilder::new()
                .with_http_listener(addr)
                .install()
                .context("Failed to install Prometheus exporter")?;
        }

        describe_counter!("bbox_add_deltas_total", "Add deltas handed to the transport");
        describe_counter!("bbox_remove_deltas_total", "Remove deltas handed to the transport");
        describe_counter!("bbox_transport_failures_total", "Delta hand-offs the transport rejected");
        describe_counter!("bbox_malformed_units_total", "Structures or villages skipped as malformed");
        describe_gauge!("bbox_observers_subscribed", "Subscribed observers");
        describe_gauge!("bbox_dimensions_tracked", "Dimensions with a live cache");
        describe_histogram!("bbox_sync_tick_seconds", "Time spent in one synchronization tick");

        Ok(MetricsSystem {
            start_time: Instant::now(),
        })
    }

    pub fn uptime_seconds(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }
}

pub fn record_add_delta(dimension: &DimensionId) {
    counter!("bbox_add_deltas_total", "dimension" => dimension.to_string()).increment(1);
}

pub fn record_remove_delta(dimension: &DimensionId) {
    counter!("bbox_remove_deltas_total", "dimension" => dimension.to_string()).increment(1);
}

pub fn record_transport_failure(kind: &'static str) {
    counter!("bbox_transport_failures_total", "kind" => kind).increment(1);
}

pub fn record_malformed_unit(dimension: &DimensionId) {
    counter!("bbox_malformed_units_total", "dimension" => dimension.to_string()).increment(1);
}

pub fn update_observer_count(count: usize) {
    gauge!("bbox_observers_subscribed").set(count as f64);
}

pub fn update_dimension_count(count: usize) {
    gauge!("bbox_dimensions_tracked").set(count as f64);
}

pub fn record_tick_time(duration: f64) {
    histogram!("bbox_sync_tick_seconds").record(duration);
}

// Logging setup
pub fn init_logging() -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, fmt};

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bbox_sync_core=debug,warn".into()),
        )
        .with(fmt::layer())
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    Ok(())
}
