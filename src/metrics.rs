use opentelemetry::KeyValue;
use opentelemetry_otlp::{Protocol, WithExportConfig};
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::Resource;
use serde::Deserialize;
use std::time::{Duration, Instant};

const METER: &str = "exitintel";

#[derive(Debug, Deserialize, Clone)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_transport")]
    pub transport: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            transport: default_transport(),
            endpoint: default_endpoint(),
        }
    }
}

fn default_transport() -> String {
    "http".into()
}

fn default_endpoint() -> String {
    "http://localhost:4318/v1/metrics".into()
}

/// Build and register a global meter provider.
/// For gRPC transport, requires an active tokio runtime context.
/// Without a registered provider the recorders below are no-ops.
pub fn init_meter_provider(config: &MetricsConfig) -> Option<SdkMeterProvider> {
    if !config.enabled {
        return None;
    }

    if config.transport == "grpc" && tokio::runtime::Handle::try_current().is_err() {
        log::warn!("metrics: grpc transport needs an async runtime; use transport = \"http\" here");
        return None;
    }

    let resource = Resource::builder_empty()
        .with_attributes([KeyValue::new("service.name", METER)])
        .build();

    let exporter = match config.transport.as_str() {
        "grpc" => opentelemetry_otlp::MetricExporter::builder()
            .with_tonic()
            .with_endpoint(&config.endpoint)
            .with_protocol(Protocol::Grpc)
            .with_timeout(Duration::from_secs(5))
            .build(),
        _ => opentelemetry_otlp::MetricExporter::builder()
            .with_http()
            .with_protocol(Protocol::HttpBinary)
            .with_endpoint(&config.endpoint)
            .with_timeout(Duration::from_secs(5))
            .build(),
    };
    let exporter = exporter
        .map_err(|e| log::warn!("metrics {} exporter: {e}", config.transport))
        .ok()?;

    let provider = SdkMeterProvider::builder()
        .with_periodic_exporter(exporter)
        .with_resource(resource)
        .build();

    opentelemetry::global::set_meter_provider(provider.clone());
    Some(provider)
}

/// Flush pending metrics before exit.
pub fn shutdown(provider: Option<SdkMeterProvider>) {
    if let Some(p) = provider
        && let Err(e) = p.shutdown()
    {
        log::warn!("metrics shutdown: {e}");
    }
}

/// Count one interview by analysis outcome: `analyzed`, `empty`, or `failed`.
pub fn record_interview_outcome(outcome: &'static str) {
    opentelemetry::global::meter(METER)
        .u64_counter("exitintel_interviews_total")
        .build()
        .add(1, &[KeyValue::new("outcome", outcome)]);
}

pub fn record_completion(kind: &'static str, ok: bool, start: Instant) {
    let meter = opentelemetry::global::meter(METER);
    let status = if ok { "ok" } else { "error" };
    meter
        .u64_counter("exitintel_completions_total")
        .build()
        .add(1, &[KeyValue::new("kind", kind), KeyValue::new("status", status)]);
    meter
        .f64_histogram("exitintel_completion_duration_seconds")
        .build()
        .record(start.elapsed().as_secs_f64(), &[KeyValue::new("kind", kind)]);
}
