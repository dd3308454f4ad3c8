//! Logging for the songbook CLI
//!
//! One subscriber: an `EnvFilter`, compact console output, and with the
//! `telemetry` feature an OTLP span exporter layered on top.
//!
//!   songbook --debug serve
//!   songbook --otel serve
//!   RUST_LOG=songbook_server=debug,tower_http=debug songbook serve
//!
//! OTLP export reads `OTEL_EXPORTER_OTLP_ENDPOINT` (default
//! http://localhost:4317) and `OTEL_SERVICE_NAME` (default songbook).

use anyhow::{anyhow, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Flags that shape logging
#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    /// `debug` level unless RUST_LOG says otherwise
    pub debug: bool,
    /// Export spans over OTLP
    pub otel: bool,
}

impl TracingConfig {
    fn filter(&self) -> EnvFilter {
        let fallback = if self.debug { "debug" } else { "info" };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
    }
}

/// Install the global subscriber. Fails if one is already set.
pub fn init(config: &TracingConfig) -> Result<()> {
    let console = tracing_subscriber::fmt::layer()
        .with_target(config.debug)
        .compact();

    tracing_subscriber::registry()
        .with(config.filter())
        .with(console)
        .with(otlp::layer(config)?)
        .try_init()
        .map_err(|err| anyhow!(err))?;

    if config.otel {
        otlp::announce();
    }
    Ok(())
}

/// Flush spans still buffered for export.
pub fn shutdown_otel() {
    otlp::shutdown();
}

#[cfg(feature = "telemetry")]
mod otlp {
    use anyhow::{anyhow, Result};
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::trace::{Tracer, TracerProvider};
    use tracing::Subscriber;
    use tracing_opentelemetry::OpenTelemetryLayer;
    use tracing_subscriber::registry::LookupSpan;

    use super::TracingConfig;

    fn endpoint() -> String {
        std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
            .unwrap_or_else(|_| "http://localhost:4317".to_string())
    }

    fn service_name() -> String {
        std::env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "songbook".to_string())
    }

    pub fn layer<S>(config: &TracingConfig) -> Result<Option<OpenTelemetryLayer<S, Tracer>>>
    where
        S: Subscriber + for<'span> LookupSpan<'span>,
    {
        if !config.otel {
            return Ok(None);
        }

        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint())
            .build()
            .map_err(|e| anyhow!("Failed to create OTLP exporter: {}", e))?;

        let provider = TracerProvider::builder()
            .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
            .with_resource(opentelemetry_sdk::Resource::new([KeyValue::new(
                "service.name",
                service_name(),
            )]))
            .build();

        let tracer = provider.tracer("songbook");
        // Export stops when the provider is dropped
        let _ = opentelemetry::global::set_tracer_provider(provider);

        Ok(Some(tracing_opentelemetry::layer().with_tracer(tracer)))
    }

    pub fn announce() {
        tracing::info!(endpoint = %endpoint(), service = %service_name(), "exporting spans over OTLP");
    }

    pub fn shutdown() {
        opentelemetry::global::shutdown_tracer_provider();
    }
}

#[cfg(not(feature = "telemetry"))]
mod otlp {
    use anyhow::Result;
    use tracing_subscriber::layer::Identity;

    use super::TracingConfig;

    pub fn layer(_config: &TracingConfig) -> Result<Option<Identity>> {
        Ok(None)
    }

    pub fn announce() {
        tracing::warn!("--otel ignored: built without the telemetry feature");
    }

    pub fn shutdown() {}
}
