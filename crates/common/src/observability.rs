use crate::config::LogSettings;
use anyhow::Context;
use opentelemetry::{
    global,
    propagation::{Extractor, Injector},
    trace::TraceContextExt,
    KeyValue,
};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{propagation::TraceContextPropagator, trace as sdktrace, Resource};
use std::collections::HashMap;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn init_tracing(service_name: &str, log: &LogSettings) -> anyhow::Result<()> {
    // Prefer RUST_LOG if set; otherwise use config fallback.
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&log.filter))
        .context("failed to create EnvFilter")?;

    global::set_text_map_propagator(TraceContextPropagator::new());

    if parse_env_bool("OTEL__ENABLED", false) {
        let tracer = build_otlp_tracer(service_name)?;

        if log.json {
            let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_current_span(true)
                        .with_span_list(true),
                )
                .with(otel_layer)
                .init();
        } else {
            let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_target(true))
                .with(otel_layer)
                .init();
        }
    } else if log.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }

    Ok(())
}

fn parse_env_bool(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .map(|v| {
            let v = v.trim().to_ascii_lowercase();
            matches!(v.as_str(), "1" | "true" | "yes" | "on")
        })
        .unwrap_or(default)
}

fn build_otlp_tracer(service_name: &str) -> anyhow::Result<sdktrace::Tracer> {
    let otlp_endpoint = std::env::var("OTEL__EXPORTER_OTLP_ENDPOINT")
        .unwrap_or_else(|_| "http://127.0.0.1:4317".to_string());
    let otlp_timeout_ms: u64 = std::env::var("OTEL__EXPORTER_OTLP_TIMEOUT_MS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);

    let exporter = opentelemetry_otlp::new_exporter()
        .tonic()
        .with_endpoint(otlp_endpoint)
        .with_timeout(std::time::Duration::from_millis(otlp_timeout_ms));

    let resource = Resource::new(vec![KeyValue::new(
        "service.name",
        service_name.to_string(),
    )]);
    let trace_config = sdktrace::Config::default()
        .with_sampler(sdktrace::Sampler::AlwaysOn)
        .with_resource(resource);

    let provider = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(exporter)
        .with_trace_config(trace_config)
        .install_batch(opentelemetry_sdk::runtime::Tokio)
        .context("failed to initialize OTLP tracing pipeline")?;

    Ok(provider)
}

/// Copy the current span's trace context into `carrier`. The relay uses this
/// to forward `traceparent`/`tracestate` to upstream requests so a relayed
/// call shows up as one distributed trace.
pub fn inject_current_context(carrier: &mut HashMap<String, String>) {
    let cx = Span::current().context();
    global::get_text_map_propagator(|propagator| {
        propagator.inject_context(&cx, &mut HashMapInjector { values: carrier });
    });
}

/// Adopt the trace context found in `carrier` (inbound request headers) as
/// the parent of `span`, if the carrier holds a valid one.
pub fn set_parent_from_carrier(span: &Span, carrier: &HashMap<String, String>) {
    let parent = global::get_text_map_propagator(|propagator| {
        propagator.extract(&HashMapExtractor { values: carrier })
    });
    if parent.span().span_context().is_valid() {
        span.set_parent(parent);
    }
}

struct HashMapExtractor<'a> {
    values: &'a HashMap<String, String>,
}

impl Extractor for HashMapExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .or_else(|| self.values.get(&key.to_ascii_lowercase()))
            .map(String::as_str)
    }

    fn keys(&self) -> Vec<&str> {
        self.values.keys().map(String::as_str).collect()
    }
}

struct HashMapInjector<'a> {
    values: &'a mut HashMap<String, String>,
}

impl Injector for HashMapInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        self.values.insert(key.to_string(), value);
    }
}
