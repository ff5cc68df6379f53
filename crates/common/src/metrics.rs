use anyhow::Context;
use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, register_int_gauge,
    Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge, TextEncoder,
};
use std::time::Duration;

static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["route", "method", "status"]
    )
    .expect("register http_requests_total")
});

static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["route", "method"],
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("register http_request_duration_seconds")
});

static UPSTREAM_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "upstream_requests_total",
        "Total number of requests relayed to upstream services",
        &["upstream", "outcome"]
    )
    .expect("register upstream_requests_total")
});

static UPSTREAM_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "upstream_request_duration_seconds",
        "Upstream request duration in seconds",
        &["upstream"],
        vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .expect("register upstream_request_duration_seconds")
});

static REALTIME_EVENTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "realtime_events_total",
        "Total number of events emitted to realtime clients",
        &["event"]
    )
    .expect("register realtime_events_total")
});

static REALTIME_DISPATCH_REJECTED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "realtime_dispatch_rejected_total",
        "Total number of realtime AI requests rejected by a full dispatch queue"
    )
    .expect("register realtime_dispatch_rejected_total")
});

static REALTIME_DISPATCH_QUEUE_DEPTH: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "realtime_dispatch_queue_depth",
        "Number of realtime AI requests currently queued for dispatch"
    )
    .expect("register realtime_dispatch_queue_depth")
});

fn normalize_label<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.is_empty() {
        fallback
    } else {
        value
    }
}

fn ensure_registered() {
    Lazy::force(&HTTP_REQUESTS_TOTAL);
    Lazy::force(&HTTP_REQUEST_DURATION_SECONDS);
    Lazy::force(&UPSTREAM_REQUESTS_TOTAL);
    Lazy::force(&UPSTREAM_REQUEST_DURATION_SECONDS);
    Lazy::force(&REALTIME_EVENTS_TOTAL);
    Lazy::force(&REALTIME_DISPATCH_REJECTED_TOTAL);
    Lazy::force(&REALTIME_DISPATCH_QUEUE_DEPTH);
}

pub fn record_http_request(route: &str, method: &str, status: u16, duration: Duration) {
    ensure_registered();
    let route = normalize_label(route, "unknown");
    let method = normalize_label(method, "unknown");
    let status = status.to_string();

    HTTP_REQUESTS_TOTAL
        .with_label_values(&[route, method, status.as_str()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[route, method])
        .observe(duration.as_secs_f64());
}

/// `outcome` is `ok`, `transport_error`, or `http_<status>`.
pub fn record_upstream_request(upstream: &str, outcome: &str, duration: Duration) {
    ensure_registered();
    let upstream = normalize_label(upstream, "unknown");
    let outcome = normalize_label(outcome, "unknown");

    UPSTREAM_REQUESTS_TOTAL
        .with_label_values(&[upstream, outcome])
        .inc();
    UPSTREAM_REQUEST_DURATION_SECONDS
        .with_label_values(&[upstream])
        .observe(duration.as_secs_f64());
}

pub fn inc_realtime_event(event: &str) {
    ensure_registered();
    REALTIME_EVENTS_TOTAL
        .with_label_values(&[normalize_label(event, "unknown")])
        .inc();
}

pub fn inc_realtime_dispatch_rejected() {
    ensure_registered();
    REALTIME_DISPATCH_REJECTED_TOTAL.inc();
}

pub fn inc_realtime_queue_depth() {
    ensure_registered();
    REALTIME_DISPATCH_QUEUE_DEPTH.inc();
}

pub fn dec_realtime_queue_depth() {
    ensure_registered();
    REALTIME_DISPATCH_QUEUE_DEPTH.dec();
}

pub fn render_metrics() -> anyhow::Result<String> {
    ensure_registered();
    let metric_families = prometheus::gather();
    let mut buf = Vec::new();
    let encoder = TextEncoder::new();
    encoder
        .encode(&metric_families, &mut buf)
        .context("failed to encode prometheus metrics")?;
    String::from_utf8(buf).context("prometheus output is not valid utf-8")
}
