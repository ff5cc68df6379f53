pub mod catalog;
pub mod docs;
pub mod hardening;
pub mod models;
pub mod realtime;
pub mod relay;

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use domain::Envelope;
use serde::Serialize;
use serde_json::json;
use std::{collections::HashMap, time::Instant};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use upstream::Upstreams;

#[derive(Clone)]
pub struct AppState {
    pub started_at: Instant,
    pub upstreams: Upstreams,
    pub frontend_origin: HeaderValue,
    pub ingress_rate_limiter: hardening::IngressRateLimiter,
    pub max_body_bytes: usize,
    pub dispatch_queue_depth: usize,
}

#[derive(Debug, Serialize)]
struct HealthServices {
    gateway: &'static str,
    rust_core: &'static str,
    ai_services: &'static str,
}

#[derive(Debug, Serialize)]
struct HealthData {
    status: &'static str,
    services: HealthServices,
    uptime_seconds: u64,
    version: &'static str,
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let (core, ai) = tokio::join!(
        state.upstreams.core.probe_health(state.upstreams.health_timeout),
        state.upstreams.ai.probe_health(state.upstreams.health_timeout),
    );

    Json(Envelope::ok(HealthData {
        status: "healthy",
        services: HealthServices {
            gateway: "healthy",
            rust_core: core.as_str(),
            ai_services: ai.as_str(),
        },
        uptime_seconds: state.started_at.elapsed().as_secs(),
        version: env!("CARGO_PKG_VERSION"),
    }))
}

async fn root() -> impl IntoResponse {
    Json(Envelope::ok(json!({
        "message": "Basalt API Gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "documentation": "/docs",
        "endpoints": {
            "health": "/health",
            "projects": "/api/v1/projects",
            "ai": "/api/v1/ai",
            "realtime": "/ws"
        }
    })))
}

async fn not_found(req: Request<Body>) -> Response {
    let body = json!({
        "success": false,
        "error": "Endpoint not found",
        "timestamp": Utc::now(),
        "availableEndpoints": relay::endpoint_inventory(),
    });

    tracing::debug!(path = %req.uri().path(), "unknown route");
    (StatusCode::NOT_FOUND, Json(body)).into_response()
}

async fn metrics_handler() -> Response {
    match common::metrics::render_metrics() {
        Ok(body) => {
            let mut response = Response::new(body.into());
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
            );
            response
        }
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to render metrics: {err}"),
        )
            .into_response(),
    }
}

async fn metrics_middleware(req: Request<Body>, next: Next) -> Response {
    let started_at = Instant::now();
    let method = req.method().to_string();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(MatchedPath::as_str)
        .unwrap_or_else(|| req.uri().path())
        .to_string();

    let response = next.run(req).await;
    common::metrics::record_http_request(
        &route,
        &method,
        response.status().as_u16(),
        started_at.elapsed(),
    );

    response
}

pub(crate) fn request_trace_carrier(headers: &HeaderMap) -> HashMap<String, String> {
    let mut carrier = HashMap::new();
    for key in ["traceparent", "tracestate", "baggage"] {
        if let Some(value) = headers.get(key).and_then(|v| v.to_str().ok()) {
            carrier.insert(key.to_string(), value.to_string());
        }
    }
    carrier
}

async fn otel_parent_middleware(req: Request<Body>, next: Next) -> Response {
    let carrier = request_trace_carrier(req.headers());
    if !carrier.is_empty() {
        let span = tracing::Span::current();
        common::observability::set_parent_from_carrier(&span, &carrier);
    }

    next.run(req).await
}

pub fn build_app(state: AppState) -> Router {
    let ingress_rate_limiter = state.ingress_rate_limiter.clone();
    let max_body_bytes = state.max_body_bytes;
    let cors = CorsLayer::new()
        .allow_origin(state.frontend_origin.clone())
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    let router = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/metrics", get(metrics_handler))
        .route("/openapi.json", get(docs::openapi_json))
        .route("/docs", get(docs::docs_redirect))
        .route("/docs/", get(docs::swagger_ui))
        .route("/ws", get(realtime::ws_handler))
        .route("/api/v1/ai/models", get(models::list_models));

    let router = relay::mount_rules(router);
    let router = catalog::mount(router);

    router
        .fallback(not_found)
        .with_state(state)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(otel_parent_middleware))
        .layer(middleware::from_fn_with_state(
            ingress_rate_limiter,
            hardening::enforce_ingress_rate_limit,
        ))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
        .layer(cors)
}
