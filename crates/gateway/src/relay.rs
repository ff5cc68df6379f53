use crate::AppState;
use axum::{
    body::Bytes,
    extract::{RawPathParams, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{on, MethodFilter},
    Json, Router,
};
use domain::Envelope;
use tracing::warn;
use upstream::{UpstreamClient, Upstreams};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayMethod {
    Get,
    Post,
}

impl RelayMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            RelayMethod::Get => "GET",
            RelayMethod::Post => "POST",
        }
    }

    fn filter(self) -> MethodFilter {
        match self {
            RelayMethod::Get => MethodFilter::GET,
            RelayMethod::Post => MethodFilter::POST,
        }
    }

    fn http(self) -> Method {
        match self {
            RelayMethod::Get => Method::GET,
            RelayMethod::Post => Method::POST,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamKind {
    Core,
    Ai,
}

/// One relayed endpoint. The whole proxy surface is this table; the handler
/// below serves every rule.
#[derive(Debug)]
pub struct RelayRule {
    pub method: RelayMethod,
    pub path: &'static str,
    pub upstream: UpstreamKind,
    pub upstream_path: &'static str,
    /// Static message returned in the 500 envelope when the upstream call
    /// fails; part of the public contract.
    pub failure_message: &'static str,
}

pub static RULES: &[RelayRule] = &[
    RelayRule {
        method: RelayMethod::Get,
        path: "/api/v1/projects",
        upstream: UpstreamKind::Core,
        upstream_path: "/api/v1/projects",
        failure_message: "Failed to fetch projects",
    },
    RelayRule {
        method: RelayMethod::Post,
        path: "/api/v1/projects",
        upstream: UpstreamKind::Core,
        upstream_path: "/api/v1/projects",
        failure_message: "Failed to create project",
    },
    RelayRule {
        method: RelayMethod::Get,
        path: "/api/v1/projects/:id",
        upstream: UpstreamKind::Core,
        upstream_path: "/api/v1/projects/:id",
        failure_message: "Failed to fetch project",
    },
    RelayRule {
        method: RelayMethod::Post,
        path: "/api/v1/ai/generate",
        upstream: UpstreamKind::Ai,
        upstream_path: "/ai/text/generate",
        failure_message: "Text generation failed",
    },
    RelayRule {
        method: RelayMethod::Post,
        path: "/api/v1/ai/sentiment",
        upstream: UpstreamKind::Ai,
        upstream_path: "/ai/sentiment",
        failure_message: "Sentiment analysis failed",
    },
    RelayRule {
        method: RelayMethod::Post,
        path: "/api/v1/ai/summarize",
        upstream: UpstreamKind::Ai,
        upstream_path: "/ai/summarize",
        failure_message: "Text summarization failed",
    },
    RelayRule {
        method: RelayMethod::Post,
        path: "/api/v1/ai/translate",
        upstream: UpstreamKind::Ai,
        upstream_path: "/ai/translate",
        failure_message: "Translation failed",
    },
];

impl RelayRule {
    fn client<'a>(&self, upstreams: &'a Upstreams) -> &'a UpstreamClient {
        match self.upstream {
            UpstreamKind::Core => &upstreams.core,
            UpstreamKind::Ai => &upstreams.ai,
        }
    }

    /// Substitute captured `:name` segments into the upstream path.
    fn resolved_path(&self, params: &RawPathParams) -> String {
        let mut path = self.upstream_path.to_string();
        for (name, value) in params {
            path = path.replace(&format!(":{name}"), value);
        }
        path
    }
}

pub fn mount_rules(mut router: Router<AppState>) -> Router<AppState> {
    for rule in RULES {
        router = router.route(
            rule.path,
            on(
                rule.method.filter(),
                move |state: State<AppState>,
                      params: RawPathParams,
                      headers: HeaderMap,
                      body: Bytes| relay_handler(rule, state, params, headers, body),
            ),
        );
    }
    router
}

/// The endpoint list advertised by the 404 response, derived from the rule
/// table so it cannot drift from the actual surface.
pub fn endpoint_inventory() -> Vec<String> {
    let mut endpoints = vec!["GET /".to_string(), "GET /health".to_string()];
    endpoints.extend(
        RULES
            .iter()
            .map(|rule| format!("{} {}", rule.method.as_str(), rule.path)),
    );
    endpoints.push("GET /api/v1/ai/models".to_string());
    endpoints.extend(
        crate::catalog::ROUTES
            .iter()
            .map(|(path, _)| format!("GET {path}")),
    );
    endpoints.push("WS /ws".to_string());
    endpoints
}

async fn relay_handler(
    rule: &'static RelayRule,
    State(state): State<AppState>,
    params: RawPathParams,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut trace_context = crate::request_trace_carrier(&headers);
    common::observability::inject_current_context(&mut trace_context);

    let client = rule.client(&state.upstreams);
    let path = rule.resolved_path(&params);
    let body = if body.is_empty() { None } else { Some(body) };

    match client
        .relay(rule.method.http(), &path, body, &trace_context)
        .await
    {
        // Success: the upstream's JSON goes back byte-for-byte.
        Ok(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            bytes,
        )
            .into_response(),
        Err(err) => {
            warn!(
                upstream = client.name(),
                path = %path,
                error = %err,
                "{}", rule.failure_message
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(Envelope::err(rule.failure_message)),
            )
                .into_response()
        }
    }
}
