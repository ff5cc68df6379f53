use anyhow::Context;
use bytes::Bytes;
use domain::ServiceStatus;
use reqwest::{header, Method, StatusCode, Url};
use serde_json::Value;
use std::{
    collections::HashMap,
    time::{Duration, Instant},
};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("upstream returned HTTP {0}")]
    Status(u16),

    #[error("upstream returned invalid JSON: {0}")]
    InvalidBody(#[source] serde_json::Error),
}

/// One upstream service, addressed by base URL. All relayed calls share a
/// flat client-side timeout; there are no retries and no circuit breaking.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    name: &'static str,
    base: Url,
    http: reqwest::Client,
}

impl UpstreamClient {
    pub fn new(name: &'static str, base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let base = Url::parse(base_url.trim_end_matches('/'))
            .with_context(|| format!("invalid base URL for upstream {name}: {base_url:?}"))?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build upstream HTTP client")?;

        Ok(Self { name, base, http })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base.as_str().trim_end_matches('/'), path)
    }

    /// Forward a request and hand back the upstream's body untouched.
    /// Any non-2xx status or transport failure is an error; the caller
    /// decides how to surface it.
    pub async fn relay(
        &self,
        method: Method,
        path: &str,
        body: Option<Bytes>,
        trace_headers: &HashMap<String, String>,
    ) -> Result<Bytes, UpstreamError> {
        let started = Instant::now();

        let mut request = self
            .http
            .request(method.clone(), self.endpoint(path))
            .header(header::CONTENT_TYPE, "application/json");
        for (key, value) in trace_headers {
            request = request.header(key, value);
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                common::metrics::record_upstream_request(
                    self.name,
                    "transport_error",
                    started.elapsed(),
                );
                return Err(UpstreamError::Transport(err));
            }
        };

        let status = response.status();
        if !status.is_success() {
            common::metrics::record_upstream_request(
                self.name,
                &format!("http_{}", status.as_u16()),
                started.elapsed(),
            );
            return Err(UpstreamError::Status(status.as_u16()));
        }

        let bytes = response.bytes().await.map_err(UpstreamError::Transport)?;
        common::metrics::record_upstream_request(self.name, "ok", started.elapsed());
        debug!(
            upstream = self.name,
            %method,
            path,
            bytes = bytes.len(),
            "relayed upstream call"
        );

        Ok(bytes)
    }

    pub async fn get_value(&self, path: &str) -> Result<Value, UpstreamError> {
        let bytes = self
            .relay(Method::GET, path, None, &HashMap::new())
            .await?;
        serde_json::from_slice(&bytes).map_err(UpstreamError::InvalidBody)
    }

    pub async fn post_value(&self, path: &str, payload: &Value) -> Result<Value, UpstreamError> {
        let body = serde_json::to_vec(payload).map_err(UpstreamError::InvalidBody)?;
        let bytes = self
            .relay(Method::POST, path, Some(Bytes::from(body)), &HashMap::new())
            .await?;
        serde_json::from_slice(&bytes).map_err(UpstreamError::InvalidBody)
    }

    /// Probe `GET /health` with its own tighter timeout. HTTP 200 is healthy,
    /// any other status unhealthy, a transport failure unavailable.
    pub async fn probe_health(&self, timeout: Duration) -> ServiceStatus {
        let request = self.http.get(self.endpoint("/health")).timeout(timeout);

        match request.send().await {
            Ok(response) if response.status() == StatusCode::OK => ServiceStatus::Healthy,
            Ok(response) => {
                debug!(upstream = self.name, status = %response.status(), "health probe unhealthy");
                ServiceStatus::Unhealthy
            }
            Err(err) => {
                debug!(upstream = self.name, error = %err, "health probe failed");
                ServiceStatus::Unavailable
            }
        }
    }
}
