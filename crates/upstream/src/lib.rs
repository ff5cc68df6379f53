pub mod client;

pub use client::{UpstreamClient, UpstreamError};

use common::config::UpstreamSettings;
use std::time::Duration;

/// The two services the gateway fronts. Cheap to clone; each client shares
/// one connection pool.
#[derive(Debug, Clone)]
pub struct Upstreams {
    pub core: UpstreamClient,
    pub ai: UpstreamClient,
    pub health_timeout: Duration,
}

impl Upstreams {
    pub fn from_settings(cfg: &UpstreamSettings) -> anyhow::Result<Self> {
        let request_timeout = Duration::from_secs(cfg.request_timeout_seconds);

        Ok(Self {
            core: UpstreamClient::new("core", &cfg.core_url, request_timeout)?,
            ai: UpstreamClient::new("ai", &cfg.ai_url, request_timeout)?,
            health_timeout: Duration::from_secs(cfg.health_timeout_seconds),
        })
    }
}
