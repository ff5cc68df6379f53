use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub frontend: FrontendSettings,
    pub upstreams: UpstreamSettings,
    pub log: LogSettings,
    pub hardening: HardeningSettings,
    pub realtime: RealtimeSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FrontendSettings {
    /// Origin allowed by CORS, e.g. `http://localhost:3000`.
    pub origin: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamSettings {
    /// Base URL of the core platform backend.
    pub core_url: String,
    /// Base URL of the AI inference backend.
    pub ai_url: String,
    /// Flat per-request timeout for relayed calls.
    pub request_timeout_seconds: u64,
    /// Tighter timeout used only by `/health` probes.
    pub health_timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    pub filter: String,
    pub json: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HardeningSettings {
    pub ingress_rate_limit_per_second: u32,
    pub ingress_burst: u32,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeSettings {
    /// Per-connection bound on queued AI requests; a full queue rejects
    /// immediately with `ai_error` instead of piling up upstream calls.
    pub dispatch_queue_depth: usize,
}

pub fn load_settings() -> anyhow::Result<Settings> {
    let cfg = config::Config::builder()
        // Defaults
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 3001)?
        .set_default("frontend.origin", "http://localhost:3000")?
        .set_default("upstreams.core_url", "http://127.0.0.1:8080")?
        .set_default("upstreams.ai_url", "http://127.0.0.1:8000")?
        .set_default("upstreams.request_timeout_seconds", 10)?
        .set_default("upstreams.health_timeout_seconds", 5)?
        .set_default("log.filter", "info")?
        .set_default("log.json", false)?
        .set_default("hardening.ingress_rate_limit_per_second", 200)?
        .set_default("hardening.ingress_burst", 400)?
        .set_default("hardening.max_body_bytes", 10 * 1024 * 1024)?
        .set_default("realtime.dispatch_queue_depth", 32)?
        // Env override (nested via __)
        .add_source(config::Environment::default().separator("__"))
        .build()
        .context("failed to build configuration")?;

    let settings = cfg
        .try_deserialize::<Settings>()
        .context("failed to deserialize configuration into Settings")?;

    validate_upstreams(&settings)?;
    validate_limits(&settings)?;
    Ok(settings)
}

fn validate_upstreams(settings: &Settings) -> anyhow::Result<()> {
    for (name, url) in [
        ("UPSTREAMS__CORE_URL", &settings.upstreams.core_url),
        ("UPSTREAMS__AI_URL", &settings.upstreams.ai_url),
    ] {
        let url = url.trim();
        if url.is_empty() {
            anyhow::bail!("{name} must not be empty");
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            anyhow::bail!("{name} must be an http(s) base URL, got {url:?}");
        }
    }

    if settings.upstreams.request_timeout_seconds == 0 {
        anyhow::bail!("UPSTREAMS__REQUEST_TIMEOUT_SECONDS must be > 0");
    }
    if settings.upstreams.health_timeout_seconds == 0 {
        anyhow::bail!("UPSTREAMS__HEALTH_TIMEOUT_SECONDS must be > 0");
    }

    Ok(())
}

fn validate_limits(settings: &Settings) -> anyhow::Result<()> {
    if settings.frontend.origin.trim().is_empty() {
        anyhow::bail!("FRONTEND__ORIGIN must not be empty");
    }

    if settings.hardening.max_body_bytes == 0 {
        anyhow::bail!("HARDENING__MAX_BODY_BYTES must be > 0");
    }

    if settings.realtime.dispatch_queue_depth == 0 {
        anyhow::bail!("REALTIME__DISPATCH_QUEUE_DEPTH must be > 0");
    }

    Ok(())
}
