use axum::http::HeaderValue;
use common::{config::load_settings, observability::init_tracing, shutdown::shutdown_signal};
use gateway::{build_app, hardening::IngressRateLimiter, AppState};
use std::{net::SocketAddr, time::Instant};
use tokio::net::TcpListener;
use tracing::info;
use upstream::Upstreams;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = load_settings()?;
    init_tracing("basalt-gateway", &settings.log)?;

    let upstreams = Upstreams::from_settings(&settings.upstreams)?;
    let frontend_origin: HeaderValue = settings
        .frontend
        .origin
        .parse()
        .map_err(|e| anyhow::anyhow!("FRONTEND__ORIGIN is not a valid header value: {e}"))?;

    let state = AppState {
        started_at: Instant::now(),
        upstreams,
        frontend_origin,
        ingress_rate_limiter: IngressRateLimiter::new(
            settings.hardening.ingress_rate_limit_per_second,
            settings.hardening.ingress_burst,
        ),
        max_body_bytes: settings.hardening.max_body_bytes,
        dispatch_queue_depth: settings.realtime.dispatch_queue_depth,
    };

    let app = build_app(state);

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid server address: {e}"))?;
    let listener = TcpListener::bind(addr).await?;

    info!(
        %addr,
        core_url = %settings.upstreams.core_url,
        ai_url = %settings.upstreams.ai_url,
        "basalt gateway listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
