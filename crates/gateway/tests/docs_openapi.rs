use axum::http::HeaderValue;
use gateway::{build_app, hardening::IngressRateLimiter, AppState};
use reqwest::Client;
use std::time::{Duration, Instant};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};
use upstream::{UpstreamClient, Upstreams};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn swagger_endpoints_are_served() -> anyhow::Result<()> {
    let (server_task, shutdown_tx, base_url) = spawn_app(build_app(test_state())).await?;
    let client = Client::builder().timeout(Duration::from_secs(5)).build()?;

    let openapi = client
        .get(format!("{}/openapi.json", base_url))
        .send()
        .await?;
    assert_eq!(openapi.status(), reqwest::StatusCode::OK);
    let body: serde_json::Value = openapi.json().await?;
    assert_eq!(body["openapi"], "3.0.3");
    assert!(body["paths"]["/api/v1/projects"]["post"].is_object());
    assert!(body["paths"]["/api/v1/ai/models"]["get"].is_object());

    let docs = client.get(format!("{}/docs/", base_url)).send().await?;
    assert_eq!(docs.status(), reqwest::StatusCode::OK);
    let html = docs.text().await?;
    assert!(html.contains("SwaggerUIBundle"));
    assert!(html.contains("/openapi.json"));

    cleanup(server_task, shutdown_tx).await;
    Ok(())
}

fn test_state() -> AppState {
    AppState {
        started_at: Instant::now(),
        upstreams: Upstreams {
            core: UpstreamClient::new("core", "http://127.0.0.1:1", Duration::from_secs(1))
                .expect("core client should build"),
            ai: UpstreamClient::new("ai", "http://127.0.0.1:1", Duration::from_secs(1))
                .expect("ai client should build"),
            health_timeout: Duration::from_secs(1),
        },
        frontend_origin: HeaderValue::from_static("http://localhost:3000"),
        ingress_rate_limiter: IngressRateLimiter::new(50_000, 50_000),
        max_body_bytes: 1024 * 1024,
        dispatch_queue_depth: 8,
    }
}

async fn spawn_app(
    app: axum::Router,
) -> anyhow::Result<(JoinHandle<()>, oneshot::Sender<()>, String)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await;
    });

    Ok((task, shutdown_tx, format!("http://{}", addr)))
}

async fn cleanup(server_task: JoinHandle<()>, shutdown_tx: oneshot::Sender<()>) {
    let _ = shutdown_tx.send(());
    let _ = server_task.await;
}
