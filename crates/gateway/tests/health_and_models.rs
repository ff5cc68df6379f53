use axum::http::HeaderValue;
use gateway::{build_app, hardening::IngressRateLimiter, AppState};
use httpmock::prelude::*;
use reqwest::Client;
use std::time::{Duration, Instant};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};
use upstream::{UpstreamClient, Upstreams};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn health_reports_unavailable_when_upstreams_are_down() -> anyhow::Result<()> {
    let state = test_state("http://127.0.0.1:1", "http://127.0.0.1:1");
    let (server_task, shutdown_tx, base_url) = spawn_app(build_app(state)).await?;
    let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

    let response = client.get(format!("{}/health", base_url)).send().await?;
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["services"]["gateway"], "healthy");
    assert_eq!(body["data"]["services"]["rust_core"], "unavailable");
    assert_eq!(body["data"]["services"]["ai_services"], "unavailable");

    cleanup(server_task, shutdown_tx).await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn health_reports_healthy_on_upstream_200() -> anyhow::Result<()> {
    let core = MockServer::start();
    core.mock(|when, then| {
        when.method(GET).path("/health");
        then.status(200).json_body(serde_json::json!({"status": "ok"}));
    });
    let ai = MockServer::start();
    ai.mock(|when, then| {
        when.method(GET).path("/health");
        then.status(500);
    });

    let state = test_state(&core.base_url(), &ai.base_url());
    let (server_task, shutdown_tx, base_url) = spawn_app(build_app(state)).await?;
    let client = Client::builder().timeout(Duration::from_secs(5)).build()?;

    let response = client.get(format!("{}/health", base_url)).send().await?;
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["data"]["services"]["rust_core"], "healthy");
    assert_eq!(body["data"]["services"]["ai_services"], "unhealthy");

    cleanup(server_task, shutdown_tx).await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn model_catalog_merges_both_sources() -> anyhow::Result<()> {
    let core = MockServer::start();
    core.mock(|when, then| {
        when.method(GET).path("/api/v1/ai/models");
        then.status(200).json_body(serde_json::json!({
            "success": true,
            "data": [
                {"id": "custom-classifier", "name": "Custom Text Classifier", "provider": "internal"}
            ]
        }));
    });
    let ai = MockServer::start();
    ai.mock(|when, then| {
        when.method(GET).path("/ai/models");
        then.status(200).json_body(serde_json::json!({
            "success": true,
            "data": {
                "models": [
                    {"id": "gemini-pro", "name": "Gemini Pro", "provider": "Google"}
                ]
            }
        }));
    });

    let state = test_state(&core.base_url(), &ai.base_url());
    let (server_task, shutdown_tx, base_url) = spawn_app(build_app(state)).await?;
    let client = Client::builder().timeout(Duration::from_secs(5)).build()?;

    let response = client
        .get(format!("{}/api/v1/ai/models", base_url))
        .send()
        .await?;
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["total"], 2);
    let ids: Vec<_> = body["data"]["models"]
        .as_array()
        .expect("models array")
        .iter()
        .map(|m| m["id"].as_str().expect("model id"))
        .collect();
    assert!(ids.contains(&"custom-classifier"));
    assert!(ids.contains(&"gemini-pro"));
    assert_eq!(
        body["data"]["sources"],
        serde_json::json!(["rust-core", "ai-services"])
    );

    cleanup(server_task, shutdown_tx).await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn model_catalog_tolerates_a_failed_source() -> anyhow::Result<()> {
    let core = MockServer::start();
    core.mock(|when, then| {
        when.method(GET).path("/api/v1/ai/models");
        then.status(200).json_body(serde_json::json!({
            "success": true,
            "data": [{"id": "custom-classifier"}]
        }));
    });

    // AI upstream is down; its contribution degrades to an empty list.
    let state = test_state(&core.base_url(), "http://127.0.0.1:1");
    let (server_task, shutdown_tx, base_url) = spawn_app(build_app(state)).await?;
    let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

    let response = client
        .get(format!("{}/api/v1/ai/models", base_url))
        .send()
        .await?;
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["total"], 1);

    cleanup(server_task, shutdown_tx).await;
    Ok(())
}

fn test_state(core_url: &str, ai_url: &str) -> AppState {
    AppState {
        started_at: Instant::now(),
        upstreams: Upstreams {
            core: UpstreamClient::new("core", core_url, Duration::from_secs(2))
                .expect("core client should build"),
            ai: UpstreamClient::new("ai", ai_url, Duration::from_secs(2))
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
