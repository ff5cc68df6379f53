use tracing::info;

/// Resolves when the process receives SIGTERM or SIGINT (Ctrl+C elsewhere).
/// Passed to `axum::serve(..).with_graceful_shutdown`.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("received SIGTERM, starting graceful shutdown");
            }
            _ = sigint.recv() => {
                info!("received SIGINT, starting graceful shutdown");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
        info!("received Ctrl+C, starting graceful shutdown");
    }
}
