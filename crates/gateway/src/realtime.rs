use crate::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use chrono::Utc;
use domain::{ClientCommand, RealtimeTask, ServerEvent};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::str::FromStr;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use upstream::UpstreamClient;
use uuid::Uuid;

/// Buffer between producers (reader loop, dispatcher) and the socket writer.
const EVENT_BUFFER: usize = 64;

pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let client_id = Uuid::new_v4().to_string();
    info!(client_id = %client_id, "realtime client connected");

    let (mut sink, mut stream) = socket.split();
    let (events_tx, mut events_rx) = mpsc::channel::<ServerEvent>(EVENT_BUFFER);

    // One task owns the sink; everything else emits through the channel.
    let writer = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            common::metrics::inc_realtime_event(event.kind());
            let frame = match serde_json::to_string(&event) {
                Ok(frame) => frame,
                Err(err) => {
                    warn!(error = %err, "failed to serialize realtime event");
                    continue;
                }
            };
            if sink.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    let dispatcher = Dispatcher::spawn(
        state.upstreams.ai.clone(),
        events_tx.clone(),
        state.dispatch_queue_depth,
    );

    let _ = events_tx
        .send(ServerEvent::Connected {
            client_id: client_id.clone(),
            message: "Connected to Basalt realtime service".to_string(),
            timestamp: Utc::now(),
        })
        .await;

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => handle_frame(&text, &dispatcher, &events_tx).await,
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }

    // Disconnect: cancel whatever is queued or in flight, then let the
    // writer drain and close.
    dispatcher.shutdown();
    drop(dispatcher);
    drop(events_tx);
    let _ = writer.await;
    info!(client_id = %client_id, "realtime client disconnected");
}

/// Handle one inbound text frame. Split out of the socket loop so the
/// command surface is testable without a live connection.
pub async fn handle_frame(
    text: &str,
    dispatcher: &Dispatcher,
    events: &mpsc::Sender<ServerEvent>,
) {
    let command = match serde_json::from_str::<ClientCommand>(text) {
        Ok(command) => command,
        Err(err) => {
            debug!(error = %err, "ignoring malformed realtime frame");
            return;
        }
    };

    match command {
        ClientCommand::JoinProject { project_id } => {
            debug!(project_id = %project_id, "client joined project");
            let _ = events
                .send(ServerEvent::JoinedProject {
                    project_id,
                    timestamp: Utc::now(),
                })
                .await;
        }
        ClientCommand::AiRequest {
            task,
            payload,
            request_id,
        } => {
            let request_id = request_id.unwrap_or_else(|| "unknown".to_string());

            // Unknown task types never reach the queue.
            let task = match RealtimeTask::from_str(&task) {
                Ok(task) => task,
                Err(_) => {
                    let _ = events
                        .send(ServerEvent::AiError {
                            request_id,
                            error: format!("Unknown AI request type: {task}"),
                            timestamp: Utc::now(),
                        })
                        .await;
                    return;
                }
            };

            if let Err(job) = dispatcher.try_submit(AiJob {
                task,
                payload,
                request_id,
            }) {
                common::metrics::inc_realtime_dispatch_rejected();
                let _ = events
                    .send(ServerEvent::AiError {
                        request_id: job.request_id,
                        error: "dispatch queue full".to_string(),
                        timestamp: Utc::now(),
                    })
                    .await;
            }
        }
    }
}

#[derive(Debug)]
pub struct AiJob {
    pub task: RealtimeTask,
    pub payload: Value,
    pub request_id: String,
}

/// Per-connection dispatcher: a bounded queue drained by one task. Requests
/// run one at a time in arrival order, so events for a connection come back
/// in dispatch order. A full queue rejects immediately instead of stacking
/// unbounded upstream calls, and `shutdown` cancels the in-flight call.
pub struct Dispatcher {
    queue: mpsc::Sender<AiJob>,
    cancel: CancellationToken,
}

impl Dispatcher {
    pub fn spawn(
        ai: UpstreamClient,
        events: mpsc::Sender<ServerEvent>,
        queue_depth: usize,
    ) -> Self {
        let (queue_tx, mut queue_rx) = mpsc::channel::<AiJob>(queue_depth);
        let cancel = CancellationToken::new();
        let cancelled = cancel.clone();

        tokio::spawn(async move {
            loop {
                let job = tokio::select! {
                    _ = cancelled.cancelled() => break,
                    job = queue_rx.recv() => match job {
                        Some(job) => job,
                        None => break,
                    },
                };
                common::metrics::dec_realtime_queue_depth();

                let _ = events
                    .send(ServerEvent::AiProcessing {
                        request_id: job.request_id.clone(),
                        status: "processing".to_string(),
                        timestamp: Utc::now(),
                    })
                    .await;

                let outcome = tokio::select! {
                    _ = cancelled.cancelled() => break,
                    outcome = ai.post_value(job.task.upstream_path(), &job.payload) => outcome,
                };

                let event = match outcome {
                    Ok(result) => ServerEvent::AiResult {
                        request_id: job.request_id,
                        task: job.task.as_str().to_string(),
                        result,
                        timestamp: Utc::now(),
                    },
                    Err(err) => {
                        warn!(
                            task = job.task.as_str(),
                            error = %err,
                            "realtime AI request failed"
                        );
                        ServerEvent::AiError {
                            request_id: job.request_id,
                            error: err.to_string(),
                            timestamp: Utc::now(),
                        }
                    }
                };

                if events.send(event).await.is_err() {
                    break;
                }
            }

            // Cancelled or disconnected: account for whatever never ran.
            while queue_rx.try_recv().is_ok() {
                common::metrics::dec_realtime_queue_depth();
            }
        });

        Self {
            queue: queue_tx,
            cancel,
        }
    }

    /// Enqueue without waiting; hands the job back when the queue is full
    /// (or the dispatcher is gone).
    pub fn try_submit(&self, job: AiJob) -> Result<(), AiJob> {
        match self.queue.try_send(job) {
            Ok(()) => {
                common::metrics::inc_realtime_queue_depth();
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(job)) => Err(job),
            Err(mpsc::error::TrySendError::Closed(job)) => Err(job),
        }
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::time::Duration;
    use tokio::time::timeout;

    fn ai_client(base_url: &str) -> UpstreamClient {
        UpstreamClient::new("ai", base_url, Duration::from_secs(2))
            .expect("client should build")
    }

    async fn next_event(rx: &mut mpsc::Receiver<ServerEvent>) -> ServerEvent {
        timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("expected an event before timeout")
            .expect("events channel closed unexpectedly")
    }

    #[tokio::test]
    async fn sentiment_request_yields_processing_then_result() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/ai/sentiment");
            then.status(200)
                .json_body(serde_json::json!({"success": true, "data": {"sentiment": "positive"}}));
        });

        let (events_tx, mut events_rx) = mpsc::channel(16);
        let dispatcher = Dispatcher::spawn(ai_client(&server.base_url()), events_tx.clone(), 8);

        handle_frame(
            r#"{"event":"ai_request","type":"sentiment","payload":{"text":"I love this"},"request_id":"r-1"}"#,
            &dispatcher,
            &events_tx,
        )
        .await;

        match next_event(&mut events_rx).await {
            ServerEvent::AiProcessing {
                request_id, status, ..
            } => {
                assert_eq!(request_id, "r-1");
                assert_eq!(status, "processing");
            }
            other => panic!("expected ai_processing, got {other:?}"),
        }

        match next_event(&mut events_rx).await {
            ServerEvent::AiResult {
                request_id,
                task,
                result,
                ..
            } => {
                assert_eq!(request_id, "r-1");
                assert_eq!(task, "sentiment");
                assert_eq!(result["data"]["sentiment"], "positive");
            }
            other => panic!("expected ai_result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_task_type_yields_ai_error_and_never_a_result() {
        let (events_tx, mut events_rx) = mpsc::channel(16);
        // Upstream is unreachable on purpose; a correct implementation never
        // calls it for an unknown type.
        let dispatcher = Dispatcher::spawn(ai_client("http://127.0.0.1:1"), events_tx.clone(), 8);

        handle_frame(
            r#"{"event":"ai_request","type":"translate","payload":{"text":"hola"}}"#,
            &dispatcher,
            &events_tx,
        )
        .await;

        match next_event(&mut events_rx).await {
            ServerEvent::AiError {
                request_id, error, ..
            } => {
                assert_eq!(request_id, "unknown");
                assert_eq!(error, "Unknown AI request type: translate");
            }
            other => panic!("expected ai_error, got {other:?}"),
        }

        // Nothing else was enqueued.
        assert!(
            timeout(Duration::from_millis(200), events_rx.recv())
                .await
                .is_err(),
            "no further events expected"
        );
    }

    #[tokio::test]
    async fn upstream_failure_yields_ai_error() {
        let (events_tx, mut events_rx) = mpsc::channel(16);
        let dispatcher = Dispatcher::spawn(ai_client("http://127.0.0.1:1"), events_tx.clone(), 8);

        handle_frame(
            r#"{"event":"ai_request","type":"generate","payload":{"prompt":"hi"},"request_id":"r-9"}"#,
            &dispatcher,
            &events_tx,
        )
        .await;

        match next_event(&mut events_rx).await {
            ServerEvent::AiProcessing { .. } => {}
            other => panic!("expected ai_processing, got {other:?}"),
        }

        match next_event(&mut events_rx).await {
            ServerEvent::AiError { request_id, .. } => assert_eq!(request_id, "r-9"),
            other => panic!("expected ai_error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn full_queue_rejects_with_ai_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/ai/summarize");
            then.status(200)
                .delay(Duration::from_millis(1500))
                .json_body(serde_json::json!({"success": true}));
        });

        let (events_tx, mut events_rx) = mpsc::channel(32);
        let dispatcher = Dispatcher::spawn(ai_client(&server.base_url()), events_tx.clone(), 1);

        // Depth 1 plus one in flight: the first two frames can be absorbed,
        // a third must be rejected while the upstream is still sleeping.
        for id in ["q-1", "q-2", "q-3"] {
            handle_frame(
                &format!(
                    r#"{{"event":"ai_request","type":"summarize","payload":{{"text":"x"}},"request_id":"{id}"}}"#
                ),
                &dispatcher,
                &events_tx,
            )
            .await;
        }

        let mut rejected = 0;
        let mut processing = 0;
        for _ in 0..3 {
            match timeout(Duration::from_millis(500), events_rx.recv()).await {
                Ok(Some(ServerEvent::AiError { error, .. })) => {
                    assert_eq!(error, "dispatch queue full");
                    rejected += 1;
                }
                Ok(Some(ServerEvent::AiProcessing { .. })) => processing += 1,
                Ok(Some(other)) => panic!("unexpected event: {other:?}"),
                Ok(None) => break,
                Err(_) => break,
            }
        }

        assert!(rejected >= 1, "expected at least one queue-full rejection");
        assert!(processing >= 1, "expected the first job to start");
        dispatcher.shutdown();
    }

    #[tokio::test]
    async fn join_project_is_confirmed() {
        let (events_tx, mut events_rx) = mpsc::channel(16);
        let dispatcher = Dispatcher::spawn(ai_client("http://127.0.0.1:1"), events_tx.clone(), 8);

        handle_frame(
            r#"{"event":"join_project","project_id":"proj-42"}"#,
            &dispatcher,
            &events_tx,
        )
        .await;

        match next_event(&mut events_rx).await {
            ServerEvent::JoinedProject { project_id, .. } => assert_eq!(project_id, "proj-42"),
            other => panic!("expected joined_project, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn shutdown_cancels_pending_jobs() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/ai/text/generate");
            then.status(200)
                .delay(Duration::from_secs(5))
                .json_body(serde_json::json!({"success": true}));
        });

        let (events_tx, mut events_rx) = mpsc::channel(16);
        let dispatcher = Dispatcher::spawn(ai_client(&server.base_url()), events_tx.clone(), 8);

        handle_frame(
            r#"{"event":"ai_request","type":"generate","payload":{"prompt":"hi"},"request_id":"c-1"}"#,
            &dispatcher,
            &events_tx,
        )
        .await;

        match next_event(&mut events_rx).await {
            ServerEvent::AiProcessing { .. } => {}
            other => panic!("expected ai_processing, got {other:?}"),
        }

        dispatcher.shutdown();
        drop(events_tx);

        // The dispatcher task drops its sender on cancellation; the channel
        // closes without an ai_result for the cancelled call.
        let next = timeout(Duration::from_secs(2), events_rx.recv()).await;
        assert!(matches!(next, Ok(None)), "expected channel close, got {next:?}");
    }
}
