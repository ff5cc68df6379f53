use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Uniform response envelope for everything the gateway generates itself.
/// Relayed upstream bodies bypass this and are passed through verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }
}

impl Envelope<Value> {
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            timestamp: Utc::now(),
        }
    }
}

/// Probe outcome for one upstream service, as reported by `GET /health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Healthy,
    Unhealthy,
    Unavailable,
}

impl ServiceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceStatus::Healthy => "healthy",
            ServiceStatus::Unhealthy => "unhealthy",
            ServiceStatus::Unavailable => "unavailable",
        }
    }
}

/// AI task kinds accepted over the realtime socket. The REST surface also
/// relays `translate`, but the socket contract never did; an unknown type is
/// answered with `ai_error` before anything is enqueued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RealtimeTask {
    Sentiment,
    Generate,
    Summarize,
}

impl RealtimeTask {
    pub fn as_str(self) -> &'static str {
        match self {
            RealtimeTask::Sentiment => "sentiment",
            RealtimeTask::Generate => "generate",
            RealtimeTask::Summarize => "summarize",
        }
    }

    /// Path on the AI upstream that serves this task.
    pub fn upstream_path(self) -> &'static str {
        match self {
            RealtimeTask::Sentiment => "/ai/sentiment",
            RealtimeTask::Generate => "/ai/text/generate",
            RealtimeTask::Summarize => "/ai/summarize",
        }
    }
}

impl std::str::FromStr for RealtimeTask {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sentiment" => Ok(RealtimeTask::Sentiment),
            "generate" => Ok(RealtimeTask::Generate),
            "summarize" => Ok(RealtimeTask::Summarize),
            _ => Err("unknown AI request type"),
        }
    }
}

/// Client -> server frames on the realtime socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientCommand {
    JoinProject {
        project_id: String,
    },
    AiRequest {
        #[serde(rename = "type")]
        task: String,
        #[serde(default)]
        payload: Value,
        #[serde(default)]
        request_id: Option<String>,
    },
}

/// Server -> client frames on the realtime socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServerEvent {
    Connected {
        client_id: String,
        message: String,
        timestamp: DateTime<Utc>,
    },
    JoinedProject {
        project_id: String,
        timestamp: DateTime<Utc>,
    },
    AiProcessing {
        request_id: String,
        status: String,
        timestamp: DateTime<Utc>,
    },
    AiResult {
        request_id: String,
        #[serde(rename = "type")]
        task: String,
        result: Value,
        timestamp: DateTime<Utc>,
    },
    AiError {
        request_id: String,
        error: String,
        timestamp: DateTime<Utc>,
    },
}

impl ServerEvent {
    /// Label used for the per-event metrics counter.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::Connected { .. } => "connected",
            ServerEvent::JoinedProject { .. } => "joined_project",
            ServerEvent::AiProcessing { .. } => "ai_processing",
            ServerEvent::AiResult { .. } => "ai_result",
            ServerEvent::AiError { .. } => "ai_error",
        }
    }
}
