use crate::AppState;
use axum::{extract::State, Json};
use domain::Envelope;
use serde_json::{json, Value};
use tracing::warn;

/// Merge the model lists of both upstreams. The core backend answers with an
/// envelope whose `data` is a flat array; the AI backend nests the list under
/// `data.models`. A failed source contributes an empty list instead of
/// failing the whole call.
pub async fn list_models(State(state): State<AppState>) -> Json<Envelope<Value>> {
    let (core, ai) = tokio::join!(
        state.upstreams.core.get_value("/api/v1/ai/models"),
        state.upstreams.ai.get_value("/ai/models"),
    );

    let mut models: Vec<Value> = Vec::new();

    match core {
        Ok(value) => {
            if let Some(list) = value.get("data").and_then(Value::as_array) {
                models.extend(list.iter().cloned());
            }
        }
        Err(err) => {
            warn!(upstream = "core", error = %err, "model source failed, substituting empty list");
        }
    }

    match ai {
        Ok(value) => {
            if let Some(list) = value.pointer("/data/models").and_then(Value::as_array) {
                models.extend(list.iter().cloned());
            }
        }
        Err(err) => {
            warn!(upstream = "ai", error = %err, "model source failed, substituting empty list");
        }
    }

    let total = models.len();
    Json(Envelope::ok(json!({
        "models": models,
        "total": total,
        "sources": ["rust-core", "ai-services"],
    })))
}
