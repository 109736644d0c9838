use axum::Json;
use serde_json::{json, Value};

/// Alive as long as the runtime can answer
pub async fn handler() -> Json<Value> {
    Json(json!({"status": "ok"}))
}
