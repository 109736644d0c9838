use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tokio::time::timeout;

use super::probe::Probes;

const READINESS_TIMEOUT: Duration = Duration::from_secs(5);

/// Ready once every dependency answers within the timeout
#[tracing::instrument]
pub async fn handler(probes: Probes) -> Response {
    let failure = match timeout(READINESS_TIMEOUT, probes.check_all()).await {
        Ok(Ok(())) => {
            return (StatusCode::OK, Json(serde_json::json!({"status": "ok"}))).into_response()
        }
        Ok(Err(e)) => e.to_string(),
        Err(_) => "readiness check timed out".to_string(),
    };

    let body = serde_json::json!({"status": "failure", "message": failure});
    (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
}
