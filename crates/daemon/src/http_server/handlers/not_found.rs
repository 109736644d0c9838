use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;

/// Unknown routes answer in the same error shape as the API
pub async fn not_found_handler(method: Method, uri: Uri) -> Response {
    tracing::debug!(%method, path = uri.path(), "no route matched");
    let body = serde_json::json!({
        "error": "not_found",
        "message": format!("no route for {} {}", method, uri.path()),
    });
    (StatusCode::NOT_FOUND, Json(body)).into_response()
}
