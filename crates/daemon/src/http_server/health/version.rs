use axum::Json;

use common::version::{build_info, BuildInfo};

pub async fn handler() -> Json<BuildInfo> {
    Json(build_info())
}
