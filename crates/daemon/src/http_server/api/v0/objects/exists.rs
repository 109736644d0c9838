use axum::extract::{Path, State};
use axum::Json;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::model::ObjectId;

use super::object_url;
use crate::gateway::{ExistsOutcome, GatewayError};
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ExistsResponse {
    pub exists: bool,
    pub has_password: bool,
    pub burn_after_reading: bool,
}

impl From<ExistsOutcome> for ExistsResponse {
    fn from(outcome: ExistsOutcome) -> Self {
        Self {
            exists: outcome.exists,
            has_password: outcome.has_password,
            burn_after_reading: outcome.burn_after_reading,
        }
    }
}

/// Never 404s and never consumes anything; a malformed id simply does not exist
pub async fn handler(
    State(state): State<ServiceState>,
    Path(id): Path<String>,
) -> Result<Json<ExistsResponse>, GatewayError> {
    let Ok(id) = id.parse::<ObjectId>() else {
        return Ok(Json(ExistsResponse::default()));
    };
    let outcome = state.gateway().exists(&id).await?;
    Ok(Json(outcome.into()))
}

#[derive(Debug, Clone)]
pub struct ExistsRequest {
    pub id: ObjectId,
}

impl ApiRequest for ExistsRequest {
    type Response = ExistsResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, url::ParseError> {
        Ok(client.get(object_url(base_url, &self.id, "/exists")?))
    }
}
