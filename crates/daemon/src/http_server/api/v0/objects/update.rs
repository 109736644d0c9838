use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::model::ObjectId;

use super::{admin_token, b64, object_url, parse_id, with_capabilities};
use crate::gateway::GatewayError;
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

/// Replace an object's encrypted structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconfigureBody {
    #[serde(with = "b64")]
    pub encrypted_structure: Vec<u8>,
    pub expected_version: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReconfigureResponse {
    pub version: u64,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<ReconfigureBody>,
) -> Result<Json<ReconfigureResponse>, GatewayError> {
    let id = parse_id(&id)?;
    let version = state
        .gateway()
        .reconfigure(
            &id,
            admin_token(&headers).as_ref(),
            body.encrypted_structure,
            body.expected_version,
        )
        .await?;
    Ok(Json(ReconfigureResponse { version }))
}

#[derive(Debug, Clone)]
pub struct ReconfigureRequest {
    pub id: ObjectId,
    pub admin_token: String,
    pub body: ReconfigureBody,
}

impl ApiRequest for ReconfigureRequest {
    type Response = ReconfigureResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, url::ParseError> {
        let full_url = object_url(base_url, &self.id, "")?;
        Ok(with_capabilities(
            client.put(full_url).json(&self.body),
            None,
            Some(&self.admin_token),
        ))
    }
}
