use axum::extract::{Extension, Json, State};
use axum::response::{IntoResponse, Response};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use common::crypto::PasswordProof;
use common::model::{AdminToken, ObjectId, ObjectKind};

use super::b64;
use crate::gateway::{CreateObject, GatewayError};
use crate::http_server::api::client::ApiRequest;
use crate::http_server::Config;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRequest {
    pub kind: ObjectKind,
    #[serde(with = "b64")]
    pub encrypted_structure: Vec<u8>,
    /// One of the allowed lifetimes, in seconds
    pub lifetime_secs: u64,
    /// Proof derived from the object password, if it has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateResponse {
    pub id: ObjectId,
    /// Only ever returned here
    pub admin_token: AdminToken,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
    /// Base the server is reachable at; share links are built on it
    pub origin: Url,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Extension(config): Extension<Config>,
    Json(req): Json<CreateRequest>,
) -> Result<Response, GatewayError> {
    let created = state
        .gateway()
        .create(CreateObject {
            kind: req.kind,
            encrypted_structure: req.encrypted_structure,
            lifetime_secs: req.lifetime_secs,
            password_proof: req
                .password_hash
                .filter(|proof| !proof.is_empty())
                .map(PasswordProof::from_wire),
        })
        .await?;

    Ok((
        http::StatusCode::CREATED,
        Json(CreateResponse {
            id: created.record.id,
            admin_token: created.admin_token,
            created_at: created.record.created_at,
            expires_at: created.record.expires_at,
            origin: config.public_url,
        }),
    )
        .into_response())
}

impl ApiRequest for CreateRequest {
    type Response = CreateResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, url::ParseError> {
        let full_url = base_url.join("/api/v0/objects")?;
        Ok(client.post(full_url).json(&self))
    }
}
