use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use reqwest::{Client, RequestBuilder, Url};
use serde::Deserialize;

use common::model::ObjectId;

use super::{object_url, parse_id, password_proof, with_capabilities, SnapshotResponse};
use crate::gateway::GatewayError;
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

#[derive(Debug, Default, Deserialize)]
pub struct ReadQuery {
    /// Version the caller already holds; answered with 304 if still current
    pub known_version: Option<u64>,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Path(id): Path<String>,
    Query(query): Query<ReadQuery>,
    headers: HeaderMap,
) -> Result<Response, GatewayError> {
    let id = parse_id(&id)?;
    let proof = password_proof(&headers);

    match state
        .gateway()
        .read(&id, proof.as_ref(), query.known_version)
        .await?
    {
        Some(outcome) => Ok((
            StatusCode::OK,
            Json(SnapshotResponse::new(outcome.snapshot, outcome.destroyed)),
        )
            .into_response()),
        None => Ok(StatusCode::NOT_MODIFIED.into_response()),
    }
}

#[derive(Debug, Clone)]
pub struct ReadRequest {
    pub id: ObjectId,
    pub password_hash: Option<String>,
    pub known_version: Option<u64>,
}

impl ApiRequest for ReadRequest {
    type Response = SnapshotResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, url::ParseError> {
        let mut full_url = object_url(base_url, &self.id, "")?;
        if let Some(version) = self.known_version {
            full_url
                .query_pairs_mut()
                .append_pair("known_version", &version.to_string());
        }
        Ok(with_capabilities(
            client.get(full_url),
            self.password_hash.as_deref(),
            None,
        ))
    }
}
