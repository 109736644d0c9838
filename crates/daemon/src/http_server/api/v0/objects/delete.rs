use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use reqwest::{Client, RequestBuilder, Url};

use common::model::ObjectId;

use super::{admin_token, object_url, parse_id, with_capabilities};
use crate::gateway::GatewayError;
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

pub async fn handler(
    State(state): State<ServiceState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, GatewayError> {
    let id = parse_id(&id)?;
    state
        .gateway()
        .delete(&id, admin_token(&headers).as_ref())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Clone)]
pub struct DeleteRequest {
    pub id: ObjectId,
    pub admin_token: String,
}

impl ApiRequest for DeleteRequest {
    type Response = ();

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, url::ParseError> {
        let full_url = object_url(base_url, &self.id, "/delete")?;
        Ok(with_capabilities(
            client.post(full_url),
            None,
            Some(&self.admin_token),
        ))
    }
}
