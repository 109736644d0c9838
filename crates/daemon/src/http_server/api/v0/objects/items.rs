use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use common::model::{ItemFields, ItemId, ItemPatch, ItemRole, NewItem, ObjectId};

use super::{admin_token, b64, object_url, parse_id, password_proof, with_capabilities};
use crate::gateway::{GatewayError, ItemOp, ItemOutcome};
use crate::http_server::api::client::ApiRequest;
use crate::ServiceState;

/// One item mutation, tagged by `op`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ItemMutation {
    Append {
        role: ItemRole,
        #[serde(with = "b64")]
        encrypted_payload: Vec<u8>,
        #[serde(default)]
        fields: ItemFields,
    },
    Update {
        item_id: ItemId,
        expected_version: u64,
        #[serde(default, skip_serializing_if = "Option::is_none", with = "b64::option")]
        encrypted_payload: Option<Vec<u8>>,
        #[serde(default)]
        fields: ItemFields,
    },
    Delete {
        item_id: ItemId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expected_version: Option<u64>,
    },
}

impl From<ItemMutation> for ItemOp {
    fn from(mutation: ItemMutation) -> Self {
        match mutation {
            ItemMutation::Append {
                role,
                encrypted_payload,
                fields,
            } => ItemOp::Append(NewItem {
                role,
                encrypted_payload,
                fields,
            }),
            ItemMutation::Update {
                item_id,
                expected_version,
                encrypted_payload,
                fields,
            } => ItemOp::Update {
                item_id,
                expected_version,
                patch: ItemPatch {
                    encrypted_payload,
                    fields,
                },
            },
            ItemMutation::Delete {
                item_id,
                expected_version,
            } => ItemOp::Delete {
                item_id,
                expected_version,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ItemResponse {
    pub item_id: ItemId,
    /// Absent once the item is deleted
    pub item_version: Option<u64>,
    pub object_version: u64,
}

impl From<ItemOutcome> for ItemResponse {
    fn from(outcome: ItemOutcome) -> Self {
        Self {
            item_id: outcome.item_id,
            item_version: outcome.item_version,
            object_version: outcome.object_version,
        }
    }
}

pub async fn handler(
    State(state): State<ServiceState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(mutation): Json<ItemMutation>,
) -> Result<Json<ItemResponse>, GatewayError> {
    let id = parse_id(&id)?;
    let outcome = state
        .gateway()
        .mutate_item(
            &id,
            password_proof(&headers).as_ref(),
            admin_token(&headers).as_ref(),
            mutation.into(),
        )
        .await?;
    Ok(Json(outcome.into()))
}

#[derive(Debug, Clone)]
pub struct MutateItemRequest {
    pub id: ObjectId,
    pub password_hash: Option<String>,
    pub admin_token: Option<String>,
    pub mutation: ItemMutation,
}

impl ApiRequest for MutateItemRequest {
    type Response = ItemResponse;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, url::ParseError> {
        let full_url = object_url(base_url, &self.id, "/items")?;
        Ok(with_capabilities(
            client.post(full_url).json(&self.mutation),
            self.password_hash.as_deref(),
            self.admin_token.as_deref(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutation_wire_shape() {
        let mutation: ItemMutation = serde_json::from_str(
            r#"{"op":"update","item_id":"6f1c3b1e-8a4b-4a57-9e0c-3f1e2d9c4b10","expected_version":3,"fields":{"completed":true}}"#,
        )
        .unwrap();

        match ItemOp::from(mutation) {
            ItemOp::Update {
                expected_version,
                patch,
                ..
            } => {
                assert_eq!(expected_version, 3);
                assert!(patch.encrypted_payload.is_none());
                assert_eq!(patch.fields.completed, Some(true));
            }
            other => panic!("unexpected op {:?}", other),
        }

        let delete: ItemMutation = serde_json::from_str(
            r#"{"op":"delete","item_id":"6f1c3b1e-8a4b-4a57-9e0c-3f1e2d9c4b10"}"#,
        )
        .unwrap();
        assert!(matches!(
            ItemOp::from(delete),
            ItemOp::Delete {
                expected_version: None,
                ..
            }
        ));
    }
}
