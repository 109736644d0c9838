//! `/api/v0/objects`: every object and item operation.
//!
//! Blobs travel base64-encoded. Password proofs and admin tokens travel in
//! headers, never in bodies or URLs.

use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use common::crypto::PasswordProof;
use common::model::{
    AdminToken, ItemFields, ItemId, ItemRecord, ItemRole, ObjectId, ObjectKind, ObjectRecord,
    Snapshot,
};

use super::super::{ADMIN_TOKEN_HEADER, PASSWORD_HEADER};
use crate::gateway::GatewayError;
use crate::ServiceState;

pub mod create;
pub mod delete;
mod error;
pub mod events;
pub mod exists;
pub mod items;
pub mod read;
pub mod update;

pub fn router(state: ServiceState) -> Router<ServiceState> {
    Router::new()
        .route("/", post(create::handler))
        .route("/:id", get(read::handler).put(update::handler))
        .route("/:id/exists", get(exists::handler))
        .route("/:id/items", post(items::handler))
        .route("/:id/events", get(events::handler))
        .route("/:id/delete", post(delete::handler))
        .with_state(state)
}

/// Standard base64 for opaque blobs
pub mod b64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            bytes: &Option<Vec<u8>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match bytes {
                Some(bytes) => super::serialize(bytes, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Vec<u8>>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(encoded) => STANDARD
                    .decode(encoded.as_bytes())
                    .map(Some)
                    .map_err(serde::de::Error::custom),
                None => Ok(None),
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectView {
    pub id: ObjectId,
    pub kind: ObjectKind,
    #[serde(with = "b64")]
    pub encrypted_structure: Vec<u8>,
    pub version: u64,
    pub has_password: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl From<ObjectRecord> for ObjectView {
    fn from(record: ObjectRecord) -> Self {
        Self {
            has_password: record.has_password(),
            id: record.id,
            kind: record.kind,
            encrypted_structure: record.encrypted_structure,
            version: record.version,
            created_at: record.created_at,
            expires_at: record.expires_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemView {
    pub id: ItemId,
    pub role: ItemRole,
    #[serde(with = "b64")]
    pub encrypted_payload: Vec<u8>,
    pub version: u64,
    #[serde(default)]
    pub fields: ItemFields,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<ItemRecord> for ItemView {
    fn from(item: ItemRecord) -> Self {
        Self {
            id: item.id,
            role: item.role,
            encrypted_payload: item.encrypted_payload,
            version: item.version,
            fields: item.fields,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

/// Full state of an object, as returned by reads and pushed over events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotResponse {
    pub object: ObjectView,
    pub items: Vec<ItemView>,
    #[serde(default)]
    pub destroyed: bool,
}

impl SnapshotResponse {
    pub fn new(snapshot: Snapshot, destroyed: bool) -> Self {
        Self {
            object: snapshot.object.into(),
            items: snapshot.items.into_iter().map(ItemView::from).collect(),
            destroyed,
        }
    }

    pub fn version(&self) -> u64 {
        self.object.version
    }
}

/// Malformed ids name nothing, so they read as not found
fn parse_id(raw: &str) -> Result<ObjectId, GatewayError> {
    Ok(raw.parse::<ObjectId>()?)
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

fn password_proof(headers: &HeaderMap) -> Option<PasswordProof> {
    header_value(headers, PASSWORD_HEADER).map(PasswordProof::from_wire)
}

fn admin_token(headers: &HeaderMap) -> Option<AdminToken> {
    header_value(headers, ADMIN_TOKEN_HEADER).map(|v| AdminToken::from(v.to_string()))
}

/// Attach the optional capability headers to an outgoing request
fn with_capabilities(
    mut builder: reqwest::RequestBuilder,
    password_hash: Option<&str>,
    admin_token: Option<&str>,
) -> reqwest::RequestBuilder {
    if let Some(proof) = password_hash {
        builder = builder.header(PASSWORD_HEADER, proof);
    }
    if let Some(token) = admin_token {
        builder = builder.header(ADMIN_TOKEN_HEADER, token);
    }
    builder
}

fn object_url(base_url: &url::Url, id: &ObjectId, suffix: &str) -> Result<url::Url, url::ParseError> {
    base_url.join(&format!("/api/v0/objects/{}{}", id, suffix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_b64_round_trips_binary() {
        #[derive(Serialize, Deserialize)]
        struct Blob {
            #[serde(with = "b64")]
            data: Vec<u8>,
            #[serde(default, with = "b64::option")]
            maybe: Option<Vec<u8>>,
        }

        let blob = Blob {
            data: vec![0, 255, 7, 128],
            maybe: None,
        };
        let json = serde_json::to_string(&blob).unwrap();
        assert!(json.contains("\"AP8HgA==\""));

        let back: Blob = serde_json::from_str(&json).unwrap();
        assert_eq!(back.data, vec![0, 255, 7, 128]);
        assert!(back.maybe.is_none());
    }

    #[test]
    fn test_b64_rejects_garbage() {
        #[derive(Deserialize)]
        struct Blob {
            #[serde(with = "b64")]
            #[allow(dead_code)]
            data: Vec<u8>,
        }

        assert!(serde_json::from_str::<Blob>(r#"{"data":"not base64!"}"#).is_err());
    }

    #[test]
    fn test_malformed_id_is_not_found() {
        assert_eq!(parse_id("../../etc").unwrap_err(), GatewayError::NotFound);
    }
}
