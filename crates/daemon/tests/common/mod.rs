#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::Router;
use http::{Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tower::ServiceExt;

use ::common::clock::{ManualClock, SharedClock};
use ephemera_daemon::gateway::DEFAULT_MAX_BLOB_BYTES;
use ephemera_daemon::http_server::{router, Config};
use ephemera_daemon::{ChangeDistributor, Database, ServiceState};

pub const PASSWORD_HEADER: &str = "x-password-hash";
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";
const BODY_LIMIT: usize = 4 * 1024 * 1024;

/// An in-memory database on a clock the test controls
pub async fn setup_db() -> (Database, ManualClock) {
    let clock = ManualClock::default();
    let shared: SharedClock = Arc::new(clock.clone());
    let url = url::Url::parse("sqlite::memory:").unwrap();
    let db = Database::connect_with_clock(&url, shared).await.unwrap();
    (db, clock)
}

pub struct TestApp {
    pub state: ServiceState,
    pub clock: ManualClock,
    router: Router,
}

impl TestApp {
    pub async fn new() -> Self {
        let (db, clock) = setup_db().await;
        let state = ServiceState::with_database(db, ChangeDistributor::new(16), DEFAULT_MAX_BLOB_BYTES);
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let config = Config::new(addr, None, DEFAULT_MAX_BLOB_BYTES).unwrap();
        Self {
            router: router(config, state.clone()),
            state,
            clock,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, headers: &[(&str, &str)]) -> Response<Body> {
        let mut builder = Request::get(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_json(
        &self,
        uri: &str,
        body: Value,
        headers: &[(&str, &str)],
    ) -> Response<Body> {
        self.json_request("POST", uri, body, headers).await
    }

    pub async fn put_json(&self, uri: &str, body: Value, headers: &[(&str, &str)]) -> Response<Body> {
        self.json_request("PUT", uri, body, headers).await
    }

    async fn json_request(
        &self,
        method: &str,
        uri: &str,
        body: Value,
        headers: &[(&str, &str)],
    ) -> Response<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(http::header::CONTENT_TYPE, "application/json");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// Create an object and return `(id, admin_token)`
    pub async fn create(&self, body: Value) -> (String, String) {
        let response = self.post_json("/api/v0/objects", body, &[]).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let created: Value = json_body(response).await;
        (
            created["id"].as_str().unwrap().to_string(),
            created["admin_token"].as_str().unwrap().to_string(),
        )
    }
}

pub async fn json_body<T: DeserializeOwned>(response: Response<Body>) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), BODY_LIMIT)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Base64 the way the API expects blobs
pub fn b64(bytes: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

pub fn list_body(lifetime_secs: u64) -> Value {
    json!({
        "kind": { "type": "list", "preset": "shopping" },
        "encrypted_structure": b64(b"sealed list"),
        "lifetime_secs": lifetime_secs,
    })
}

pub fn entry_body(payload: &[u8]) -> Value {
    json!({
        "op": "append",
        "role": "entry",
        "encrypted_payload": b64(payload),
        "fields": { "completed": false },
    })
}
