//! HTTP surface tests, driven through the router without binding a socket

mod common;

use std::time::Duration;

use axum::body::Body;
use futures::StreamExt;
use http::{Request, StatusCode};
use serde_json::{json, Value};

use ::common::crypto::PasswordProof;
use ::common::model::{Lifetime, ObjectId};

use crate::common::{
    b64, entry_body, json_body, list_body, TestApp, ADMIN_TOKEN_HEADER, PASSWORD_HEADER,
};

#[tokio::test]
async fn test_create_then_read() {
    let app = TestApp::new().await;
    let (id, admin_token) = app.create(list_body(3600)).await;
    assert!(!admin_token.is_empty());

    let response = app.get(&format!("/api/v0/objects/{}", id), &[]).await;
    assert_eq!(response.status(), StatusCode::OK);

    let snapshot: Value = json_body(response).await;
    assert_eq!(snapshot["object"]["id"], id.as_str());
    assert_eq!(snapshot["object"]["version"], 1);
    assert_eq!(snapshot["object"]["kind"]["type"], "list");
    assert_eq!(snapshot["object"]["has_password"], false);
    assert_eq!(snapshot["object"]["encrypted_structure"], b64(b"sealed list"));
    assert_eq!(snapshot["items"], json!([]));
    // the admin token never appears outside the create response
    assert!(!snapshot.to_string().contains(&admin_token));
}

#[tokio::test]
async fn test_unknown_and_malformed_ids_are_not_found() {
    let app = TestApp::new().await;

    let unknown = ObjectId::generate().unwrap();
    for id in [unknown.as_str(), "not-an-id"] {
        let response = app.get(&format!("/api/v0/objects/{}", id), &[]).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: Value = json_body(response).await;
        assert_eq!(body["error"], "not_found");
    }
}

#[tokio::test]
async fn test_invalid_lifetime_is_rejected() {
    let app = TestApp::new().await;
    let response = app
        .post_json("/api/v0/objects", list_body(1234), &[])
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = json_body(response).await;
    assert_eq!(body["error"], "invalid_duration");
}

#[tokio::test]
async fn test_every_allowed_lifetime_is_accepted() {
    let app = TestApp::new().await;
    for lifetime in Lifetime::ALL {
        let response = app
            .post_json("/api/v0/objects", list_body(lifetime.as_secs()), &[])
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let created: Value = json_body(response).await;
        assert_eq!(created["origin"], "http://localhost:0/");
    }
}

#[tokio::test]
async fn test_known_version_short_circuits() {
    let app = TestApp::new().await;
    let (id, _) = app.create(list_body(3600)).await;
    let uri = format!("/api/v0/objects/{}", id);

    let response = app.get(&format!("{}?known_version=1", uri), &[]).await;
    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);

    let response = app
        .post_json(&format!("{}/items", uri), entry_body(b"milk"), &[])
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let written: Value = json_body(response).await;
    assert_eq!(written["object_version"], 2);
    assert_eq!(written["item_version"], 1);

    let response = app.get(&format!("{}?known_version=1", uri), &[]).await;
    assert_eq!(response.status(), StatusCode::OK);
    let snapshot: Value = json_body(response).await;
    assert_eq!(snapshot["object"]["version"], 2);
    assert_eq!(snapshot["items"][0]["fields"]["completed"], false);
}

#[tokio::test]
async fn test_password_protected_objects() {
    let app = TestApp::new().await;
    let proof = PasswordProof::derive("hunter2");
    let wrong = PasswordProof::derive("hunter3");

    let mut body = list_body(3600);
    body["password_hash"] = json!(proof.as_str());
    let (id, _) = app.create(body).await;
    let uri = format!("/api/v0/objects/{}", id);

    let response = app.get(&uri, &[]).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.get(&uri, &[(PASSWORD_HEADER, wrong.as_str())]).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .post_json(&format!("{}/items", uri), entry_body(b"milk"), &[])
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.get(&uri, &[(PASSWORD_HEADER, proof.as_str())]).await;
    assert_eq!(response.status(), StatusCode::OK);
    let snapshot: Value = json_body(response).await;
    assert_eq!(snapshot["object"]["has_password"], true);

    // existence checks never need the password
    let response = app.get(&format!("{}/exists", uri), &[]).await;
    let exists: Value = json_body(response).await;
    assert_eq!(exists["exists"], true);
    assert_eq!(exists["has_password"], true);
}

#[tokio::test]
async fn test_reconfigure_requires_admin_and_current_version() {
    let app = TestApp::new().await;
    let (id, admin_token) = app.create(list_body(3600)).await;
    let uri = format!("/api/v0/objects/{}", id);
    let body = |version: u64| {
        json!({
            "encrypted_structure": b64(b"renamed list"),
            "expected_version": version,
        })
    };

    let response = app.put_json(&uri, body(1), &[]).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .put_json(&uri, body(1), &[(ADMIN_TOKEN_HEADER, "not-the-token")])
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .put_json(&uri, body(1), &[(ADMIN_TOKEN_HEADER, &admin_token)])
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated: Value = json_body(response).await;
    assert_eq!(updated["version"], 2);

    // a second writer still holding version 1 loses
    let response = app
        .put_json(&uri, body(1), &[(ADMIN_TOKEN_HEADER, &admin_token)])
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let conflict: Value = json_body(response).await;
    assert_eq!(conflict["error"], "version_conflict");
}

#[tokio::test]
async fn test_stale_item_update_conflicts() {
    let app = TestApp::new().await;
    let (id, _) = app.create(list_body(3600)).await;
    let items = format!("/api/v0/objects/{}/items", id);

    let response = app.post_json(&items, entry_body(b"milk"), &[]).await;
    let written: Value = json_body(response).await;
    let item_id = written["item_id"].as_str().unwrap().to_string();

    let update = json!({
        "op": "update",
        "item_id": item_id,
        "expected_version": 1,
        "fields": { "completed": true },
    });
    let response = app.post_json(&items, update.clone(), &[]).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.post_json(&items, update, &[]).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_invalid_item_writes_are_unprocessable() {
    let app = TestApp::new().await;
    let note = json!({
        "kind": { "type": "note" },
        "encrypted_structure": b64(b"sealed note"),
        "lifetime_secs": 3600,
    });
    let (note_id, _) = app.create(note).await;
    let response = app
        .post_json(
            &format!("/api/v0/objects/{}/items", note_id),
            entry_body(b"milk"),
            &[],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // shopping lists carry no claims
    let (list_id, _) = app.create(list_body(3600)).await;
    let claimed = json!({
        "op": "append",
        "role": "entry",
        "encrypted_payload": b64(b"milk"),
        "fields": { "claimed": true },
    });
    let response = app
        .post_json(&format!("/api/v0/objects/{}/items", list_id), claimed, &[])
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = json_body(response).await;
    assert_eq!(body["error"], "validation");
}

#[tokio::test]
async fn test_quiz_questions_are_admin_only() {
    let app = TestApp::new().await;
    let quiz = json!({
        "kind": { "type": "quiz" },
        "encrypted_structure": b64(b"sealed quiz"),
        "lifetime_secs": 3600,
    });
    let (id, admin_token) = app.create(quiz).await;
    let items = format!("/api/v0/objects/{}/items", id);
    let question = json!({
        "op": "append",
        "role": "question",
        "encrypted_payload": b64(b"what is 2 + 2"),
        "fields": { "position": 0 },
    });

    let response = app.post_json(&items, question.clone(), &[]).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .post_json(&items, question, &[(ADMIN_TOKEN_HEADER, &admin_token)])
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_burn_after_reading_note_is_read_once() {
    let app = TestApp::new().await;
    let note = json!({
        "kind": { "type": "note", "burn_after_reading": true },
        "encrypted_structure": b64(b"self destructing"),
        "lifetime_secs": 86400,
    });
    let (id, _) = app.create(note).await;
    let uri = format!("/api/v0/objects/{}", id);

    // checking existence does not consume it
    let exists: Value = json_body(app.get(&format!("{}/exists", uri), &[]).await).await;
    assert_eq!(exists["exists"], true);
    assert_eq!(exists["burn_after_reading"], true);

    let response = app.get(&uri, &[]).await;
    assert_eq!(response.status(), StatusCode::OK);
    let snapshot: Value = json_body(response).await;
    assert_eq!(snapshot["destroyed"], true);
    assert_eq!(snapshot["object"]["encrypted_structure"], b64(b"self destructing"));

    let response = app.get(&uri, &[]).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let exists: Value = json_body(app.get(&format!("{}/exists", uri), &[]).await).await;
    assert_eq!(exists["exists"], false);
}

#[tokio::test]
async fn test_delete_requires_admin() {
    let app = TestApp::new().await;
    let (id, admin_token) = app.create(list_body(3600)).await;
    let uri = format!("/api/v0/objects/{}/delete", id);

    let response = app.post_json(&uri, json!({}), &[]).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .post_json(&uri, json!({}), &[(ADMIN_TOKEN_HEADER, &admin_token)])
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .post_json(&uri, json!({}), &[(ADMIN_TOKEN_HEADER, &admin_token)])
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_expired_objects_read_as_missing() {
    let app = TestApp::new().await;
    let (id, _) = app.create(list_body(Lifetime::FiveMinutes.as_secs())).await;
    let uri = format!("/api/v0/objects/{}", id);

    app.clock.advance(Lifetime::FiveMinutes.duration() - time::Duration::seconds(1));
    assert_eq!(app.get(&uri, &[]).await.status(), StatusCode::OK);

    app.clock.advance(time::Duration::seconds(1));
    assert_eq!(app.get(&uri, &[]).await.status(), StatusCode::NOT_FOUND);

    let purged = app.state.gateway().purge_expired().await.unwrap();
    assert_eq!(purged.len(), 1);
    assert_eq!(purged[0].as_str(), id);
}

#[tokio::test]
async fn test_events_stream_starts_with_current_state() {
    let app = TestApp::new().await;
    let (id, _) = app.create(list_body(3600)).await;

    let request = Request::get(format!("/api/v0/objects/{}/events", id))
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[http::header::CONTENT_TYPE],
        "text/event-stream"
    );

    let mut frames = response.into_body().into_data_stream();
    let mut text = String::new();
    while !text.contains("\n\n") {
        let chunk = tokio::time::timeout(Duration::from_secs(5), frames.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        text.push_str(&String::from_utf8_lossy(&chunk));
    }

    assert!(text.starts_with("event: snapshot\n"));
    let data = text
        .lines()
        .find_map(|line| line.strip_prefix("data: "))
        .unwrap();
    let snapshot: Value = serde_json::from_str(data).unwrap();
    assert_eq!(snapshot["object"]["id"], id.as_str());
    assert_eq!(snapshot["object"]["version"], 1);
}

#[tokio::test]
async fn test_status_routes() {
    let app = TestApp::new().await;

    let response = app.get("/_status/livez", &[]).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.get("/_status/readyz", &[]).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.get("/_status/version", &[]).await;
    assert_eq!(response.status(), StatusCode::OK);
    let version: Value = json_body(response).await;
    assert!(version["version"].is_string());

    let response = app.get("/nowhere", &[]).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = json_body(response).await;
    assert_eq!(body["error"], "not_found");
}
