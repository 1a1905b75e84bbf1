//! End-to-end tests of the administrative HTTP surface.

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use base64::{engine::general_purpose::STANDARD, Engine};
use common::protocol::{ErrorResponse, HealthResponse, KeyStatusResponse, MigrationReportResponse};
use serde_json::json;

use pii_vault::codec::{is_sealed, FieldCodec};
use pii_vault::crypto::KEY_LEN;
use pii_vault::keyring::{KeyAlias, KeyRing, SecretKey};
use pii_vault::migration::{MemoryRecordStore, MigrationController};
use pii_vault::server::{router, state::AppState};

fn ring() -> KeyRing {
    KeyRing::new(
        KeyAlias::parse("K1").unwrap(),
        SecretKey::from_bytes([0x11; KEY_LEN]),
    )
}

fn server(ring: KeyRing, store: Option<Arc<MemoryRecordStore>>) -> TestServer {
    let mut state = AppState::new(
        FieldCodec::new(ring),
        vec!["email".into(), "phone".into()],
        MigrationController::default(),
    );
    if let Some(store) = store {
        state = state.with_record_store(store);
    }
    TestServer::new(router::build(state)).unwrap()
}

fn material(byte: u8) -> String {
    STANDARD.encode([byte; KEY_LEN])
}

#[tokio::test]
async fn health_reports_active_alias_and_key_count() {
    let server = server(ring(), None);
    let resp = server.get("/health").await;
    resp.assert_status_ok();
    let body: HealthResponse = resp.json();
    assert_eq!(body.status, "ok");
    assert_eq!(body.active_alias, "K1");
    assert_eq!(body.key_count, 1);
}

#[tokio::test]
async fn rotation_activates_new_key_and_keeps_old_one() {
    let ring = ring();
    let codec = FieldCodec::new(ring.clone());
    let before = codec.seal("alice@example.com").unwrap();

    let server = server(ring, None);
    let resp = server
        .post("/admin/keys/rotate")
        .json(&json!({ "new_alias": "K2", "key_material": material(0x22) }))
        .await;
    resp.assert_status_ok();
    let status: KeyStatusResponse = resp.json();
    assert_eq!(status.active_alias, "K2");
    assert_eq!(status.aliases, vec!["K1", "K2"]);

    let after = codec.seal("bob@example.com").unwrap();
    assert!(after.starts_with("{enc}K2:"));
    assert_eq!(codec.open(&before).unwrap(), "alice@example.com");
    assert_eq!(codec.open(&after).unwrap(), "bob@example.com");

    let keys: KeyStatusResponse = server.get("/admin/keys").await.json();
    assert_eq!(keys, status);
}

#[tokio::test]
async fn rotation_to_existing_alias_conflicts() {
    let server = server(ring(), None);
    let resp = server
        .post("/admin/keys/rotate")
        .json(&json!({ "new_alias": "K1", "key_material": material(0x22) }))
        .await;
    resp.assert_status(StatusCode::CONFLICT);
    let err: ErrorResponse = resp.json();
    assert_eq!(err.code, "conflict");
}

#[tokio::test]
async fn rotation_with_weak_key_is_rejected_without_echoing_it() {
    let server = server(ring(), None);
    let resp = server
        .post("/admin/keys/rotate")
        .json(&json!({ "new_alias": "K2", "key_material": "short-secret" }))
        .await;
    resp.assert_status(StatusCode::BAD_REQUEST);
    assert!(!resp.text().contains("short-secret"));

    let keys: KeyStatusResponse = server.get("/admin/keys").await.json();
    assert_eq!(keys.active_alias, "K1");
}

#[tokio::test]
async fn rotation_with_invalid_alias_is_rejected() {
    let server = server(ring(), None);
    server
        .post("/admin/keys/rotate")
        .json(&json!({ "new_alias": "has space", "key_material": material(0x22) }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn migration_seals_legacy_plaintext_once() {
    let store = Arc::new(MemoryRecordStore::new());
    store.insert("u1", "email", "alice@example.com");
    store.insert("u1", "phone", "555-0100");
    store.insert("u2", "email", "bob@example.com");
    let server = server(ring(), Some(store.clone()));

    let first: MigrationReportResponse = server.post("/admin/migrations").await.json();
    assert_eq!((first.scanned, first.touched, first.failed), (2, 2, 0));
    assert!(!first.cancelled);
    assert!(is_sealed(&store.get("u1", "email").unwrap()));
    assert!(is_sealed(&store.get("u1", "phone").unwrap()));
    let writes = store.writes();
    assert_eq!(writes, 3);

    let second: MigrationReportResponse = server.post("/admin/migrations").await.json();
    assert_eq!(second.touched, 0);
    assert_eq!(store.writes(), writes);
}

#[tokio::test]
async fn migration_without_store_is_unavailable() {
    let server = server(ring(), None);
    let resp = server.post("/admin/migrations").await;
    resp.assert_status(StatusCode::SERVICE_UNAVAILABLE);
    let err: ErrorResponse = resp.json();
    assert_eq!(err.code, "service_unavailable");
}

#[tokio::test]
async fn cancelling_idle_migration_is_not_found() {
    let server = server(ring(), None);
    server
        .delete("/admin/migrations")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_route_returns_json_404() {
    let server = server(ring(), None);
    let resp = server.get("/nope").await;
    resp.assert_status(StatusCode::NOT_FOUND);
    let err: ErrorResponse = resp.json();
    assert_eq!(err.code, "not_found");
}
