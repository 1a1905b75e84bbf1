//! Axum router construction.

use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};

use super::{handlers, state::AppState};

/// Upper bound on a single request, migration sweeps included.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the application [`Router`] with all routes and middleware attached.
pub fn build(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/admin/keys", get(handlers::key_status))
        .route("/admin/keys/rotate", post(handlers::rotate_key))
        .route(
            "/admin/migrations",
            post(handlers::start_migration).delete(handlers::cancel_migration),
        )
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(CompressionLayer::new())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::FieldCodec;
    use crate::crypto::KEY_LEN;
    use crate::keyring::{KeyAlias, KeyRing, SecretKey};
    use crate::migration::{MemoryRecordStore, MigrationController};
    use axum::{body::Body, http::Request};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn state() -> AppState {
        let ring = KeyRing::new(
            KeyAlias::parse("K1").unwrap(),
            SecretKey::from_bytes([7u8; KEY_LEN]),
        );
        AppState::new(
            FieldCodec::new(ring),
            vec!["email".into()],
            MigrationController::default(),
        )
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let req = Request::builder()
            .uri("/unknown")
            .body(Body::empty())
            .unwrap();
        let resp = build(state()).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn health_route_exists() {
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = build(state()).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 200);
    }

    #[tokio::test]
    async fn migration_without_store_is_unavailable() {
        let req = Request::builder()
            .method("POST")
            .uri("/admin/migrations")
            .body(Body::empty())
            .unwrap();
        let resp = build(state()).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 503);
    }

    #[tokio::test]
    async fn migration_with_store_returns_report() {
        let store = Arc::new(MemoryRecordStore::new());
        store.insert("u1", "email", "a@example.com");
        let app = build(state().with_record_store(store.clone()));
        let req = Request::builder()
            .method("POST")
            .uri("/admin/migrations")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn rotate_rejects_malformed_body() {
        let req = Request::builder()
            .method("POST")
            .uri("/admin/keys/rotate")
            .header("content-type", "application/json")
            .body(Body::from("{\"new_alias\":"))
            .unwrap();
        let resp = build(state()).oneshot(req).await.unwrap();
        assert!(resp.status().is_client_error());
    }
}
