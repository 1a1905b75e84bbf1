//! Axum request handlers for all service endpoints.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::{
    protocol::{ErrorResponse, HealthResponse, MigrationReportResponse, RotateKeyRequest},
    ServiceError,
};
use tracing::{error, warn};

use super::state::AppState;
use crate::keyring::{rotation, KeyRingError};
use crate::migration::SweepError;

/// `GET /health`: liveness check.
///
/// The ring always holds an active key once the service is up, so this
/// reports `200 OK` together with the active alias and key count.
pub async fn health(State(state): State<AppState>) -> Response {
    let snapshot = state.key_ring.snapshot();
    let body = HealthResponse {
        status: "ok".into(),
        active_alias: snapshot.active_alias().to_string(),
        key_count: snapshot.len(),
    };
    (StatusCode::OK, Json(body)).into_response()
}

/// `GET /admin/keys`: active alias plus every known alias.
pub async fn key_status(State(state): State<AppState>) -> Response {
    (StatusCode::OK, Json(rotation::key_status(&state.key_ring))).into_response()
}

/// `POST /admin/keys/rotate`: add a key and make it active.
pub async fn rotate_key(
    State(state): State<AppState>,
    Json(req): Json<RotateKeyRequest>,
) -> Response {
    match rotation::rotate(&state.key_ring, &req) {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        Err(e) => error_response(rotation_error(e)),
    }
}

/// `POST /admin/migrations`: run the legacy-plaintext sweep and return its report.
///
/// The sweep runs on the blocking pool. If the request times out first, the
/// sweep keeps going and its summary is still logged.
pub async fn start_migration(State(state): State<AppState>) -> Response {
    let Some(store) = state.record_store.clone() else {
        return error_response(ServiceError::Unavailable(
            "no record store is attached to this service".into(),
        ));
    };
    if state.sweep.attributes().is_empty() {
        return error_response(ServiceError::BadRequest(
            "no migration attributes configured".into(),
        ));
    }

    match state.migrations.run(Arc::clone(&state.sweep), store).await {
        Ok(report) => {
            (StatusCode::OK, Json(MigrationReportResponse::from(report))).into_response()
        }
        Err(SweepError::AlreadyRunning) => error_response(ServiceError::Conflict(
            "a migration sweep is already running".into(),
        )),
        Err(e) => {
            error!(error = %e, "migration sweep failed");
            error_response(ServiceError::Internal("migration sweep failed".into()))
        }
    }
}

/// `DELETE /admin/migrations`: cooperatively cancel the running sweep.
pub async fn cancel_migration(State(state): State<AppState>) -> Response {
    if state.migrations.cancel() {
        StatusCode::ACCEPTED.into_response()
    } else {
        error_response(ServiceError::NotFound(
            "no migration sweep is running".into(),
        ))
    }
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

fn rotation_error(e: KeyRingError) -> ServiceError {
    match e {
        KeyRingError::DuplicateAlias(_) => ServiceError::Conflict(e.to_string()),
        KeyRingError::WeakKey { .. } | KeyRingError::InvalidAlias(_) => {
            ServiceError::BadRequest(e.to_string())
        }
        KeyRingError::NoValidKeys => {
            warn!(error = %e, "unexpected key ring error during rotation");
            ServiceError::Internal("rotation failed".into())
        }
    }
}

fn error_response(err: ServiceError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorResponse::new(err.code(), err.to_string()))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::FieldCodec;
    use crate::crypto::KEY_LEN;
    use crate::keyring::{KeyAlias, KeyRing, SecretKey};
    use crate::migration::MigrationController;
    use axum::routing::{delete, get};
    use axum::{body::Body, http::Request, Router};
    use tower::ServiceExt;

    fn state() -> AppState {
        let ring = KeyRing::new(
            KeyAlias::parse("K1").unwrap(),
            SecretKey::from_bytes([1u8; KEY_LEN]),
        );
        AppState::new(
            FieldCodec::new(ring),
            vec!["email".into()],
            MigrationController::default(),
        )
    }

    #[tokio::test]
    async fn health_reports_active_alias() {
        let app = Router::new()
            .route("/health", get(health))
            .with_state(state());
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn cancel_without_sweep_is_404() {
        let app = Router::new()
            .route("/admin/migrations", delete(cancel_migration))
            .with_state(state());
        let req = Request::builder()
            .method("DELETE")
            .uri("/admin/migrations")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn rotation_errors_map_to_statuses() {
        assert_eq!(
            rotation_error(KeyRingError::DuplicateAlias("K1".into())).http_status(),
            409
        );
        assert_eq!(
            rotation_error(KeyRingError::WeakKey { alias: "K2".into() }).http_status(),
            400
        );
        assert_eq!(
            rotation_error(KeyRingError::InvalidAlias("a b".into())).http_status(),
            400
        );
        assert_eq!(rotation_error(KeyRingError::NoValidKeys).http_status(), 500);
    }
}
