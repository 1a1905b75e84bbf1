//! Request and response types for the administrative surface.
//!
//! These types are serialised as JSON. None of them may ever carry key
//! material on the way *out*; only aliases are reported.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Key status / rotation
// ---------------------------------------------------------------------------

/// Response body for `GET /admin/keys` and `POST /admin/keys/rotate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyStatusResponse {
    /// Alias of the key used for every new seal operation.
    pub active_alias: String,
    /// Every alias known to the key ring, sorted.
    pub aliases: Vec<String>,
}

/// Request body for `POST /admin/keys/rotate`.
#[derive(Clone, Serialize, Deserialize)]
pub struct RotateKeyRequest {
    /// Alias for the incoming key. Must not already exist in the ring.
    pub new_alias: String,
    /// Raw key material: base64 of at least 32 bytes, or a 32+ byte secret.
    pub key_material: String,
}

impl std::fmt::Debug for RotateKeyRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotateKeyRequest")
            .field("new_alias", &self.new_alias)
            .field("key_material", &"[REDACTED]")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Migration sweep
// ---------------------------------------------------------------------------

/// Response body for `POST /admin/migrations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationReportResponse {
    /// Identifier of this sweep run, also attached to its log lines.
    pub run_id: Uuid,
    /// Records visited.
    pub scanned: usize,
    /// Records with at least one attribute rewritten.
    pub touched: usize,
    /// Records that could not be migrated.
    pub failed: usize,
    /// `true` if the sweep stopped early on operator request.
    pub cancelled: bool,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"bad_request"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status: `"ok"`.
    pub status: String,
    /// Alias of the active key.
    pub active_alias: String,
    /// Number of keys (active + legacy) held by the ring.
    pub key_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rotate_request_from_json() {
        let req: RotateKeyRequest = serde_json::from_value(json!({
            "new_alias": "K2",
            "key_material": "c2VjcmV0"
        }))
        .unwrap();
        assert_eq!(req.new_alias, "K2");
    }

    #[test]
    fn rotate_request_debug_hides_material() {
        let req = RotateKeyRequest {
            new_alias: "K2".into(),
            key_material: "super-secret-material".into(),
        };
        let dbg = format!("{req:?}");
        assert!(dbg.contains("K2"));
        assert!(!dbg.contains("super-secret-material"));
    }

    #[test]
    fn error_response_new() {
        let e = ErrorResponse::new("conflict", "alias already exists");
        assert_eq!(e.code, "conflict");
        assert!(e.message.contains("alias"));
    }

    #[test]
    fn key_status_serialises_aliases() {
        let s = KeyStatusResponse {
            active_alias: "K2".into(),
            aliases: vec!["K1".into(), "K2".into()],
        };
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["active_alias"], "K2");
        assert_eq!(v["aliases"][0], "K1");
    }
}
