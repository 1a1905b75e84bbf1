//! Administrative key status and rotation.
//!
//! Rotation only adds a key and moves the active pointer. Existing ciphertext
//! is never touched; values sealed under a retired alias stay readable because
//! the alias is embedded in them and remains resolvable.

use common::protocol::{KeyStatusResponse, RotateKeyRequest};
use tracing::{info, warn};

use super::{KeyRing, KeyRingError};

/// Report the active alias and every known alias.
pub fn key_status(ring: &KeyRing) -> KeyStatusResponse {
    let snapshot = ring.snapshot();
    KeyStatusResponse {
        active_alias: snapshot.active_alias().to_string(),
        aliases: snapshot.aliases().iter().map(ToString::to_string).collect(),
    }
}

/// Rotate to the key described by `req` and report the resulting status.
///
/// # Errors
///
/// Propagates [`KeyRingError`] from [`KeyRing::rotate`]; the ring is left
/// unchanged on error.
pub fn rotate(ring: &KeyRing, req: &RotateKeyRequest) -> Result<KeyStatusResponse, KeyRingError> {
    match ring.rotate(&req.new_alias, req.key_material.as_bytes()) {
        Ok(alias) => {
            let status = key_status(ring);
            info!(
                active_alias = %alias,
                key_count = status.aliases.len(),
                "administrative rotation complete"
            );
            Ok(status)
        }
        Err(e) => {
            warn!(new_alias = %req.new_alias, error = %e, "administrative rotation rejected");
            Err(e)
        }
    }
}
