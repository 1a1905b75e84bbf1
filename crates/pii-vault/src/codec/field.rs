//! Field codec: plaintext strings ↔ self-describing sealed strings.
//!
//! # Sealed format
//!
//! ```text
//! {enc}<alias>:<base64url-no-pad(nonce ++ ciphertext ++ tag)>
//! ```
//!
//! Values without the `{enc}` marker are legacy plaintext and pass through
//! [`FieldCodec::open`] untouched until the migration sweep rewrites them.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use tracing::{error, warn};

use super::{CodecError, UnresolvedAliasPolicy};
use crate::crypto::{cipher, NONCE_LEN, TAG_LEN};
use crate::keyring::KeyRing;

/// Prefix that appears at the start of every sealed field value.
pub const MARKER: &str = "{enc}";

/// Separates the alias from the base64 payload.
pub const SEPARATOR: char = ':';

/// Returns `true` if `value` carries the sealed-field marker.
pub fn is_sealed(value: &str) -> bool {
    value.starts_with(MARKER)
}

/// Seals and opens text fields using a shared [`KeyRing`].
#[derive(Clone, Debug)]
pub struct FieldCodec {
    ring: KeyRing,
    policy: UnresolvedAliasPolicy,
}

impl FieldCodec {
    /// Create a codec with the default [`UnresolvedAliasPolicy::Passthrough`].
    pub fn new(ring: KeyRing) -> Self {
        Self {
            ring,
            policy: UnresolvedAliasPolicy::default(),
        }
    }

    /// Replace the unresolved-alias policy.
    pub fn with_policy(mut self, policy: UnresolvedAliasPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn key_ring(&self) -> &KeyRing {
        &self.ring
    }

    /// Seal `plaintext` under the active key.
    ///
    /// A value that already carries [`MARKER`] is returned unchanged, so
    /// sealing twice never double-encrypts. This includes plaintext that merely
    /// starts with `{enc}`: such a value is stored as-is and [`open`](Self::open)
    /// rejects it as malformed, so it does not round-trip.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Encryption`] if the AEAD fails.
    pub fn seal(&self, plaintext: &str) -> Result<String, CodecError> {
        if is_sealed(plaintext) {
            return Ok(plaintext.to_owned());
        }

        let snapshot = self.ring.snapshot();
        let framed = cipher::seal(plaintext.as_bytes(), snapshot.active_key().as_bytes())
            .map_err(|_| CodecError::Encryption)?;

        Ok(format!(
            "{MARKER}{}{SEPARATOR}{}",
            snapshot.active_alias(),
            URL_SAFE_NO_PAD.encode(framed),
        ))
    }

    /// [`seal`](Self::seal) for optional columns; `None` passes through.
    pub fn seal_opt(&self, plaintext: Option<&str>) -> Result<Option<String>, CodecError> {
        plaintext.map(|p| self.seal(p)).transpose()
    }

    /// Open a stored value.
    ///
    /// - No marker: legacy plaintext, returned as-is.
    /// - Known alias: decrypted with that key; a failed tag check is
    ///   [`CodecError::AuthenticationFailed`].
    /// - Unknown alias: every key in the ring is tried. If none opens the
    ///   value, the configured [`UnresolvedAliasPolicy`] decides between
    ///   returning `stored` unchanged and [`CodecError::DecryptionExhausted`].
    ///
    /// # Errors
    ///
    /// Also returns [`CodecError::InvalidInput`] for a marked value that is
    /// not `alias:base64` or whose payload is too short.
    pub fn open(&self, stored: &str) -> Result<String, CodecError> {
        let Some(body) = stored.strip_prefix(MARKER) else {
            return Ok(stored.to_owned());
        };

        let (alias, payload) = body
            .split_once(SEPARATOR)
            .ok_or(CodecError::InvalidInput("sealed field has no alias separator"))?;
        let framed = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| CodecError::InvalidInput("sealed field payload is not base64url"))?;
        if framed.len() < NONCE_LEN + TAG_LEN {
            return Err(CodecError::InvalidInput("sealed field payload is truncated"));
        }

        let snapshot = self.ring.snapshot();

        if let Some(key) = snapshot.resolve(alias) {
            let plaintext = cipher::open(&framed, key.as_bytes()).map_err(|_| {
                error!(alias, "sealed field failed authentication");
                CodecError::AuthenticationFailed {
                    alias: alias.to_owned(),
                }
            })?;
            return into_utf8(plaintext);
        }

        for (candidate, key) in snapshot.iter() {
            if let Ok(plaintext) = cipher::open(&framed, key.as_bytes()) {
                warn!(alias, opened_with = %candidate, "sealed field alias unknown; opened by fallback search");
                return into_utf8(plaintext);
            }
        }

        match self.policy {
            UnresolvedAliasPolicy::Passthrough => {
                warn!(alias, "no known key opens sealed field; returning stored value unchanged");
                Ok(stored.to_owned())
            }
            UnresolvedAliasPolicy::Reject => {
                error!(alias, "no known key opens sealed field");
                Err(CodecError::DecryptionExhausted)
            }
        }
    }

    /// [`open`](Self::open) for optional columns; `None` passes through.
    pub fn open_opt(&self, stored: Option<&str>) -> Result<Option<String>, CodecError> {
        stored.map(|s| self.open(s)).transpose()
    }
}

fn into_utf8(plaintext: Vec<u8>) -> Result<String, CodecError> {
    String::from_utf8(plaintext)
        .map_err(|_| CodecError::InvalidInput("decrypted field is not valid UTF-8"))
}
