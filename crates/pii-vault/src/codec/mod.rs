//! Field and blob codecs: the only code that turns plaintext into stored
//! ciphertext and back.
//!
//! Both codecs borrow key material from a shared [`KeyRing`](crate::keyring::KeyRing)
//! snapshot per call and never hold keys of their own.

pub mod blob;
pub mod field;

pub use blob::BlobCodec;
pub use field::{is_sealed, FieldCodec, MARKER, SEPARATOR};

use serde::Deserialize;
use thiserror::Error;

/// Errors produced by the codecs.
///
/// The `Display` text of the decryption variants is deliberately opaque;
/// aliases are available on the variant for internal logging only.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Malformed sealed value, empty blob, or a blob shorter than a nonce.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    /// The alias resolved but the authentication tag did not verify.
    #[error("decryption failed")]
    AuthenticationFailed { alias: String },

    /// No known key could open the value.
    #[error("decryption failed")]
    DecryptionExhausted,

    /// Sealing failed inside the AEAD.
    #[error("encryption failed")]
    Encryption,

    /// Reading a streamed payload failed.
    #[error("failed to read payload: {0}")]
    Io(#[from] std::io::Error),
}

/// What [`FieldCodec::open`] does when a sealed value names an alias the ring
/// does not hold and no other key opens it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedAliasPolicy {
    /// Return the stored value unchanged and log a warning.
    #[default]
    Passthrough,
    /// Fail with [`CodecError::DecryptionExhausted`].
    Reject,
}
