//! Blob codec: binary payloads (uploaded documents, images).
//!
//! Sealed blobs are `nonce(12) ++ ciphertext ++ tag(16)` with no alias, so
//! opening tries the active key first and then every legacy key.
//!
//! The reader variants buffer the whole payload before transforming it.
//! That is fine for documents and images; it is not meant for multi-gigabyte
//! streams.

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, error};

use super::CodecError;
use crate::crypto::{self, cipher, NONCE_LEN};
use crate::keyring::KeyRing;

/// Seals and opens binary payloads using a shared [`KeyRing`].
#[derive(Clone, Debug)]
pub struct BlobCodec {
    ring: KeyRing,
}

impl BlobCodec {
    pub fn new(ring: KeyRing) -> Self {
        Self { ring }
    }

    /// Size of the sealed blob for a plaintext of `plaintext_len` bytes.
    ///
    /// Useful for content-length headers without sealing anything.
    pub const fn sealed_size(plaintext_len: usize) -> usize {
        crypto::sealed_len(plaintext_len)
    }

    /// Seal `plaintext` under the active key.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidInput`] for an empty payload and
    /// [`CodecError::Encryption`] if the AEAD fails.
    pub fn seal_blob(&self, plaintext: &[u8]) -> Result<Vec<u8>, CodecError> {
        if plaintext.is_empty() {
            return Err(CodecError::InvalidInput("blob is empty"));
        }
        let key = self.ring.active_key();
        cipher::seal(plaintext, key.as_bytes()).map_err(|_| CodecError::Encryption)
    }

    /// Open a sealed blob, trying the active key and then every legacy key.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidInput`] if `sealed` is shorter than a
    /// nonce, and [`CodecError::DecryptionExhausted`] if no key opens it.
    pub fn open_blob(&self, sealed: &[u8]) -> Result<Vec<u8>, CodecError> {
        if sealed.len() < NONCE_LEN {
            return Err(CodecError::InvalidInput("blob is shorter than a nonce"));
        }

        let snapshot = self.ring.snapshot();
        if let Ok(plaintext) = cipher::open(sealed, snapshot.active_key().as_bytes()) {
            return Ok(plaintext);
        }

        for (alias, key) in snapshot.legacy() {
            if let Ok(plaintext) = cipher::open(sealed, key.as_bytes()) {
                debug!(alias = %alias, "blob opened with legacy key");
                return Ok(plaintext);
            }
        }

        error!(
            blob_len = sealed.len(),
            keys_tried = snapshot.len(),
            "no known key opens sealed blob"
        );
        Err(CodecError::DecryptionExhausted)
    }

    /// Buffer `reader` to the end and seal it.
    ///
    /// # Errors
    ///
    /// As [`seal_blob`](Self::seal_blob), plus [`CodecError::Io`] on read failure.
    pub async fn seal_reader<R>(&self, mut reader: R) -> Result<Bytes, CodecError>
    where
        R: AsyncRead + Unpin,
    {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        self.seal_blob(&buf).map(Bytes::from)
    }

    /// Buffer `reader` to the end and open it.
    ///
    /// # Errors
    ///
    /// As [`open_blob`](Self::open_blob), plus [`CodecError::Io`] on read failure.
    pub async fn open_reader<R>(&self, mut reader: R) -> Result<Bytes, CodecError>
    where
        R: AsyncRead + Unpin,
    {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        self.open_blob(&buf).map(Bytes::from)
    }
}
