//! AES-256-GCM sealing and opening of byte payloads.
//!
//! Every call to [`seal`] draws a fresh 96-bit nonce from the OS CSPRNG.
//! GCM nonce reuse under one key breaks both confidentiality and
//! authentication, so callers never supply a nonce.

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use thiserror::Error;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of an AES-GCM nonce (12 bytes = 96 bits).
pub const NONCE_LEN: usize = 12;

/// Byte length of the GCM authentication tag (16 bytes = 128 bits).
pub const TAG_LEN: usize = 16;

/// Errors produced by the cipher layer.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The key is the wrong length (must be [`KEY_LEN`] bytes).
    #[error("invalid key length: expected {KEY_LEN} bytes")]
    InvalidKeyLength,

    /// The framed input is shorter than a nonce.
    #[error("sealed payload shorter than nonce")]
    Truncated,

    /// AES-GCM encryption or decryption failed (wrong key or tampered data).
    #[error("aead operation failed")]
    AeadFailure,
}

/// Encrypt `plaintext` under `key` and return `nonce ++ ciphertext ++ tag`.
///
/// # Errors
///
/// Returns [`CipherError::InvalidKeyLength`] if `key` is not [`KEY_LEN`] bytes.
/// Returns [`CipherError::AeadFailure`] on an internal AEAD error.
pub fn seal(plaintext: &[u8], key: &[u8]) -> Result<Vec<u8>, CipherError> {
    let cipher = build_cipher(key)?;

    use aes_gcm::aead::rand_core::RngCore;
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| CipherError::AeadFailure)?;

    let mut framed = Vec::with_capacity(sealed_len(plaintext.len()));
    framed.extend_from_slice(&nonce_bytes);
    framed.extend_from_slice(&ciphertext);
    Ok(framed)
}

/// Decrypt a `nonce ++ ciphertext ++ tag` frame produced by [`seal`].
///
/// # Errors
///
/// Returns [`CipherError::Truncated`] if `framed` is shorter than [`NONCE_LEN`].
/// Returns [`CipherError::AeadFailure`] if authentication fails.
pub fn open(framed: &[u8], key: &[u8]) -> Result<Vec<u8>, CipherError> {
    if framed.len() < NONCE_LEN {
        return Err(CipherError::Truncated);
    }
    let cipher = build_cipher(key)?;
    let (nonce_bytes, ciphertext) = framed.split_at(NONCE_LEN);
    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| CipherError::AeadFailure)
}

/// Length of the frame [`seal`] produces for a plaintext of `plaintext_len` bytes.
pub const fn sealed_len(plaintext_len: usize) -> usize {
    NONCE_LEN + plaintext_len + TAG_LEN
}

fn build_cipher(key: &[u8]) -> Result<Aes256Gcm, CipherError> {
    if key.len() != KEY_LEN {
        return Err(CipherError::InvalidKeyLength);
    }
    Aes256Gcm::new_from_slice(key).map_err(|_| CipherError::InvalidKeyLength)
}
