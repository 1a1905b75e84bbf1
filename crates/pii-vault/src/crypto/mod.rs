//! AES-256-GCM primitives.
//!
//! This module is intentionally free of key-ring, HTTP and storage concerns.
//! It provides the low-level seal/open operations used by the codecs.
//!
//! # Frame format
//!
//! ```text
//! nonce (12 bytes) ++ ciphertext ++ tag (16 bytes)
//! ```

pub mod cipher;

pub use cipher::{sealed_len, CipherError, KEY_LEN, NONCE_LEN, TAG_LEN};
