//! [`SecretKey`] and [`KeyAlias`]: the two values a key ring is made of.

use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine as _,
};
use std::fmt;
use tracing::warn;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::KeyRingError;
use crate::crypto::KEY_LEN;

/// Longest alias accepted by [`KeyAlias::parse`].
pub const MAX_ALIAS_LEN: usize = 64;

/// Standard alphabet, trailing `=` padding optional.
const KEY_MATERIAL_B64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// A 256-bit symmetric key.
///
/// Immutable once built. The bytes are zeroed on drop and never appear in
/// `Debug` output.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretKey([u8; KEY_LEN]);

impl SecretKey {
    /// Wrap exactly [`KEY_LEN`] raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Derive a key from operator-supplied material.
    ///
    /// Tried in order:
    /// 1. exactly [`KEY_LEN`] raw bytes, used as-is;
    /// 2. standard base64, padded or not, decoding to at least [`KEY_LEN`]
    ///    bytes, truncated;
    /// 3. UTF-8 text of at least [`KEY_LEN`] bytes, truncated (logged as a
    ///    misconfiguration).
    ///
    /// `alias` is only used for diagnostics.
    ///
    /// # Errors
    ///
    /// Returns [`KeyRingError::WeakKey`] if no path yields [`KEY_LEN`] bytes.
    pub fn derive(alias: &KeyAlias, material: &[u8]) -> Result<Self, KeyRingError> {
        if material.len() == KEY_LEN {
            return Ok(Self(first_key_bytes(material)));
        }

        if let Ok(text) = std::str::from_utf8(material) {
            if let Ok(mut decoded) = KEY_MATERIAL_B64.decode(text.trim()) {
                if decoded.len() >= KEY_LEN {
                    let key = Self(first_key_bytes(&decoded));
                    decoded.zeroize();
                    return Ok(key);
                }
            }

            if text.len() >= KEY_LEN {
                warn!(
                    alias = %alias,
                    "key material is neither 32 raw bytes nor base64; using its UTF-8 bytes"
                );
                return Ok(Self(first_key_bytes(text.as_bytes())));
            }
        }

        Err(KeyRingError::WeakKey {
            alias: alias.to_string(),
        })
    }

    /// Borrow the raw key bytes for a cipher call.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey([REDACTED])")
    }
}

fn first_key_bytes(src: &[u8]) -> [u8; KEY_LEN] {
    let mut buf = [0u8; KEY_LEN];
    buf.copy_from_slice(&src[..KEY_LEN]);
    buf
}

/// Short operator-assigned identifier for a key, e.g. `K1`.
///
/// Restricted to `[A-Za-z0-9_.-]` so it can be embedded in a sealed field
/// value without clashing with the marker or the separator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyAlias(String);

impl KeyAlias {
    /// Validate and wrap an alias.
    ///
    /// # Errors
    ///
    /// Returns [`KeyRingError::InvalidAlias`] if `raw` is empty, longer than
    /// [`MAX_ALIAS_LEN`], or contains characters outside `[A-Za-z0-9_.-]`.
    pub fn parse(raw: &str) -> Result<Self, KeyRingError> {
        let valid = !raw.is_empty()
            && raw.len() <= MAX_ALIAS_LEN
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
        if !valid {
            return Err(KeyRingError::InvalidAlias(raw.to_owned()));
        }
        Ok(Self(raw.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::borrow::Borrow<str> for KeyAlias {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};

    fn alias() -> KeyAlias {
        KeyAlias::parse("K1").unwrap()
    }

    #[test]
    fn raw_32_bytes_used_verbatim() {
        let material = [0xABu8; KEY_LEN];
        let key = SecretKey::derive(&alias(), &material).unwrap();
        assert_eq!(key.as_bytes(), &material);
    }

    #[test]
    fn base64_material_is_decoded() {
        let raw = [0x11u8; KEY_LEN];
        let encoded = STANDARD.encode(raw);
        let key = SecretKey::derive(&alias(), encoded.as_bytes()).unwrap();
        assert_eq!(key.as_bytes(), &raw);
    }

    #[test]
    fn unpadded_base64_material_is_decoded() {
        let raw = [0x11u8; KEY_LEN];
        let encoded = STANDARD_NO_PAD.encode(raw);
        assert_eq!(encoded.len(), 43);
        let key = SecretKey::derive(&alias(), encoded.as_bytes()).unwrap();
        assert_eq!(key.as_bytes(), &raw);
    }

    #[test]
    fn long_base64_material_is_truncated() {
        let mut raw = vec![0x22u8; KEY_LEN];
        raw.extend_from_slice(&[0x33u8; 16]);
        let encoded = STANDARD.encode(&raw);
        let key = SecretKey::derive(&alias(), encoded.as_bytes()).unwrap();
        assert_eq!(key.as_bytes(), &raw[..KEY_LEN]);
    }

    #[test]
    fn long_text_falls_back_to_utf8() {
        let text = "this is a human typed secret that is long enough!";
        let key = SecretKey::derive(&alias(), text.as_bytes()).unwrap();
        assert_eq!(key.as_bytes(), &text.as_bytes()[..KEY_LEN]);
    }

    #[test]
    fn short_material_is_weak() {
        let err = SecretKey::derive(&alias(), b"too-short").unwrap_err();
        assert!(matches!(err, KeyRingError::WeakKey { ref alias } if alias == "K1"));
    }

    #[test]
    fn short_base64_is_weak() {
        // 16 bytes of base64-decoded material is not enough, and the text itself is < 32 bytes.
        let encoded = STANDARD.encode([0u8; 16]);
        assert!(SecretKey::derive(&alias(), encoded.as_bytes()).is_err());
    }

    #[test]
    fn debug_is_redacted() {
        let key = SecretKey::from_bytes([0xFFu8; KEY_LEN]);
        let dbg = format!("{key:?}");
        assert!(dbg.contains("REDACTED"));
        assert!(!dbg.contains("255"));
    }

    #[test]
    fn alias_validation() {
        assert!(KeyAlias::parse("K1").is_ok());
        assert!(KeyAlias::parse("prod-2024.q3_a").is_ok());
        assert!(KeyAlias::parse("").is_err());
        assert!(KeyAlias::parse("has:colon").is_err());
        assert!(KeyAlias::parse("has space").is_err());
        assert!(KeyAlias::parse(&"x".repeat(MAX_ALIAS_LEN + 1)).is_err());
    }
}
