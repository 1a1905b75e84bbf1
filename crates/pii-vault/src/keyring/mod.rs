//! The key ring: every symmetric key known to the process, by alias, plus the
//! single alias currently used for new encryptions.
//!
//! # Lifecycle
//!
//! 1. At startup, [`KeyRing::from_config`] builds the ring from either an
//!    `alias:key,...` list (first valid entry active) or a single key under a
//!    default alias.
//! 2. Codecs take a [`KeySnapshot`] per operation. Snapshots are immutable, so
//!    one seal/open never observes two different ring states.
//! 3. [`KeyRing::rotate`] is the only writer. It builds a new snapshot with the
//!    extra key and swaps it in with a single pointer store.
//!
//! # Security invariants
//!
//! - Keys are never removed; a retired key stays resolvable for the life of
//!   the process.
//! - Key bytes never appear in logs, errors, or `Debug` output. Only aliases do.

pub mod key;
pub mod rotation;

pub use key::{KeyAlias, SecretKey};

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use arc_swap::ArcSwap;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::crypto::KEY_LEN;

/// Alias given to the development fallback key.
pub const DEV_ALIAS: &str = "dev";

/// Hardcoded development-only key. Never acceptable in production.
const DEV_KEY: &[u8; KEY_LEN] = b"pii-vault-dev-only-insecure-key!";

/// Errors produced by the key ring.
#[derive(Debug, Error)]
pub enum KeyRingError {
    /// Key material could not yield 32 bytes by any accepted interpretation.
    #[error("key material for alias {alias} is too weak: need at least {KEY_LEN} bytes")]
    WeakKey { alias: String },

    /// A key list was supplied but none of its entries were usable.
    #[error("no valid encryption keys configured")]
    NoValidKeys,

    /// Rotation named an alias that already exists in the ring.
    #[error("alias {0} already exists in the key ring")]
    DuplicateAlias(String),

    /// The alias is empty, too long, or contains disallowed characters.
    #[error("invalid key alias: {0:?}")]
    InvalidAlias(String),
}

/// Immutable view of the ring at one instant.
#[derive(Debug)]
pub struct KeySnapshot {
    active_alias: KeyAlias,
    active_key: Arc<SecretKey>,
    keys: HashMap<KeyAlias, Arc<SecretKey>>,
}

impl KeySnapshot {
    fn single(alias: KeyAlias, key: SecretKey) -> Self {
        let key = Arc::new(key);
        let mut keys = HashMap::new();
        keys.insert(alias.clone(), Arc::clone(&key));
        Self {
            active_alias: alias,
            active_key: key,
            keys,
        }
    }

    /// Alias of the key used for new encryptions.
    pub fn active_alias(&self) -> &KeyAlias {
        &self.active_alias
    }

    /// Key used for new encryptions.
    pub fn active_key(&self) -> &Arc<SecretKey> {
        &self.active_key
    }

    /// Look up a key by alias.
    pub fn resolve(&self, alias: &str) -> Option<&Arc<SecretKey>> {
        self.keys.get(alias)
    }

    /// Iterate every known key, active and legacy, in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&KeyAlias, &Arc<SecretKey>)> {
        self.keys.iter()
    }

    /// Iterate every key except the active one.
    pub fn legacy(&self) -> impl Iterator<Item = (&KeyAlias, &Arc<SecretKey>)> {
        self.keys
            .iter()
            .filter(move |(alias, _)| **alias != self.active_alias)
    }

    /// Every known alias, sorted.
    pub fn aliases(&self) -> Vec<KeyAlias> {
        let mut aliases: Vec<KeyAlias> = self.keys.keys().cloned().collect();
        aliases.sort();
        aliases
    }

    /// Number of keys held.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Always `false`: a snapshot holds at least the active key.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Shared, internally synchronised key ring.
///
/// Cheap to clone; all clones see the same keys. Reads are lock-free
/// ([`ArcSwap`]); rotations are serialised by a mutex that readers never touch.
#[derive(Clone, Debug)]
pub struct KeyRing {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    snapshot: ArcSwap<KeySnapshot>,
    rotation: Mutex<()>,
}

impl KeyRing {
    /// Create a ring holding one key, which is active.
    pub fn new(alias: KeyAlias, key: SecretKey) -> Self {
        Self::from_snapshot(KeySnapshot::single(alias, key))
    }

    fn from_snapshot(snapshot: KeySnapshot) -> Self {
        Self {
            inner: Arc::new(Inner {
                snapshot: ArcSwap::from_pointee(snapshot),
                rotation: Mutex::new(()),
            }),
        }
    }

    /// Build the ring from configuration.
    ///
    /// - `key_list` (`alias:key,alias:key,...`) wins when present; the first
    ///   valid entry becomes active and invalid entries are skipped with a
    ///   warning.
    /// - Otherwise `single_key` is loaded under `default_alias`.
    /// - With neither, the development fallback key is loaded under
    ///   [`DEV_ALIAS`] and an error-level warning is logged.
    ///
    /// # Errors
    ///
    /// Returns [`KeyRingError::NoValidKeys`] if `key_list` has no usable entry,
    /// or [`KeyRingError::WeakKey`] if `single_key` is too short.
    pub fn from_config(
        key_list: Option<&str>,
        single_key: Option<&str>,
        default_alias: &KeyAlias,
    ) -> Result<Self, KeyRingError> {
        if let Some(list) = key_list {
            return Self::from_list(list);
        }

        if let Some(material) = single_key {
            let key = SecretKey::derive(default_alias, material.as_bytes())?;
            info!(alias = %default_alias, "key ring initialised with a single key");
            return Ok(Self::new(default_alias.clone(), key));
        }

        error!(
            alias = DEV_ALIAS,
            "NO ENCRYPTION KEY CONFIGURED: using the hardcoded development key. \
             Data sealed now is readable by anyone with the source code."
        );
        let alias = KeyAlias::parse(DEV_ALIAS)?;
        Ok(Self::new(alias, SecretKey::from_bytes(*DEV_KEY)))
    }

    /// Parse an `alias:key,alias:key,...` list. The first valid entry is active.
    ///
    /// # Errors
    ///
    /// Returns [`KeyRingError::NoValidKeys`] if no entry is usable.
    pub fn from_list(list: &str) -> Result<Self, KeyRingError> {
        let mut snapshot: Option<KeySnapshot> = None;

        for (index, entry) in list.split(',').map(str::trim).enumerate() {
            if entry.is_empty() {
                continue;
            }
            let Some((raw_alias, material)) = entry.split_once(':') else {
                warn!(index, "key list entry is not of the form alias:key; skipping");
                continue;
            };
            let alias = match KeyAlias::parse(raw_alias.trim()) {
                Ok(a) => a,
                Err(e) => {
                    warn!(index, error = %e, "skipping key list entry");
                    continue;
                }
            };
            let key = match SecretKey::derive(&alias, material.trim().as_bytes()) {
                Ok(k) => k,
                Err(e) => {
                    warn!(index, error = %e, "skipping key list entry");
                    continue;
                }
            };

            match snapshot.as_mut() {
                None => snapshot = Some(KeySnapshot::single(alias, key)),
                Some(s) if s.keys.contains_key(&alias) => {
                    warn!(index, alias = %alias, "duplicate alias in key list; skipping");
                }
                Some(s) => {
                    s.keys.insert(alias, Arc::new(key));
                }
            }
        }

        let snapshot = snapshot.ok_or(KeyRingError::NoValidKeys)?;
        info!(
            active_alias = %snapshot.active_alias,
            key_count = snapshot.len(),
            "key ring initialised from key list"
        );
        Ok(Self::from_snapshot(snapshot))
    }

    /// Current immutable view of the ring. Lock-free.
    pub fn snapshot(&self) -> Arc<KeySnapshot> {
        self.inner.snapshot.load_full()
    }

    /// Alias of the active key.
    pub fn active_alias(&self) -> KeyAlias {
        self.inner.snapshot.load().active_alias.clone()
    }

    /// The active key.
    pub fn active_key(&self) -> Arc<SecretKey> {
        Arc::clone(&self.inner.snapshot.load().active_key)
    }

    /// Look up a key by alias.
    pub fn resolve(&self, alias: &str) -> Option<Arc<SecretKey>> {
        self.inner.snapshot.load().resolve(alias).cloned()
    }

    /// Copy of the alias → key mapping, for exhaustive fallback search.
    pub fn all_keys(&self) -> HashMap<KeyAlias, Arc<SecretKey>> {
        self.inner.snapshot.load().keys.clone()
    }

    /// Add a new key and make it active. The previous active key becomes legacy.
    ///
    /// Concurrent rotations are serialised; readers are never blocked and see
    /// either the old snapshot or the new one, never a mix.
    ///
    /// # Errors
    ///
    /// - [`KeyRingError::InvalidAlias`] if `new_alias` is malformed.
    /// - [`KeyRingError::DuplicateAlias`] if `new_alias` is already present.
    /// - [`KeyRingError::WeakKey`] if `material` is too short.
    pub fn rotate(&self, new_alias: &str, material: &[u8]) -> Result<KeyAlias, KeyRingError> {
        let alias = KeyAlias::parse(new_alias)?;

        let _guard = self
            .inner
            .rotation
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let current = self.inner.snapshot.load_full();
        if current.keys.contains_key(&alias) {
            return Err(KeyRingError::DuplicateAlias(alias.to_string()));
        }

        let key = Arc::new(SecretKey::derive(&alias, material)?);
        let mut keys = current.keys.clone();
        keys.insert(alias.clone(), Arc::clone(&key));

        self.inner.snapshot.store(Arc::new(KeySnapshot {
            active_alias: alias.clone(),
            active_key: key,
            keys,
        }));

        info!(
            previous_alias = %current.active_alias,
            active_alias = %alias,
            "encryption key rotated"
        );
        Ok(alias)
    }
}
