//! `pii-vault`: at-rest encryption for personally identifiable information.
//!
//! - [`keyring`] holds named AES-256 keys, one of them active.
//! - [`codec`] seals text fields (`{enc}<alias>:<payload>`) and binary blobs.
//! - [`migration`] seals legacy plaintext left in an existing store.
//! - [`server`] exposes health, key rotation and the migration sweep over HTTP.

pub mod codec;
pub mod config;
pub mod crypto;
pub mod keyring;
pub mod migration;
pub mod server;
pub mod telemetry;
