//! Common types, protocol definitions, and errors shared across `pii-vault` crates.

pub mod error;
pub mod protocol;

pub use error::ServiceError;
