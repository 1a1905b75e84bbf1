//! Configuration loading and validation for the pii-vault service.
//!
//! All values are read from environment variables at startup. The process will
//! exit with a clear error message if any required variable is missing or invalid.

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::codec::UnresolvedAliasPolicy;
use crate::keyring::{KeyAlias, KeyRing};

/// Validated service configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Comma-separated `alias:key` list; the first valid entry is active.
    #[serde(default)]
    pub encryption_keys: Option<String>,

    /// Single key, used when `ENCRYPTION_KEYS` is absent.
    #[serde(default)]
    pub encryption_key: Option<String>,

    /// Alias assigned to `ENCRYPTION_KEY`.
    #[serde(default = "default_key_alias")]
    pub default_key_alias: String,

    /// Permit the hardcoded development key when no key is configured.
    #[serde(default)]
    pub allow_dev_key: bool,

    /// Behaviour when a sealed field names an alias no key can open.
    #[serde(default)]
    pub unresolved_alias_policy: UnresolvedAliasPolicy,

    /// Comma-separated attribute names swept by `POST /admin/migrations`.
    #[serde(default)]
    pub migration_attributes: Option<String>,

    /// Port the administrative HTTP server listens on.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// PEM certificate chain; with `TLS_KEY_PATH`, enables HTTPS.
    #[serde(default)]
    pub tls_cert_path: Option<String>,

    /// PEM private key; with `TLS_CERT_PATH`, enables HTTPS.
    #[serde(default)]
    pub tls_key_path: Option<String>,

    /// OTLP endpoint. Trace export is disabled when unset.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redacted = |v: &Option<String>| v.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("Config")
            .field("encryption_keys", &redacted(&self.encryption_keys))
            .field("encryption_key", &redacted(&self.encryption_key))
            .field("default_key_alias", &self.default_key_alias)
            .field("allow_dev_key", &self.allow_dev_key)
            .field("unresolved_alias_policy", &self.unresolved_alias_policy)
            .field("migration_attributes", &self.migration_attributes)
            .field("listen_port", &self.listen_port)
            .field("tls_cert_path", &self.tls_cert_path)
            .field("tls_key_path", &self.tls_key_path)
            .field("otel_exporter_otlp_endpoint", &self.otel_exporter_otlp_endpoint)
            .field("log_level", &self.log_level)
            .finish()
    }
}

fn default_key_alias() -> String {
    "default".into()
}
fn default_listen_port() -> u16 {
    8080
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable cannot be parsed or fails validation.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        KeyAlias::parse(&self.default_key_alias).context("DEFAULT_KEY_ALIAS is invalid")?;

        if self.encryption_keys.is_none() && self.encryption_key.is_none() && !self.allow_dev_key {
            anyhow::bail!(
                "ENCRYPTION_KEYS or ENCRYPTION_KEY is required (set ALLOW_DEV_KEY=true for local development only)"
            );
        }
        if self.tls_cert_path.is_some() != self.tls_key_path.is_some() {
            anyhow::bail!("TLS_CERT_PATH and TLS_KEY_PATH must be set together");
        }
        if self.listen_port == 0 {
            anyhow::bail!("LISTEN_PORT must be > 0");
        }
        Ok(())
    }

    /// Build the key ring described by this configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured keys are unusable.
    pub fn key_ring(&self) -> Result<KeyRing> {
        let default_alias = KeyAlias::parse(&self.default_key_alias)?;
        KeyRing::from_config(
            self.encryption_keys.as_deref(),
            self.encryption_key.as_deref(),
            &default_alias,
        )
        .context("failed to initialise the encryption key ring")
    }

    /// Attribute names for the migration sweep.
    pub fn migration_attributes(&self) -> Vec<String> {
        self.migration_attributes
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_owned)
            .collect()
    }

    /// PEM paths, if TLS is enabled.
    pub fn tls_paths(&self) -> Option<(&str, &str)> {
        Some((self.tls_cert_path.as_deref()?, self.tls_key_path.as_deref()?))
    }
}
