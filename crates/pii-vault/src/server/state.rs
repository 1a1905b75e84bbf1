//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::codec::FieldCodec;
use crate::keyring::KeyRing;
use crate::migration::{MigrationController, MigrationSweep, RecordStore};

/// Application state shared across all request handlers.
///
/// All fields are cheaply cloneable (`Arc`-wrapped or already `Arc`-backed) so
/// that Axum can clone the state for each request without copying key material.
#[derive(Clone)]
pub struct AppState {
    /// The process-wide key ring; rotated in place by the admin endpoint.
    pub key_ring: KeyRing,
    /// Sweep definition: codec plus the encrypted attribute names.
    pub sweep: Arc<MigrationSweep>,
    /// Serialises sweeps and carries their cancellation tokens.
    pub migrations: MigrationController,
    /// Persistence layer supplied by the host. `None` disables migrations.
    pub record_store: Option<Arc<dyn RecordStore>>,
}

impl AppState {
    /// Create state around `codec`, sweeping `migration_attributes` on request.
    pub fn new(
        codec: FieldCodec,
        migration_attributes: Vec<String>,
        migrations: MigrationController,
    ) -> Self {
        Self {
            key_ring: codec.key_ring().clone(),
            sweep: Arc::new(MigrationSweep::new(codec, migration_attributes)),
            migrations,
            record_store: None,
        }
    }

    /// Attach the host's record store so `POST /admin/migrations` can run.
    pub fn with_record_store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.record_store = Some(store);
        self
    }
}
