//! One-shot sweep that seals legacy plaintext left over from before at-rest
//! encryption was enabled.
//!
//! # Module invariants
//!
//! - Idempotent: a value that already carries the sealed-field marker is
//!   never rewritten, so a second run performs zero writes.
//! - A failure on one record is logged and counted; the sweep moves on.
//! - Cancellation is checked between records, never inside one.

pub mod controller;
pub mod store;

pub use controller::{MigrationController, SweepError};
pub use store::{MemoryRecordStore, RecordStore, StoreError};

use common::protocol::MigrationReportResponse;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn};
use uuid::Uuid;

use crate::codec::{is_sealed, CodecError, FieldCodec};

/// Leading fragment of a marker that lost its closing brace.
const PARTIAL_MARKER: &str = "{enc";

/// Outcome of one sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub run_id: Uuid,
    /// Records visited.
    pub scanned: usize,
    /// Records with at least one attribute rewritten.
    pub touched: usize,
    /// Records that raised an error.
    pub failed: usize,
    /// `true` if cancellation stopped the sweep before the last record.
    pub cancelled: bool,
}

impl From<SweepReport> for MigrationReportResponse {
    fn from(r: SweepReport) -> Self {
        Self {
            run_id: r.run_id,
            scanned: r.scanned,
            touched: r.touched,
            failed: r.failed,
            cancelled: r.cancelled,
        }
    }
}

#[derive(Debug, Error)]
enum RecordError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Seals every legacy-plaintext value of the configured attributes.
#[derive(Debug, Clone)]
pub struct MigrationSweep {
    codec: FieldCodec,
    attributes: Vec<String>,
}

impl MigrationSweep {
    /// `attributes` names every column that is encrypted at rest.
    pub fn new<I, S>(codec: FieldCodec, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            codec,
            attributes: attributes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// Visit every record in `store`, sealing legacy plaintext in place.
    ///
    /// # Errors
    ///
    /// Only listing the records can fail the sweep as a whole; per-record
    /// failures are counted in [`SweepReport::failed`].
    pub fn run(
        &self,
        store: &dyn RecordStore,
        cancel: &CancellationToken,
    ) -> Result<SweepReport, StoreError> {
        let mut report = SweepReport {
            run_id: Uuid::new_v4(),
            scanned: 0,
            touched: 0,
            failed: 0,
            cancelled: false,
        };
        let span = info_span!("migration_sweep", run_id = %report.run_id);
        let _enter = span.enter();

        let ids = store.record_ids()?;
        info!(
            records = ids.len(),
            attributes = ?self.attributes,
            "legacy plaintext sweep started"
        );

        for id in &ids {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            report.scanned += 1;
            match self.migrate_record(store, id) {
                Ok(true) => report.touched += 1,
                Ok(false) => {}
                Err(e) => {
                    report.failed += 1;
                    warn!(record_id = %id, error = %e, "failed to migrate record; continuing");
                }
            }
        }

        info!(
            scanned = report.scanned,
            touched = report.touched,
            failed = report.failed,
            cancelled = report.cancelled,
            "legacy plaintext sweep finished"
        );
        Ok(report)
    }

    /// Returns `true` if any attribute of the record was rewritten.
    fn migrate_record(&self, store: &dyn RecordStore, id: &str) -> Result<bool, RecordError> {
        let mut touched = false;
        for attribute in &self.attributes {
            let Some(value) = store.read(id, attribute)? else {
                continue;
            };
            if is_sealed(&value) {
                continue;
            }
            let sealed = self.codec.seal(strip_partial_marker(&value))?;
            store.write(id, attribute, sealed)?;
            touched = true;
        }
        Ok(touched)
    }
}

/// Drop a leading `{enc` fragment that is not a complete marker.
fn strip_partial_marker(value: &str) -> &str {
    if is_sealed(value) {
        return value;
    }
    value.strip_prefix(PARTIAL_MARKER).unwrap_or(value)
}
