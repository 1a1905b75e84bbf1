//! [`MigrationController`]: runs at most one sweep at a time on the blocking
//! pool and lets an operator cancel it.

use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{MigrationSweep, RecordStore, StoreError, SweepReport};

/// Errors from starting or awaiting a sweep.
#[derive(Debug, Error)]
pub enum SweepError {
    /// Another sweep is still in flight.
    #[error("a migration sweep is already running")]
    AlreadyRunning,

    /// The record store could not list records.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The sweep task panicked or was aborted.
    #[error("migration sweep task aborted: {0}")]
    Aborted(String),
}

/// Serialises sweeps and exposes cooperative cancellation.
///
/// Cheap to clone; clones share the in-flight slot. Every run gets a child of
/// the controller's root token, so cancelling the root (e.g. at shutdown)
/// also stops a running sweep.
#[derive(Clone, Debug, Default)]
pub struct MigrationController {
    root: CancellationToken,
    running: Arc<Mutex<Option<CancellationToken>>>,
}

/// Clears the in-flight slot when dropped.
struct RunningGuard {
    running: Arc<Mutex<Option<CancellationToken>>>,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        *self.running.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl MigrationController {
    /// Create a controller whose sweeps stop when `root` is cancelled.
    pub fn new(root: CancellationToken) -> Self {
        Self {
            root,
            running: Arc::default(),
        }
    }

    /// `true` while a sweep is in flight.
    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Request cancellation of the running sweep. Returns `false` if none is running.
    pub fn cancel(&self) -> bool {
        match self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            Some(token) => {
                info!("migration sweep cancellation requested");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Run `sweep` against `store` on the blocking pool and wait for its report.
    ///
    /// # Errors
    ///
    /// - [`SweepError::AlreadyRunning`] if another sweep is in flight.
    /// - [`SweepError::Store`] if the store cannot list records.
    /// - [`SweepError::Aborted`] if the sweep task panicked.
    pub async fn run(
        &self,
        sweep: Arc<MigrationSweep>,
        store: Arc<dyn RecordStore>,
    ) -> Result<SweepReport, SweepError> {
        let token = {
            let mut slot = self.running.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.is_some() {
                return Err(SweepError::AlreadyRunning);
            }
            let token = self.root.child_token();
            *slot = Some(token.clone());
            token
        };
        let guard = RunningGuard {
            running: Arc::clone(&self.running),
        };

        // The guard moves into the task: the slot stays taken until the sweep
        // itself ends, even if the caller stops waiting.
        let report = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            sweep.run(store.as_ref(), &token)
        })
        .await
        .map_err(|e| SweepError::Aborted(e.to_string()))??;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::FieldCodec;
    use crate::crypto::KEY_LEN;
    use crate::keyring::{KeyAlias, KeyRing, SecretKey};
    use crate::migration::MemoryRecordStore;
    use std::time::Duration;

    fn sweep() -> Arc<MigrationSweep> {
        let codec = FieldCodec::new(KeyRing::new(
            KeyAlias::parse("K1").unwrap(),
            SecretKey::from_bytes([1u8; KEY_LEN]),
        ));
        Arc::new(MigrationSweep::new(codec, ["email"]))
    }

    /// Store whose listing blocks until released, so a sweep stays in flight.
    struct SlowStore {
        inner: MemoryRecordStore,
        release: std::sync::mpsc::Receiver<()>,
    }

    // `Receiver` is `Send` but not `Sync`; wrap it for the trait bound.
    struct SyncSlowStore(Mutex<SlowStore>);

    impl RecordStore for SyncSlowStore {
        fn record_ids(&self) -> Result<Vec<String>, StoreError> {
            let store = self.0.lock().unwrap();
            let _ = store.release.recv_timeout(Duration::from_secs(5));
            store.inner.record_ids()
        }
        fn read(&self, id: &str, attribute: &str) -> Result<Option<String>, StoreError> {
            self.0.lock().unwrap().inner.read(id, attribute)
        }
        fn write(&self, id: &str, attribute: &str, value: String) -> Result<(), StoreError> {
            self.0.lock().unwrap().inner.write(id, attribute, value)
        }
    }

    #[tokio::test]
    async fn runs_sweep_and_clears_slot() {
        let store = Arc::new(MemoryRecordStore::new());
        store.insert("u1", "email", "a@example.com");
        let controller = MigrationController::default();
        let report = controller.run(sweep(), store.clone()).await.unwrap();
        assert_eq!(report.touched, 1);
        assert!(!controller.is_running());
        assert!(!controller.cancel());
    }

    #[tokio::test]
    async fn rejects_concurrent_sweep_and_cancels() {
        let (tx, rx) = std::sync::mpsc::channel();
        let inner = MemoryRecordStore::new();
        inner.insert("u1", "email", "a@example.com");
        let store: Arc<dyn RecordStore> = Arc::new(SyncSlowStore(Mutex::new(SlowStore {
            inner,
            release: rx,
        })));

        let controller = MigrationController::default();
        let first = {
            let controller = controller.clone();
            let store = Arc::clone(&store);
            tokio::spawn(async move { controller.run(sweep(), store).await })
        };

        while !controller.is_running() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(matches!(
            controller.run(sweep(), Arc::clone(&store)).await,
            Err(SweepError::AlreadyRunning)
        ));

        assert!(controller.cancel());
        tx.send(()).unwrap();
        let report = first.await.unwrap().unwrap();
        assert!(report.cancelled);
        assert_eq!(report.touched, 0);
        assert!(!controller.is_running());
    }

    #[tokio::test]
    async fn root_cancellation_reaches_running_sweep() {
        let root = CancellationToken::new();
        let controller = MigrationController::new(root.clone());
        root.cancel();
        let store = Arc::new(MemoryRecordStore::new());
        store.insert("u1", "email", "a@example.com");
        let report = controller.run(sweep(), store).await.unwrap();
        assert!(report.cancelled);
    }
}
