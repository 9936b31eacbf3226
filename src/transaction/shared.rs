//! Shared transaction handle - serializes all access to one transaction.
//!
//! `commit` and `rollback` read or write every participant in turn. If other
//! threads mutate participants while that sequence is in flight, some
//! participants can end up rolled back and others not. `SharedTransaction`
//! guards the snapshot list and the participant set with one mutex, and
//! offers `with_lock`/`atomically` so that caller mutations run under the
//! same mutex.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::state::CaptureError;
use crate::transaction::context::{Transaction, TransactionMetadata};
use crate::transaction::error::{PartialRollbackError, TransactionError};

/// A thread-safe handle to a transaction.
///
/// Can be shared across threads via Clone (uses Arc internally). Every
/// operation holds the transaction-wide lock for its whole duration.
#[derive(Clone)]
pub struct SharedTransaction {
    inner: Arc<Mutex<Transaction>>,
}

impl SharedTransaction {
    /// Wrap a transaction.
    pub fn new(tx: Transaction) -> Self {
        Self {
            inner: Arc::new(Mutex::new(tx)),
        }
    }

    /// Get the transaction ID.
    pub fn id(&self) -> String {
        self.inner.lock().id().to_string()
    }

    /// Snapshot of the transaction metadata.
    pub fn metadata(&self) -> TransactionMetadata {
        self.inner.lock().metadata().clone()
    }

    /// Commit under the transaction lock.
    pub fn commit(&self) -> Result<(), CaptureError> {
        self.inner.lock().commit()
    }

    /// Roll back under the transaction lock.
    pub fn rollback(&self) -> Result<(), PartialRollbackError> {
        self.inner.lock().rollback()
    }

    /// Run `f` while holding the transaction lock.
    ///
    /// Mutations made inside `f` cannot interleave with a commit or rollback
    /// issued through another handle.
    pub fn with_lock<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&mut Transaction) -> T,
    {
        let mut tx = self.inner.lock();
        f(&mut *tx)
    }

    /// Run `f` under the lock, then commit on `Ok` or roll back on `Err`,
    /// all before the lock is released.
    pub fn atomically<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Transaction) -> Result<T, E>,
        E: From<TransactionError>,
    {
        let mut tx = self.inner.lock();

        match f(&mut *tx) {
            Ok(value) => {
                tx.commit().map_err(TransactionError::from)?;
                Ok(value)
            }
            Err(e) => {
                tx.rollback().map_err(TransactionError::from)?;
                Err(e)
            }
        }
    }

    /// Unwrap the transaction if this is the last handle.
    pub fn try_unwrap(self) -> Result<Transaction, Self> {
        Arc::try_unwrap(self.inner)
            .map(|mutex| mutex.into_inner())
            .map_err(|inner| Self { inner })
    }
}

impl From<Transaction> for SharedTransaction {
    fn from(tx: Transaction) -> Self {
        Self::new(tx)
    }
}

impl std::fmt::Debug for SharedTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tx = self.inner.lock();
        f.debug_struct("SharedTransaction")
            .field("tx_id", &tx.id())
            .field("participants", &tx.len())
            .finish()
    }
}
