//! Transaction error types.

use thiserror::Error;

use crate::state::{CaptureError, RestoreError};

/// Result type for transaction operations.
pub type TransactionResult<T> = Result<T, TransactionError>;

/// Errors that can occur during transaction operations.
#[derive(Debug, Error)]
pub enum TransactionError {
    /// A transaction was requested over zero participants.
    #[error("transaction requires at least one participant")]
    EmptyTransaction,

    /// A participant's state could not be captured.
    #[error("capture failed: {0}")]
    Capture(#[from] CaptureError),

    /// One or more participants were not restored by a rollback.
    #[error(transparent)]
    PartialRollback(#[from] PartialRollbackError),
}

impl TransactionError {
    /// Check if this error comes from calling the API wrongly rather than
    /// from participant state.
    pub fn is_usage_error(&self) -> bool {
        matches!(self, TransactionError::EmptyTransaction)
    }

    /// Labels of participants left unrestored, if this is a rollback failure.
    pub fn failed_participants(&self) -> Vec<&str> {
        match self {
            TransactionError::PartialRollback(e) => e.failed_participants(),
            _ => Vec::new(),
        }
    }
}

/// One participant that a rollback could not restore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackFailure {
    /// Position in the transaction's participant list.
    pub index: usize,
    /// Participant label.
    pub participant: String,
    /// Why the restore failed.
    pub error: RestoreError,
}

/// A rollback that restored some participants but not all of them.
///
/// Every participant was attempted; `failures` lists the ones that were not
/// restored, in participant-list order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("rollback left {} of {total} participant(s) unrestored: {}", .failures.len(), failures_display(.failures))]
pub struct PartialRollbackError {
    /// Number of participants in the transaction.
    pub total: usize,
    /// Participants that were not restored.
    pub failures: Vec<RollbackFailure>,
}

impl PartialRollbackError {
    pub fn failed_participants(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.participant.as_str()).collect()
    }

    /// Number of participants that were restored.
    pub fn restored(&self) -> usize {
        self.total - self.failures.len()
    }
}

fn failures_display(failures: &[RollbackFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("#{} {} ({})", f.index, f.participant, f.error))
        .collect::<Vec<_>>()
        .join(", ")
}
