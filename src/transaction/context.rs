//! Transaction context.
//!
//! A [`Transaction`] owns one snapshot per participant, index-aligned with a
//! participant list that is fixed at construction. The lifecycle is linear:
//! capture on construction, then any number of `commit`/`rollback` calls.
//! There is no terminal state; a transaction stays valid until dropped.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, debug_span, warn};
use ulid::Ulid;

use crate::state::{CaptureError, CopyMode, ParticipantRef, Snapshot};
use crate::transaction::config::TransactionConfig;
use crate::transaction::error::{
    PartialRollbackError, RollbackFailure, TransactionError, TransactionResult,
};

/// Transaction metadata, exposed for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct TransactionMetadata {
    /// Unique transaction ID.
    pub tx_id: String,
    /// Name from the configuration, if any.
    pub name: Option<String>,
    /// Copy mode applied to every participant.
    pub mode: CopyMode,
    /// Number of participants.
    pub participants: usize,
    /// When the transaction was created.
    pub started_at: DateTime<Utc>,
    /// When the current rollback point was captured.
    pub committed_at: DateTime<Utc>,
    /// Successful commits since creation.
    pub commits: u64,
    /// Rollbacks attempted since creation.
    pub rollbacks: u64,
}

/// A snapshot-based transaction over a fixed set of participants.
///
/// Participants are shared handles: callers mutate them directly between
/// calls, and the transaction only reads them on `commit` and overwrites
/// them on `rollback`. Each participant's lock is held only while that
/// participant is captured or restored, so a caller must not hold a
/// participant's lock across a `commit` or `rollback` call on the same
/// thread. Use [`SharedTransaction`](crate::transaction::SharedTransaction)
/// when several threads drive one transaction.
#[derive(Debug)]
pub struct Transaction {
    metadata: TransactionMetadata,
    participants: Vec<ParticipantRef>,
    snapshots: Vec<Snapshot>,
}

impl Transaction {
    /// Create a transaction and capture every participant.
    ///
    /// Fails with [`TransactionError::EmptyTransaction`] when `participants`
    /// is empty, and with [`TransactionError::Capture`] when a deep capture
    /// hits an uncopyable field.
    pub fn new<I>(participants: I, deep: bool) -> TransactionResult<Self>
    where
        I: IntoIterator,
        I::Item: Into<ParticipantRef>,
    {
        Self::with_config(participants, TransactionConfig::new().deep(deep))
    }

    /// Create a transaction with explicit configuration.
    pub fn with_config<I>(participants: I, config: TransactionConfig) -> TransactionResult<Self>
    where
        I: IntoIterator,
        I::Item: Into<ParticipantRef>,
    {
        let participants: Vec<ParticipantRef> = participants.into_iter().map(Into::into).collect();
        if participants.is_empty() {
            return Err(TransactionError::EmptyTransaction);
        }

        let snapshots = capture_all(&participants, config.mode)?;
        let now = Utc::now();
        let metadata = TransactionMetadata {
            tx_id: Ulid::new().to_string().to_lowercase(),
            name: config.name,
            mode: config.mode,
            participants: participants.len(),
            started_at: now,
            committed_at: now,
            commits: 0,
            rollbacks: 0,
        };

        debug!(
            tx_id = %metadata.tx_id,
            name = metadata.name.as_deref().unwrap_or(""),
            participants = metadata.participants,
            mode = %metadata.mode,
            "transaction started"
        );

        Ok(Self {
            metadata,
            participants,
            snapshots,
        })
    }

    /// Run `f` inside a new transaction.
    ///
    /// Commits when `f` returns `Ok`; rolls back and returns the closure's
    /// error when it returns `Err`. Failures of the transaction itself are
    /// converted into the caller's error type.
    pub fn run<I, F, T, E>(participants: I, config: TransactionConfig, f: F) -> Result<T, E>
    where
        I: IntoIterator,
        I::Item: Into<ParticipantRef>,
        F: FnOnce(&mut Transaction) -> Result<T, E>,
        E: From<TransactionError>,
    {
        let mut tx = Self::with_config(participants, config)?;

        match f(&mut tx) {
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

    /// Get the transaction ID.
    pub fn id(&self) -> &str {
        &self.metadata.tx_id
    }

    pub fn name(&self) -> Option<&str> {
        self.metadata.name.as_deref()
    }

    /// Get the copy mode.
    pub fn mode(&self) -> CopyMode {
        self.metadata.mode
    }

    pub fn metadata(&self) -> &TransactionMetadata {
        &self.metadata
    }

    /// Number of participants.
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    /// Always false: a transaction cannot be built over nothing.
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn participants(&self) -> &[ParticipantRef] {
        &self.participants
    }

    pub fn participant(&self, index: usize) -> Option<&ParticipantRef> {
        self.participants.get(index)
    }

    /// The stored rollback point for the participant at `index`.
    pub fn snapshot(&self, index: usize) -> Option<&Snapshot> {
        self.snapshots.get(index)
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    // ==================== Transaction Control ====================

    /// Advance the rollback point to the participants' current state.
    ///
    /// All-or-nothing: if any participant fails to capture, the previous
    /// snapshots are kept and the error is returned.
    pub fn commit(&mut self) -> Result<(), CaptureError> {
        let snapshots = capture_all(&self.participants, self.metadata.mode)?;
        self.snapshots = snapshots;
        self.metadata.committed_at = Utc::now();
        self.metadata.commits += 1;

        debug!(
            tx_id = %self.metadata.tx_id,
            participants = self.participants.len(),
            commits = self.metadata.commits,
            "transaction committed"
        );
        Ok(())
    }

    /// Restore every participant, in list order, from the stored snapshots.
    ///
    /// A participant that fails to restore does not stop the rollback: the
    /// remaining participants are still restored and every failure is
    /// reported in the returned [`PartialRollbackError`]. The stored
    /// snapshots are never changed, so repeated rollbacks are idempotent.
    pub fn rollback(&mut self) -> Result<(), PartialRollbackError> {
        let span = debug_span!("rollback", tx_id = %self.metadata.tx_id);
        let _enter = span.enter();

        self.metadata.rollbacks += 1;
        let mut failures = Vec::new();

        for (index, (participant, snapshot)) in
            self.participants.iter().zip(&self.snapshots).enumerate()
        {
            let mut guard = participant.write();
            if let Err(error) = snapshot.restore(&mut *guard) {
                let label = guard.label();
                warn!(index, participant = %label, %error, "participant not restored");
                failures.push(RollbackFailure {
                    index,
                    participant: label,
                    error,
                });
            }
        }

        if failures.is_empty() {
            debug!(participants = self.participants.len(), "transaction rolled back");
            Ok(())
        } else {
            Err(PartialRollbackError {
                total: self.participants.len(),
                failures,
            })
        }
    }
}

/// Capture every participant, stopping at the first failure.
fn capture_all(
    participants: &[ParticipantRef],
    mode: CopyMode,
) -> Result<Vec<Snapshot>, CaptureError> {
    participants
        .iter()
        .map(|participant| Snapshot::capture(&*participant.read(), mode))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    use crate::state::{
        shared, FieldValue, Fields, Participant, Record, ResourceHandle, RestoreError, Shared,
        SharedCell,
    };

    fn value(record: &Shared<Record>) -> Option<i64> {
        record.read().get_i64("value")
    }

    #[derive(Debug)]
    struct TypeMismatch;

    impl fmt::Display for TypeMismatch {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "value is not a number")
        }
    }

    impl From<TransactionError> for TypeMismatch {
        fn from(_: TransactionError) -> Self {
            TypeMismatch
        }
    }

    fn increment(record: &Shared<Record>) -> Result<(), TypeMismatch> {
        let mut guard = record.write();
        let current = guard.get_i64("value").ok_or(TypeMismatch)?;
        guard.set("value", current + 1);
        Ok(())
    }

    /// A participant whose restore step can be switched to fail.
    struct Vault {
        value: i64,
        sealed: bool,
    }

    impl Participant for Vault {
        fn fields(&self) -> Fields {
            let mut fields = Fields::new();
            fields.insert("value".to_string(), FieldValue::from(self.value));
            fields
        }

        fn replace_fields(&mut self, fields: Fields) -> Result<(), RestoreError> {
            if self.sealed {
                return Err(RestoreError::rejected("value", "vault is sealed"));
            }
            self.value = fields
                .get("value")
                .and_then(FieldValue::as_i64)
                .ok_or_else(|| RestoreError::MissingField("value".to_string()))?;
            Ok(())
        }
    }

    #[test]
    fn test_multi_participant_rollback() {
        let a = shared(Record::new("a").with("value", 0));
        let b = shared(Record::new("b").with("value", 0));
        let mut tx = Transaction::new([a.clone(), b.clone()], false).unwrap();

        a.write().set("value", 1);
        b.write().set("value", 2);
        tx.rollback().unwrap();

        assert_eq!(value(&a), Some(0));
        assert_eq!(value(&b), Some(0));
    }

    #[test]
    fn test_rollback_is_idempotent() {
        let a = shared(Record::new("a").with("value", 0).with("tag", "x"));
        let mut tx = Transaction::new([a.clone()], true).unwrap();

        a.write().set("value", 7);
        a.write().remove("tag");

        tx.rollback().unwrap();
        let first = a.read().clone();
        tx.rollback().unwrap();
        let second = a.read().clone();

        assert_eq!(first, second);
        assert_eq!(second.get_str("tag"), Some("x"));
        assert_eq!(tx.metadata().rollbacks, 2);
    }

    #[test]
    fn test_commit_advances_rollback_point() {
        let num = shared(Record::new("num").with("value", -1));
        let mut tx = Transaction::new([num.clone()], true).unwrap();

        for _ in 0..3 {
            increment(&num).unwrap();
        }
        tx.commit().unwrap();

        for _ in 0..3 {
            increment(&num).unwrap();
        }
        num.write().set("value", "5x");
        assert!(increment(&num).is_err());

        tx.rollback().unwrap();
        assert_eq!(value(&num), Some(2));
        assert_eq!(tx.metadata().commits, 1);
    }

    #[test]
    fn test_commit_is_idempotent() {
        let a = shared(Record::new("a").with("value", 0));
        let mut tx = Transaction::new([a.clone()], false).unwrap();

        a.write().set("value", 4);
        tx.commit().unwrap();
        tx.commit().unwrap();

        a.write().set("value", 9);
        tx.rollback().unwrap();
        assert_eq!(value(&a), Some(4));
    }

    #[test]
    fn test_failed_commit_keeps_previous_snapshots() {
        let a = shared(Record::new("a").with("value", 0));
        let b = shared(Record::new("b").with("value", 0));
        let mut tx = Transaction::new([a.clone(), b.clone()], true).unwrap();

        a.write().set("value", 1);
        b.write().set("conn", ResourceHandle::new("socket", ()));

        let err = tx.commit().unwrap_err();
        assert_eq!(err.participant, "Record(b)");
        assert_eq!(err.field, "conn");

        tx.rollback().unwrap();
        assert_eq!(value(&a), Some(0));
        assert!(!b.read().contains("conn"));
        assert_eq!(tx.metadata().commits, 0);
    }

    #[test]
    fn test_empty_transaction_rejected() {
        let result = Transaction::new(Vec::<Shared<Record>>::new(), false);
        assert!(matches!(result, Err(TransactionError::EmptyTransaction)));
    }

    #[test]
    fn test_deep_construction_fails_on_resource() {
        let a = shared(Record::new("a").with("file", ResourceHandle::new("file", 3u8)));
        let result = Transaction::new([a.clone()], true);
        assert!(matches!(result, Err(TransactionError::Capture(_))));

        assert!(Transaction::new([a], false).is_ok());
    }

    #[test]
    fn test_shallow_and_deep_diverge_on_nested_state() {
        for (deep, expected) in [(false, 1), (true, 0)] {
            let items = SharedCell::new(Vec::<FieldValue>::new());
            let a = shared(Record::new("a").with("items", items.clone()));
            let mut tx = Transaction::new([a.clone()], deep).unwrap();

            items.update(|v| {
                if let FieldValue::List(list) = v {
                    list.push(FieldValue::from(1));
                }
            });
            tx.rollback().unwrap();

            let len = a
                .read()
                .get("items")
                .and_then(FieldValue::as_shared)
                .and_then(|cell| cell.get().as_list().map(|l| l.len()));
            assert_eq!(len, Some(expected), "deep = {}", deep);
        }
    }

    #[test]
    fn test_partial_rollback_restores_the_rest() {
        let a = shared(Record::new("a").with("value", 0));
        let vault = shared(Vault { value: 0, sealed: false });
        let b = shared(Record::new("b").with("value", 0));

        let participants: Vec<ParticipantRef> =
            vec![(&a).into(), (&vault).into(), (&b).into()];
        let mut tx = Transaction::new(participants, false).unwrap();

        a.write().set("value", 1);
        b.write().set("value", 2);
        {
            let mut v = vault.write();
            v.value = 3;
            v.sealed = true;
        }

        let err = tx.rollback().unwrap_err();
        assert_eq!(err.total, 3);
        assert_eq!(err.failed_participants(), vec!["Vault"]);
        assert_eq!(err.failures[0].index, 1);
        assert_eq!(value(&a), Some(0));
        assert_eq!(value(&b), Some(0));
        assert_eq!(vault.read().value, 3);

        vault.write().sealed = false;
        tx.rollback().unwrap();
        assert_eq!(vault.read().value, 0);
    }

    #[test]
    fn test_run_commits_on_success() {
        let a = shared(Record::new("a").with("value", 0));

        let result: Result<i64, TypeMismatch> =
            Transaction::run([a.clone()], TransactionConfig::new(), |_tx| {
                increment(&a)?;
                increment(&a)?;
                Ok(2)
            });

        assert_eq!(result.unwrap(), 2);
        assert_eq!(value(&a), Some(2));
    }

    #[test]
    fn test_run_rolls_back_on_error() {
        let a = shared(Record::new("a").with("value", 0));

        let result: Result<(), TypeMismatch> =
            Transaction::run([a.clone()], TransactionConfig::new().deep(true), |_tx| {
                increment(&a)?;
                a.write().set("value", "oops");
                increment(&a)
            });

        assert!(result.is_err());
        assert_eq!(value(&a), Some(0));
    }

    #[test]
    fn test_metadata() {
        let a = shared(Record::new("a"));
        let config = TransactionConfig::new().deep(true).name("audit");
        let tx = Transaction::with_config([a], config).unwrap();

        assert_eq!(tx.name(), Some("audit"));
        assert_eq!(tx.mode(), CopyMode::Deep);
        assert_eq!(tx.len(), 1);
        assert_eq!(tx.id().len(), 26);
        assert_eq!(tx.snapshot(0).map(|s| s.participant()), Some("Record(a)"));

        let json = serde_json::to_value(tx.metadata()).unwrap();
        assert_eq!(json["mode"], "deep");
        assert_eq!(json["participants"], 1);
    }
}
