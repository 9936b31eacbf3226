//! Immutable snapshots of participant state.
//!
//! A [`Snapshot`] holds a copy of one participant's complete field mapping.
//! Restoring installs a fresh copy of that content, so one snapshot can be
//! restored any number of times and always yields the same state.

use chrono::{DateTime, Utc};
use tracing::trace;

use crate::state::error::{CaptureError, RestoreError};
use crate::state::mode::CopyMode;
use crate::state::participant::Participant;
use crate::state::value::{DeepCopy, Fields};

/// A copy of one participant's fields at a point in time.
#[derive(Debug, Clone)]
pub struct Snapshot {
    participant: String,
    mode: CopyMode,
    fields: Fields,
    taken_at: DateTime<Utc>,
}

impl Snapshot {
    /// Capture `participant` in the given mode.
    ///
    /// Shallow captures never fail. Deep captures fail with a
    /// [`CaptureError`] naming the first field that holds a resource handle.
    pub fn capture<P>(participant: &P, mode: CopyMode) -> Result<Self, CaptureError>
    where
        P: Participant + ?Sized,
    {
        let fields = participant.fields();
        let fields = match mode {
            CopyMode::Shallow => fields,
            CopyMode::Deep => DeepCopy::strict().copy_fields(&fields).map_err(|e| CaptureError {
                participant: participant.label(),
                field: e.path,
                kind: e.kind,
            })?,
        };

        trace!(participant = %participant.label(), %mode, fields = fields.len(), "captured snapshot");

        Ok(Self {
            participant: participant.label(),
            mode,
            fields,
            taken_at: Utc::now(),
        })
    }

    /// Infallible shallow capture.
    pub fn shallow<P>(participant: &P) -> Self
    where
        P: Participant + ?Sized,
    {
        Self {
            participant: participant.label(),
            mode: CopyMode::Shallow,
            fields: participant.fields(),
            taken_at: Utc::now(),
        }
    }

    /// Replace the participant's whole field mapping with a fresh copy of
    /// this snapshot's content.
    pub fn restore<P>(&self, participant: &mut P) -> Result<(), RestoreError>
    where
        P: Participant + ?Sized,
    {
        participant.replace_fields(self.fresh_fields()?)?;
        trace!(participant = %self.participant, mode = %self.mode, "restored snapshot");
        Ok(())
    }

    /// Copy of the content suitable for installing into a live object.
    ///
    /// Deep snapshots hand out new cells on every call, so the snapshot's own
    /// cells are never reachable from a participant.
    fn fresh_fields(&self) -> Result<Fields, RestoreError> {
        match self.mode {
            CopyMode::Shallow => Ok(self.fields.clone()),
            CopyMode::Deep => DeepCopy::lenient().copy_fields(&self.fields).map_err(|e| {
                RestoreError::Copy(CaptureError {
                    participant: self.participant.clone(),
                    field: e.path,
                    kind: e.kind,
                })
            }),
        }
    }

    /// Label of the captured participant.
    pub fn participant(&self) -> &str {
        &self.participant
    }

    pub fn mode(&self) -> CopyMode {
        self.mode
    }

    /// The captured field mapping.
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Capture a participant's current state.
pub fn capture<P>(participant: &P, mode: CopyMode) -> Result<Snapshot, CaptureError>
where
    P: Participant + ?Sized,
{
    Snapshot::capture(participant, mode)
}

/// Restore a participant from a snapshot.
pub fn restore<P>(snapshot: &Snapshot, participant: &mut P) -> Result<(), RestoreError>
where
    P: Participant + ?Sized,
{
    snapshot.restore(participant)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::record::Record;
    use crate::state::value::{FieldValue, ResourceHandle, SharedCell};

    fn push(cell: &SharedCell, value: i64) {
        cell.update(|v| {
            if let FieldValue::List(items) = v {
                items.push(FieldValue::from(value));
            }
        });
    }

    fn list_len(record: &Record, key: &str) -> usize {
        record
            .get(key)
            .and_then(FieldValue::as_shared)
            .and_then(|cell| cell.get().as_list().map(|l| l.len()))
            .unwrap_or(0)
    }

    #[test]
    fn test_round_trip_top_level() {
        let mut record = Record::new("p").with("value", 1).with("name", "a");
        let snap = capture(&record, CopyMode::Shallow).unwrap();

        record.set("value", 2);
        record.remove("name");
        record.set("extra", true);

        restore(&snap, &mut record).unwrap();
        assert_eq!(record.get_i64("value"), Some(1));
        assert_eq!(record.get_str("name"), Some("a"));
        assert!(!record.contains("extra"));
    }

    #[test]
    fn test_shallow_keeps_nested_mutation() {
        let items = SharedCell::new(Vec::<FieldValue>::new());
        let mut record = Record::new("p").with("items", items.clone());
        let snap = capture(&record, CopyMode::Shallow).unwrap();

        push(&items, 1);
        restore(&snap, &mut record).unwrap();

        assert_eq!(list_len(&record, "items"), 1);
    }

    #[test]
    fn test_deep_undoes_nested_mutation() {
        let items = SharedCell::new(Vec::<FieldValue>::new());
        let mut record = Record::new("p").with("items", items.clone());
        let snap = capture(&record, CopyMode::Deep).unwrap();

        push(&items, 1);
        restore(&snap, &mut record).unwrap();

        assert_eq!(list_len(&record, "items"), 0);
    }

    #[test]
    fn test_deep_snapshot_restores_repeatedly() {
        let mut record = Record::new("p").with("items", SharedCell::new(Vec::<FieldValue>::new()));
        let snap = capture(&record, CopyMode::Deep).unwrap();

        for _ in 0..3 {
            restore(&snap, &mut record).unwrap();
            let live = record.get("items").and_then(FieldValue::as_shared).unwrap().clone();
            push(&live, 42);
            assert_eq!(list_len(&record, "items"), 1);
        }

        restore(&snap, &mut record).unwrap();
        assert_eq!(list_len(&record, "items"), 0);
        assert!(snap.fields()["items"].as_shared().unwrap().get().as_list().unwrap().is_empty());
    }

    #[test]
    fn test_deep_capture_rejects_resources() {
        let record = Record::new("session").with("conn", ResourceHandle::new("socket", ()));
        let err = capture(&record, CopyMode::Deep).unwrap_err();
        assert_eq!(err.field, "conn");
        assert_eq!(err.kind, "socket");
        assert_eq!(err.participant, "Record(session)");

        let snap = capture(&record, CopyMode::Shallow).unwrap();
        assert_eq!(snap.len(), 1);
    }

    #[test]
    fn test_snapshot_metadata() {
        let record = Record::new("p").with("value", 5);
        let snap = Snapshot::shallow(&record);
        assert_eq!(snap.participant(), "Record(p)");
        assert_eq!(snap.mode(), CopyMode::Shallow);
        assert!(snap.taken_at() <= Utc::now());
    }
}
