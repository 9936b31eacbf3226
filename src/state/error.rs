//! State layer error types
//!
//! Errors raised while capturing or restoring participant state are defined
//! here. We use `thiserror` for the Display impls.

use thiserror::Error;

/// a participant's state could not be copied
///
/// Only deep captures produce this: a field (or a value nested inside one)
/// holds a resource handle that has no meaningful copy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot capture {participant}: field `{field}` holds a {kind} resource that cannot be deep-copied")]
pub struct CaptureError {
    /// label of the participant being captured
    pub participant: String,
    /// path to the offending value, e.g. `pool[1]` or `settings.socket`
    pub field: String,
    /// kind name of the resource handle
    pub kind: String,
}

/// a participant refused to accept a restored field set
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RestoreError {
    /// a single field was rejected by the participant
    #[error("field `{field}` rejected: {reason}")]
    Rejected { field: String, reason: String },

    /// a required field is missing from the snapshot
    #[error("missing field `{0}`")]
    MissingField(String),

    /// the copied snapshot content could not be materialized
    #[error("snapshot content could not be copied: {0}")]
    Copy(#[from] CaptureError),
}

impl RestoreError {
    /// create a rejection for a single field
    pub fn rejected(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Rejected {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// the main error type for the state layer
#[derive(Debug, Error)]
pub enum StateError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Restore(#[from] RestoreError),

    /// record data built from JSON must be an object
    #[error("record data must be a JSON object, found {0}")]
    NotAnObject(&'static str),
}

/// result type alias for state operations
pub type StateResult<T> = Result<T, StateError>;
