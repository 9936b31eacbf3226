//! Guarded operations.
//!
//! A guarded operation captures its participant, runs, and on failure
//! restores the participant before handing back the operation's own error.
//! Nothing is recorded between calls: every invocation captures fresh state.
//!
//! The copy mode is tracked at the type level, the same way transaction
//! lifecycles are elsewhere:
//! - `Shallow`: capture cannot fail, `run` returns the operation's error type
//! - `Deep`: capture can fail, so the error type must accept a `CaptureError`

use std::marker::PhantomData;

use tracing::{debug, error};

use crate::state::{CaptureError, CopyMode, Participant, Shared, Snapshot};

/// Marker type for shallow-capturing guards.
#[derive(Debug)]
pub struct Shallow;

/// Marker type for deep-capturing guards.
#[derive(Debug)]
pub struct Deep;

/// Copy mode carried by a guard marker.
pub trait GuardMode {
    const MODE: CopyMode;
}

impl GuardMode for Shallow {
    const MODE: CopyMode = CopyMode::Shallow;
}

impl GuardMode for Deep {
    const MODE: CopyMode = CopyMode::Deep;
}

/// A reusable operation that leaves its participant untouched on failure.
///
/// ```
/// use memento::guard::GuardedOperation;
/// use memento::state::Record;
///
/// let mut num = Record::new("num").with("value", 5);
/// let mut poison = GuardedOperation::new(|r: &mut Record| {
///     r.set("value", "bad");
///     Err::<(), _>("invalid value")
/// });
///
/// assert_eq!(poison.run(&mut num), Err("invalid value"));
/// assert_eq!(num.get_i64("value"), Some(5));
/// ```
pub struct GuardedOperation<F, M = Shallow> {
    operation: F,
    _mode: PhantomData<M>,
}

impl<F, M: GuardMode> GuardedOperation<F, M> {
    /// Copy mode used to capture the participant.
    pub fn mode(&self) -> CopyMode {
        M::MODE
    }

    /// Unwrap the operation.
    pub fn into_inner(self) -> F {
        self.operation
    }
}

impl<F> GuardedOperation<F, Shallow> {
    /// Wrap an operation with shallow capture.
    pub fn new(operation: F) -> Self {
        Self {
            operation,
            _mode: PhantomData,
        }
    }

    /// Switch to deep capture.
    pub fn deep(self) -> GuardedOperation<F, Deep> {
        GuardedOperation {
            operation: self.operation,
            _mode: PhantomData,
        }
    }

    /// Run the operation on `participant`.
    ///
    /// On `Err` the participant's fields are restored to their state before
    /// the call and the error is returned unchanged.
    pub fn run<P, T, E>(&mut self, participant: &mut P) -> Result<T, E>
    where
        P: Participant + ?Sized,
        F: FnMut(&mut P) -> Result<T, E>,
    {
        let snapshot = Snapshot::shallow(&*participant);
        let result = (self.operation)(&mut *participant);
        settle(&snapshot, participant, result)
    }

    /// Run the operation on a shared participant, holding its write lock
    /// for the whole capture/run/restore cycle.
    pub fn run_shared<P, T, E>(&mut self, participant: &Shared<P>) -> Result<T, E>
    where
        P: Participant,
        F: FnMut(&mut P) -> Result<T, E>,
    {
        let mut guard = participant.write();
        self.run(&mut *guard)
    }
}

impl<F> GuardedOperation<F, Deep> {
    /// Run the operation on `participant` with a deep capture.
    ///
    /// If the participant cannot be deep-copied the operation is not run and
    /// the capture error is returned through `E`.
    pub fn run<P, T, E>(&mut self, participant: &mut P) -> Result<T, E>
    where
        P: Participant + ?Sized,
        F: FnMut(&mut P) -> Result<T, E>,
        E: From<CaptureError>,
    {
        let snapshot = Snapshot::capture(&*participant, CopyMode::Deep)?;
        let result = (self.operation)(&mut *participant);
        settle(&snapshot, participant, result)
    }

    pub fn run_shared<P, T, E>(&mut self, participant: &Shared<P>) -> Result<T, E>
    where
        P: Participant,
        F: FnMut(&mut P) -> Result<T, E>,
        E: From<CaptureError>,
    {
        let mut guard = participant.write();
        self.run(&mut *guard)
    }
}

impl<F, M: GuardMode> std::fmt::Debug for GuardedOperation<F, M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardedOperation")
            .field("mode", &M::MODE)
            .finish_non_exhaustive()
    }
}

/// Run `operation` once on `participant` with a shallow capture, restoring
/// the participant if it fails.
pub fn guarded<P, F, T, E>(operation: F, participant: &mut P) -> Result<T, E>
where
    P: Participant + ?Sized,
    F: FnOnce(&mut P) -> Result<T, E>,
{
    let snapshot = Snapshot::shallow(&*participant);
    let result = operation(&mut *participant);
    settle(&snapshot, participant, result)
}

/// Restore after a failed operation; the result passes through untouched.
fn settle<P, T, E>(snapshot: &Snapshot, participant: &mut P, result: Result<T, E>) -> Result<T, E>
where
    P: Participant + ?Sized,
{
    if result.is_err() {
        match snapshot.restore(participant) {
            Ok(()) => debug!(
                participant = %snapshot.participant(),
                "guarded operation failed, participant restored"
            ),
            Err(restore_err) => error!(
                participant = %snapshot.participant(),
                error = %restore_err,
                "guarded operation failed and participant could not be restored"
            ),
        }
    }
    result
}
