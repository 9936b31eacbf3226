//! The participant capability and shared participant handles.

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::state::error::RestoreError;
use crate::state::value::Fields;

/// An object whose field state can be captured and restored.
///
/// Implementors expose their state as a field mapping and accept a complete
/// replacement of it. No other behavior is required.
pub trait Participant {
    /// The current field mapping.
    ///
    /// Values held in shared cells are returned as handles to the same cells.
    fn fields(&self) -> Fields;

    /// Replace the entire field mapping.
    ///
    /// Fields absent from `fields` must not survive the call. An implementor
    /// may reject a field set it cannot represent; it must then leave its
    /// state untouched.
    fn replace_fields(&mut self, fields: Fields) -> Result<(), RestoreError>;

    /// Name used in errors and log events.
    fn label(&self) -> String {
        let name = std::any::type_name::<Self>();
        name.rsplit("::").next().unwrap_or(name).to_string()
    }
}

/// A participant behind a lock, shareable with a transaction.
pub type Shared<P> = Arc<RwLock<P>>;

/// Wrap a participant so it can be handed to a transaction while the caller
/// keeps mutating it.
pub fn shared<P: Participant>(participant: P) -> Shared<P> {
    Arc::new(RwLock::new(participant))
}

/// Type-erased participant trait object.
pub type DynParticipant = dyn Participant + Send + Sync;

/// A type-erased handle to a shared participant.
///
/// Cloning the handle does not clone the participant.
#[derive(Clone)]
pub struct ParticipantRef(Arc<RwLock<DynParticipant>>);

impl ParticipantRef {
    /// Take ownership of a participant. Use `From<Shared<P>>` instead when
    /// the caller needs to keep access to it.
    pub fn new<P: Participant + Send + Sync + 'static>(participant: P) -> Self {
        Self(Arc::new(RwLock::new(participant)))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, DynParticipant> {
        self.0.read()
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, DynParticipant> {
        self.0.write()
    }

    pub fn label(&self) -> String {
        self.0.read().label()
    }

    /// Check if both handles point at the same participant.
    pub fn ptr_eq(&self, other: &ParticipantRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<P: Participant + Send + Sync + 'static> From<Shared<P>> for ParticipantRef {
    fn from(shared: Shared<P>) -> Self {
        Self(shared)
    }
}

impl<P: Participant + Send + Sync + 'static> From<&Shared<P>> for ParticipantRef {
    fn from(shared: &Shared<P>) -> Self {
        Self(shared.clone())
    }
}

impl std::fmt::Debug for ParticipantRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ParticipantRef").field(&self.label()).finish()
    }
}
