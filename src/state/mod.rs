//! State capture for Memento.
//!
//! This module turns a participant's observable state into an immutable
//! [`Snapshot`] and installs it back later. The transaction and guard layers
//! build on it and never touch participant fields directly.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Snapshot                             │
//! │        (capture: fields -> copy, restore: copy -> fields)   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!        ┌─────────────────────┼─────────────────────┐
//!        │                     │                     │
//!        ▼                     ▼                     ▼
//!  ┌─────────────┐       ┌─────────────┐       ┌─────────────┐
//!  │ Participant │       │  FieldValue │       │  CopyMode   │
//!  │ (capability)│       │ (data/cells)│       │ (copy depth)│
//!  └─────────────┘       └─────────────┘       └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use memento::state::{capture, restore, CopyMode, FieldValue, Record, SharedCell};
//!
//! let tags = SharedCell::new(Vec::<FieldValue>::new());
//! let mut doc = Record::new("doc").with("title", "draft").with("tags", tags.clone());
//!
//! let snap = capture(&doc, CopyMode::Deep).unwrap();
//! doc.set("title", "final");
//! tags.set(vec![FieldValue::from("published")]);
//!
//! restore(&snap, &mut doc).unwrap();
//! assert_eq!(doc.get_str("title"), Some("draft"));
//! assert!(doc.get("tags").unwrap().as_shared().unwrap().get().as_list().unwrap().is_empty());
//! ```

mod error;
mod mode;
mod participant;
mod record;
mod snapshot;
mod value;

pub use error::{CaptureError, RestoreError, StateError, StateResult};
pub use mode::CopyMode;
pub use participant::{shared, DynParticipant, Participant, ParticipantRef, Shared};
pub use record::Record;
pub use snapshot::{capture, restore, Snapshot};
pub use value::{FieldValue, Fields, ResourceHandle, SharedCell};
