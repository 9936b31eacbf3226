//! Guarded operations: single-call rollback on failure.
//!
//! Where a [`Transaction`](crate::transaction::Transaction) keeps a standing
//! rollback point for a set of participants, a guarded operation protects
//! one call on one participant and keeps nothing afterwards.

mod operation;

pub use operation::{guarded, Deep, GuardMode, GuardedOperation, Shallow};
