//! Transactions over snapshots of participant state.
//!
//! A transaction captures every participant on construction. Callers then
//! mutate participants freely and either `commit` (advance the rollback
//! point) or `rollback` (restore every participant to the last commit).
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   SharedTransaction                         │
//! │      (one mutex around the snapshot list and participants)  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Transaction                            │
//! │   participants[i]  <──index-aligned──>  snapshots[i]        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//!                     state::Snapshot (capture/restore)
//! ```
//!
//! # Usage
//!
//! ```
//! use memento::state::{shared, Record};
//! use memento::transaction::{Transaction, TransactionConfig};
//!
//! let a = shared(Record::new("a").with("value", 0));
//! let b = shared(Record::new("b").with("value", 0));
//!
//! let config = TransactionConfig::new().deep(true).name("transfer");
//! let mut tx = Transaction::with_config([a.clone(), b.clone()], config).unwrap();
//!
//! a.write().set("value", -10);
//! tx.commit().unwrap();
//!
//! b.write().set("value", 10);
//! tx.rollback().unwrap();
//!
//! assert_eq!(a.read().get_i64("value"), Some(-10));
//! assert_eq!(b.read().get_i64("value"), Some(0));
//! ```

mod config;
mod context;
mod error;
mod shared;

pub use config::TransactionConfig;
pub use context::{Transaction, TransactionMetadata};
pub use error::{PartialRollbackError, RollbackFailure, TransactionError, TransactionResult};
pub use shared::SharedTransaction;
