//! Memento - snapshot-based transactions for in-memory objects
//!
//! This crate captures the field state of one or more objects, lets callers
//! mutate them freely, and then either commits the new state or rolls every
//! object back to the last committed snapshot.
//!
//! # Example
//!
//! ```
//! use memento::state::{shared, Record};
//! use memento::transaction::Transaction;
//!
//! let account = shared(Record::new("account").with("balance", 100));
//! let mut tx = Transaction::new([account.clone()], false).unwrap();
//!
//! account.write().set("balance", 40);
//! tx.rollback().unwrap();
//!
//! assert_eq!(account.read().get_i64("balance"), Some(100));
//! ```

pub mod guard;
pub mod state;
pub mod transaction;
