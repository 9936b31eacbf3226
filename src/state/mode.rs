//! Copy modes for state capture.
//!
//! Memento supports two copy modes:
//! - Shallow: copies the top-level field mapping, shared cells stay shared
//! - Deep: recursively copies every reachable shared cell

use std::fmt;

use serde::{Deserialize, Serialize};

/// How a snapshot copies a participant's fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CopyMode {
    /// Shallow copy.
    ///
    /// The top-level field mapping is copied. Values held in a
    /// [`SharedCell`](crate::state::SharedCell) are shared with the live
    /// object, so in-place mutations of those cells after the capture are
    /// not undone by a restore.
    ///
    /// Capture in this mode never fails.
    #[default]
    Shallow,

    /// Deep copy.
    ///
    /// Every reachable shared cell is copied into a fresh cell, so a restore
    /// reproduces the original structure even after nested mutation.
    /// Resource handles cannot be deep-copied and make the capture fail.
    Deep,
}

impl CopyMode {
    /// Check if this mode copies nested shared state.
    pub fn is_deep(&self) -> bool {
        matches!(self, CopyMode::Deep)
    }

    /// Get a human-readable description of this mode.
    pub fn description(&self) -> &'static str {
        match self {
            CopyMode::Shallow => "Top-level fields are copied, nested shared cells stay shared",
            CopyMode::Deep => "All reachable nested state is copied",
        }
    }
}

impl From<bool> for CopyMode {
    fn from(deep: bool) -> Self {
        if deep {
            CopyMode::Deep
        } else {
            CopyMode::Shallow
        }
    }
}

impl fmt::Display for CopyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CopyMode::Shallow => write!(f, "shallow"),
            CopyMode::Deep => write!(f, "deep"),
        }
    }
}

impl std::str::FromStr for CopyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "shallow" | "copy" => Ok(CopyMode::Shallow),
            "deep" | "deepcopy" | "deep_copy" => Ok(CopyMode::Deep),
            _ => Err(format!("unknown copy mode: {}", s)),
        }
    }
}
