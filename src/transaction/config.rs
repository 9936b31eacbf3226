//! Transaction configuration.

use serde::{Deserialize, Serialize};

use crate::state::CopyMode;

/// Transaction configuration options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransactionConfig {
    /// Copy mode applied to every participant.
    pub mode: CopyMode,
    /// Optional name, reported in log events and metadata.
    pub name: Option<String>,
}

impl TransactionConfig {
    /// Create a configuration with default (shallow) copying.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from JSON. Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Set the copy mode from a deep-copy flag.
    pub fn deep(mut self, value: bool) -> Self {
        self.mode = CopyMode::from(value);
        self
    }

    /// Set the copy mode.
    pub fn mode(mut self, mode: CopyMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the transaction name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}
