//! Configuration for compiled operations.

use serde::{Deserialize, Serialize};

use crate::backend::DType;

/// Configuration options for compiling an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OpConfig {
    /// Whether to collapse repeated compositions into single axes while solving.
    pub cse: bool,
    /// Element type of generated tensors (used by `arange`).
    pub dtype: DType,
}

impl Default for OpConfig {
    fn default() -> Self {
        Self {
            cse: true,
            dtype: DType::Int32,
        }
    }
}

impl OpConfig {
    /// Creates a new config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables common subexpression elimination.
    pub fn with_cse(mut self, enabled: bool) -> Self {
        self.cse = enabled;
        self
    }

    /// Sets the element type of generated tensors.
    pub fn with_dtype(mut self, dtype: DType) -> Self {
        self.dtype = dtype;
        self
    }
}
