//! Canonical cache key of a compiled operation.

use alloc::string::String;
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use super::OpConfig;
use crate::solver::{ParamValue, Parameters};

/// Everything a compiled plan depends on.
///
/// Two calls with equal keys compile to equal plans, so an external cache
/// may map keys to plans. Parameters are stored sorted by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlanKey {
    pub operation: String,
    pub description: String,
    /// Input shapes; `None` for deferred inputs.
    pub shapes: Vec<Option<Vec<usize>>>,
    pub parameters: Vec<(String, ParamValue)>,
    pub config: OpConfig,
}

impl PlanKey {
    pub fn new(
        operation: &str,
        description: &str,
        shapes: &[Option<Vec<usize>>],
        parameters: &Parameters,
        config: &OpConfig,
    ) -> Self {
        Self {
            operation: operation.into(),
            description: description.into(),
            shapes: shapes.to_vec(),
            parameters: parameters
                .iter()
                .map(|(name, value)| (String::from(name), value.clone()))
                .collect(),
            config: *config,
        }
    }
}
