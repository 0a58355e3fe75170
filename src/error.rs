//! Error types for notation compilation and execution.

use alloc::string::String;
use alloc::vec::Vec;

/// Errors raised while solving the axis-size equation system.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(thiserror::Error))]
pub enum SolveError {
    /// The same axis (or subexpression) was forced to two different sizes.
    #[cfg_attr(feature = "std", error("contradiction for axis '{axis}': {first} != {second}"))]
    Contradiction {
        axis: String,
        first: usize,
        second: usize,
    },

    /// The fixed point was reached with unbound axes left.
    #[cfg_attr(feature = "std", error("underdetermined axes: {}", .axes.join(", ")))]
    Underdetermined { axes: Vec<String> },

    /// The size of a composition or concatenation does not fit in `usize`.
    #[cfg_attr(feature = "std", error("size of '{expression}' overflows"))]
    Overflow { expression: String },

    /// An expression has a different number of dimensions than its shape.
    #[cfg_attr(feature = "std", error("expression '{expression}' has {expected} dimensions, shape has {got}"))]
    RankMismatch {
        expression: String,
        expected: usize,
        got: usize,
    },

    /// Too many marked axes for the operation.
    #[cfg_attr(feature = "std", error("expected at most {max} marked axis, got {got}"))]
    MarkerCardinality { max: usize, got: usize },

    /// The number of repetitions of an ellipsis could not be determined or is inconsistent.
    #[cfg_attr(feature = "std", error("ellipsis depth error: {message}"))]
    EllipsisDepth { message: String },
}

/// Errors that can occur during notation parsing, solving and execution.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "std", derive(thiserror::Error))]
pub enum EinxError {
    /// Malformed description string.
    #[cfg_attr(feature = "std", error("parse error: {message}"))]
    Parse { message: String },

    /// The equation system has no unique solution.
    #[cfg_attr(feature = "std", error("solve error: {0}"))]
    Solve(SolveError),

    /// An axis is used inconsistently across inputs and outputs.
    #[cfg_attr(feature = "std", error("axis usage error: {message}"))]
    AxisUsage { message: String },

    /// A wrapped function or backend call returned a tensor of the wrong shape.
    #[cfg_attr(feature = "std", error("{message}: expected shape {expected:?}, got {got:?}"))]
    BackendContract {
        message: String,
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    /// A wrapped function returned the wrong number of tensors.
    #[cfg_attr(feature = "std", error("expected {expected} output tensor(s) from wrapped function, got {got}"))]
    OutputArity { expected: usize, got: usize },

    /// Wrong number of input tensors for the compiled operation.
    #[cfg_attr(feature = "std", error("expected {expected} input tensor(s), got {got}"))]
    InputCount { expected: usize, got: usize },

    /// A backend primitive failed.
    #[cfg_attr(feature = "std", error("backend error: {message}"))]
    Backend { message: String },
}

impl EinxError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn axis_usage(message: impl Into<String>) -> Self {
        Self::AxisUsage {
            message: message.into(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    pub fn contract(message: impl Into<String>, expected: &[usize], got: &[usize]) -> Self {
        Self::BackendContract {
            message: message.into(),
            expected: expected.to_vec(),
            got: got.to_vec(),
        }
    }
}

impl From<SolveError> for EinxError {
    fn from(err: SolveError) -> Self {
        Self::Solve(err)
    }
}

/// Result type for solver operations.
pub type SolveResult<T> = core::result::Result<T, SolveError>;

/// Result type for einx operations.
pub type EinxResult<T> = core::result::Result<T, EinxError>;
