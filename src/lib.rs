//! # CubeK Einx
//!
//! Einstein-inspired notation compiler for tensor operations.
//!
//! A description such as `"a b -> b a [2]"` is parsed, every axis size is
//! solved from tensor shapes and named parameters, and the result is
//! compiled into primitive calls against a pluggable [`Backend`].
//!
//! ## Features
//!
//! - Notation with compositions `(h w)`, concatenations `(a + b)`, markers
//!   `[c]`, ellipses `b...` and elided inputs
//! - Fixed-point axis-size solver with common subexpression elimination
//! - Flatten/unflatten between nested and flat layouts
//! - Operations: `arange`, `vmap`, `rearrange`
//! - Two-phase compile/execute API with a serializable cache key
//!
//! ## Example
//!
//! ```ignore
//! use cubek_einx::{arange, CpuBackend, Parameters};
//!
//! let backend = CpuBackend::<i32>::new();
//! let grid = arange(&backend, "a b [2]", &Parameters::from([("a", 5), ("b", 6)]), None)?;
//! assert_eq!(grid.shape(), &[5, 6, 2]);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod backend;
pub mod error;
pub mod expr;
pub mod flatten;
pub mod notation;
pub mod op;
pub mod solver;

#[cfg(feature = "ndarray")]
pub use backend::CpuBackend;
pub use backend::{Backend, DType, Operand, TensorFn};
pub use error::{EinxError, EinxResult, SolveError};
pub use expr::{Axis, Expr, SolvedExpression};
pub use notation::{parse_description, parse_expression, Description, SyntaxTree};
pub use op::{arange, rearrange, vmap, ArangePlan, OpConfig, PlanKey, RearrangePlan, VmapPlan};
pub use solver::{solve, Equation, ParamValue, Parameters};
