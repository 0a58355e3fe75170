//! Solved expressions.
//!
//! The typed tree produced by the solver, with every axis size known. It is
//! the shared vocabulary of the flatten transformer and the operation
//! compiler.

mod solved;
mod traverse;

pub use solved::{Axis, Expr, SolvedExpression};
pub use traverse::Iter;
