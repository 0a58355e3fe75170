//! Axis-size equation solver.
//!
//! Turns syntax trees plus facts (tensor shapes, named parameters) into
//! solved expressions where every axis size is known.
//!
//! Stages:
//! 1. Ellipsis depths are resolved and ellipses expanded.
//! 2. Repeated compositions are optionally collapsed into single axes.
//! 3. Sizes are propagated to a fixed point.
//! 4. An operation-specific hook may add equations, then propagation resumes.
//! 5. Every equation is resolved into a [`SolvedExpression`].

mod cse;
mod ellipsis;
mod equation;
mod propagate;

use alloc::vec::Vec;

pub use ellipsis::expanded_name;
pub use equation::{Equation, Fact, ParamValue, Parameters};

use crate::error::{SolveError, SolveResult};
use crate::expr::SolvedExpression;
use crate::notation::SyntaxTree;
use propagate::Bindings;

/// Solves the equation system, returning one solved expression per equation.
pub fn solve(equations: &[Equation], cse: bool) -> SolveResult<Vec<SolvedExpression>> {
    solve_with_hook(equations, cse, |_| Ok(Vec::new()))
}

/// Like [`solve`], with a hook that sees the expanded expression trees after
/// the first propagation and may contribute further equations.
///
/// Parameter equations are included in the returned list like any other.
pub fn solve_with_hook<F>(equations: &[Equation], cse: bool, hook: F) -> SolveResult<Vec<SolvedExpression>>
where
    F: FnOnce(&[SyntaxTree]) -> SolveResult<Vec<Equation>>,
{
    let expansion = ellipsis::expand(equations)?;
    let mut expanded = expansion.equations;
    if cse {
        cse::eliminate(&mut expanded);
    }

    let mut bindings = Bindings::default();
    propagate::seed_parameters(equations, &expansion.depths, &mut bindings)?;
    propagate::propagate(&expanded, &mut bindings)?;

    let trees: Vec<SyntaxTree> = expanded.iter().map(|eq| eq.expr.clone()).collect();
    let extra = hook(&trees)?;
    if !extra.is_empty() {
        tracing::trace!(count = extra.len(), "hook added equations");
        let combined: Vec<Equation> = expanded.iter().cloned().chain(extra).collect();
        propagate::propagate(&combined, &mut bindings)?;
    }

    let mut unbound = Vec::new();
    let solved = expanded
        .iter()
        .map(|eq| propagate::resolve(eq.expr.items(), &bindings, &mut unbound))
        .collect::<SolveResult<Vec<_>>>()?;
    if !unbound.is_empty() {
        return Err(SolveError::Underdetermined { axes: unbound });
    }
    Ok(solved)
}
