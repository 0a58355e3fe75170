//! `arange`: n-dimensional coordinate grids.
//!
//! Runs [`Backend::arange`] once per input axis and stacks the ranges along
//! the single marked output axis, in input axis order.
//!
//! ```text
//! "a b [2]"         a=5, b=6  ->  shape (5, 6, 2), t[2, 3] == [2, 3]
//! "a b -> b a [2]"  a=5, b=6  ->  shape (6, 5, 2), t[2, 3] == [3, 2]
//! ```

use alloc::vec;
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use super::rearrange::{display_all, FlatRearrange};
use super::{solve_description, OpConfig, PlanKey};
use crate::backend::{Backend, DType};
use crate::error::{EinxError, EinxResult, SolveError};
use crate::expr::{Expr, SolvedExpression};
use crate::flatten::{flatten_expressions, unflatten};
use crate::notation::validation::{forbid_concatenation, forbid_markers, require_single, Side};
use crate::notation::{parse_description, Node, SyntaxTree};
use crate::solver::{Equation, Parameters};

/// A compiled arange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArangePlan {
    key: PlanKey,
    output: SolvedExpression,
    /// Length of each range, one per flat input axis.
    ranges: Vec<usize>,
    flat_output: SolvedExpression,
    /// `flat_output` with the marked axis split into one slot per range.
    slots: SolvedExpression,
    stack: FlatRearrange,
    dtype: DType,
}

impl ArangePlan {
    pub fn compile(description: &str, parameters: &Parameters, config: Option<OpConfig>) -> EinxResult<Self> {
        let config = config.unwrap_or_default();
        let key = PlanKey::new("arange", description, &[], parameters, &config);

        // Parse and validate
        let parsed = parse_description(description)?;
        if !parsed.is_elided() {
            require_single(&parsed, Side::Input)?;
            forbid_markers(&parsed, Side::Input)?;
        }
        require_single(&parsed, Side::Output)?;
        forbid_concatenation(&parsed)?;
        let parsed = parsed.with_unmarked_inputs();

        // Solve; the marked output axes must hold one entry per unmarked output axis
        let solved = solve_description(&parsed, &[None], parameters, config.cse, |trees| {
            stacking_equation(&trees[1])
        })?;
        let input = solved.inputs.into_iter().next().unwrap_or_default();
        let output = solved.outputs.into_iter().next().unwrap_or_default();
        tracing::debug!(%input, %output, "arange expressions");

        // Flatten
        let flat_input = flatten_expressions(core::slice::from_ref(&input)).pop().unwrap_or_default();
        let flat_output = flatten_expressions(core::slice::from_ref(&output)).pop().unwrap_or_default();
        let ranges = flat_input.shape();

        // The marked axis becomes one unit-sized slot per range
        let ndim = output.all().filter_map(Expr::as_axis).find(|a| a.marked).map_or(1, |a| a.size);
        let slots = flat_output
            .replace(&|expr| match expr {
                Expr::Axis(axis) if axis.marked => Some(Expr::Composition(vec![Expr::Concatenation(
                    vec![Expr::unnamed(1); ndim],
                )])),
                _ => None,
            })
            .demark();
        let stack = FlatRearrange::new(
            flat_input
                .axes()
                .map(|axis| SolvedExpression::new(vec![Expr::Axis(axis.clone())]))
                .collect(),
            flatten_expressions(core::slice::from_ref(&slots)),
        )?;
        tracing::debug!(
            ranges = ?ranges,
            slots = ?display_all(&stack.outputs),
            "arange flat expressions"
        );

        Ok(Self {
            key,
            output: output.demark(),
            ranges,
            flat_output: flat_output.demark(),
            slots,
            stack,
            dtype: config.dtype,
        })
    }

    pub fn key(&self) -> &PlanKey {
        &self.key
    }

    /// The solved output expression, without markers.
    pub fn output(&self) -> &SolvedExpression {
        &self.output
    }

    pub fn execute<B: Backend>(&self, backend: &B) -> EinxResult<B::Tensor> {
        tracing::debug!(backend = backend.name(), dtype = %self.dtype, "executing arange");
        let ranges = self
            .ranges
            .iter()
            .map(|&n| backend.arange(n, self.dtype))
            .collect::<EinxResult<Vec<_>>>()?;
        let slots = self.stack.apply(backend, ranges)?;

        // Concatenate the slots back into the flat output, then restore its structure
        let flat = unflatten(backend, &self.stack.outputs, slots, core::slice::from_ref(&self.slots))?;
        let mut out = unflatten(
            backend,
            core::slice::from_ref(&self.flat_output),
            flat,
            core::slice::from_ref(&self.output),
        )?;
        out.pop().ok_or_else(|| EinxError::backend("arange produced no tensor"))
    }
}

/// `Composition(marked output items) == [number of unmarked output axes]`.
fn stacking_equation(output: &SyntaxTree) -> Result<Vec<Equation>, SolveError> {
    let mut counts = (0, 0);
    for item in output.items() {
        count_leaves(item, false, &mut counts);
    }
    let (unmarked, marked_count) = counts;
    if marked_count > 1 {
        return Err(SolveError::MarkerCardinality {
            max: 1,
            got: marked_count,
        });
    }
    let marked = Node::Composition(output.marked());
    Ok(vec![Equation::shape(SyntaxTree::new(vec![marked]), vec![unmarked])])
}

fn count_leaves(node: &Node, marked: bool, counts: &mut (usize, usize)) {
    match node {
        Node::Axis(_) | Node::Literal(_) if marked => counts.1 += 1,
        Node::Axis(_) | Node::Literal(_) => counts.0 += 1,
        Node::Marker(inner) => count_leaves(inner, true, counts),
        other => {
            for child in other.children() {
                count_leaves(child, marked, counts);
            }
        }
    }
}

/// Compiles and runs an arange in one call.
pub fn arange<B: Backend>(
    backend: &B,
    description: &str,
    parameters: &Parameters,
    config: Option<OpConfig>,
) -> EinxResult<B::Tensor> {
    ArangePlan::compile(description, parameters, config)?.execute(backend)
}

