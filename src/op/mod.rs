//! Operation compilers.
//!
//! Every operation is split in two phases:
//! - `compile` parses the description, solves all axis sizes and checks
//!   axis usage. It never touches tensors and its result is keyed by
//!   [`PlanKey`].
//! - `execute` runs the compiled plan against a [`Backend`](crate::backend::Backend).

mod arange;
mod config;
mod plan;
mod rearrange;
mod util;
mod vmap;

pub use arange::{arange, ArangePlan};
pub use config::OpConfig;
pub use plan::PlanKey;
pub use rearrange::{rearrange, RearrangePlan};
pub use vmap::{vmap, VmapAxis, VmapPlan};

use alloc::format;
use alloc::vec::Vec;

use crate::backend::{Backend, Operand};
use crate::error::{EinxError, EinxResult};
use crate::expr::SolvedExpression;
use crate::notation::{is_identifier, Description, SyntaxTree};
use crate::solver::{solve_with_hook, Equation, Parameters};

/// Solved inputs and outputs of a description.
pub(crate) struct Solved {
    pub inputs: Vec<SolvedExpression>,
    pub outputs: Vec<SolvedExpression>,
}

/// Builds and solves the equation system of a description.
///
/// Inputs with a known shape get a shape fact, deferred inputs and all
/// outputs take part without one.
pub(crate) fn solve_description<F>(
    description: &Description,
    shapes: &[Option<Vec<usize>>],
    parameters: &Parameters,
    cse: bool,
    hook: F,
) -> EinxResult<Solved>
where
    F: FnOnce(&[SyntaxTree]) -> crate::error::SolveResult<Vec<Equation>>,
{
    if let Some((name, _)) = parameters.iter().find(|(name, _)| !is_identifier(name)) {
        return Err(EinxError::parse(format!("invalid parameter name '{}'", name)));
    }

    let num_inputs = description.num_inputs();
    let num_outputs = description.num_outputs();
    check_count(num_inputs, shapes.len())?;
    let mut equations = Vec::with_capacity(num_inputs + num_outputs + parameters.len());
    for (expr, shape) in description.inputs().iter().zip(shapes) {
        equations.push(match shape {
            Some(shape) => Equation::shape(expr.clone(), shape.clone()),
            None => Equation::free(expr.clone()),
        });
    }
    equations.extend(description.outputs().iter().cloned().map(Equation::free));
    equations.extend(parameters.equations());

    let mut solved = solve_with_hook(&equations, cse, hook)?;
    solved.truncate(num_inputs + num_outputs);
    let outputs = solved.split_off(num_inputs);
    Ok(Solved {
        inputs: solved,
        outputs,
    })
}

/// Checks the number of operands and reads their shapes.
pub(crate) fn operand_shapes<B: Backend>(
    backend: &B,
    operands: &[Operand<B::Tensor>],
    expected: usize,
) -> EinxResult<Vec<Option<Vec<usize>>>> {
    check_count(expected, operands.len())?;
    Ok(operands.iter().map(|op| op.shape(backend)).collect())
}

pub(crate) fn check_count(expected: usize, got: usize) -> EinxResult<()> {
    if expected != got {
        return Err(EinxError::InputCount { expected, got });
    }
    Ok(())
}

/// Turns operands into tensors of the solved input shapes.
pub(crate) fn instantiate<B: Backend>(
    backend: &B,
    operands: Vec<Operand<B::Tensor>>,
    inputs: &[SolvedExpression],
) -> EinxResult<Vec<B::Tensor>> {
    check_count(inputs.len(), operands.len())?;
    operands
        .into_iter()
        .zip(inputs)
        .map(|(operand, expr)| {
            let shape = expr.shape();
            let tensor = operand.into_tensor(backend, &shape)?;
            backend.assert_shape(&tensor, &shape)?;
            Ok(tensor)
        })
        .collect()
}
