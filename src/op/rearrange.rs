//! `rearrange`: reshape, transpose, concatenate and broadcast by notation.
//!
//! `"b (h w) c -> b h w c"`, `"a, b -> (a + b)"`, `"a -> a b"`.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use super::util::{assignment, transpose_broadcast};
use super::{check_count, instantiate, operand_shapes, solve_description, OpConfig, PlanKey};
use crate::backend::{Backend, Operand};
use crate::error::{EinxError, EinxResult};
use crate::expr::SolvedExpression;
use crate::flatten::{flatten, flatten_expressions, unflatten};
use crate::notation::parse_description;
use crate::notation::validation::{forbid_markers, require_arrow, Side};
use crate::solver::Parameters;

/// A compiled rearrangement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RearrangePlan {
    key: PlanKey,
    inputs: Vec<SolvedExpression>,
    outputs: Vec<SolvedExpression>,
    flat: FlatRearrange,
}

/// The rearrangement between flat expressions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct FlatRearrange {
    pub inputs: Vec<SolvedExpression>,
    pub outputs: Vec<SolvedExpression>,
    /// Flat input index feeding each flat output.
    pub sources: Vec<usize>,
}

impl FlatRearrange {
    pub fn new(inputs: Vec<SolvedExpression>, outputs: Vec<SolvedExpression>) -> EinxResult<Self> {
        if inputs.len() != outputs.len() {
            return Err(EinxError::axis_usage(format!(
                "cannot rearrange {} flat input(s) into {} flat output(s)",
                inputs.len(),
                outputs.len()
            )));
        }
        let sources = assignment(&inputs, &outputs)?;
        Ok(Self {
            inputs,
            outputs,
            sources,
        })
    }

    /// Moves every flat input tensor into the layout of its flat output.
    pub fn apply<B: Backend>(&self, backend: &B, tensors: Vec<B::Tensor>) -> EinxResult<Vec<B::Tensor>> {
        check_count(self.inputs.len(), tensors.len())?;
        let mut slots: Vec<Option<B::Tensor>> = tensors.into_iter().map(Some).collect();
        self.outputs
            .iter()
            .zip(&self.sources)
            .map(|(expr_out, &source)| {
                let tensor = slots[source]
                    .take()
                    .ok_or_else(|| EinxError::backend("flat input consumed twice"))?;
                transpose_broadcast(backend, &self.inputs[source], tensor, expr_out)
            })
            .collect()
    }
}

impl RearrangePlan {
    /// Compiles a rearrangement for inputs of the given shapes (`None` for
    /// deferred inputs).
    pub fn compile(
        description: &str,
        shapes: &[Option<Vec<usize>>],
        parameters: &Parameters,
        config: Option<OpConfig>,
    ) -> EinxResult<Self> {
        let config = config.unwrap_or_default();
        let key = PlanKey::new("rearrange", description, shapes, parameters, &config);

        // Parse and validate
        let parsed = parse_description(description)?;
        require_arrow(&parsed)?;
        forbid_markers(&parsed, Side::Input)?;
        forbid_markers(&parsed, Side::Output)?;

        // Solve
        let solved = solve_description(&parsed, shapes, parameters, config.cse, |_| Ok(Vec::new()))?;
        tracing::debug!(
            inputs = ?display_all(&solved.inputs),
            outputs = ?display_all(&solved.outputs),
            "rearrange expressions"
        );

        // Flatten
        let flat = FlatRearrange::new(
            flatten_expressions(&solved.inputs),
            flatten_expressions(&solved.outputs),
        )?;
        tracing::debug!(
            inputs = ?display_all(&flat.inputs),
            outputs = ?display_all(&flat.outputs),
            sources = ?flat.sources,
            "rearrange flat expressions"
        );

        Ok(Self {
            key,
            inputs: solved.inputs,
            outputs: solved.outputs,
            flat,
        })
    }

    pub fn key(&self) -> &PlanKey {
        &self.key
    }

    pub fn inputs(&self) -> &[SolvedExpression] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[SolvedExpression] {
        &self.outputs
    }

    /// Runs the rearrangement, returning one tensor per output expression.
    pub fn execute<B: Backend>(&self, backend: &B, operands: Vec<Operand<B::Tensor>>) -> EinxResult<Vec<B::Tensor>> {
        tracing::debug!(backend = backend.name(), key = ?self.key, "executing rearrange");
        let tensors = instantiate(backend, operands, &self.inputs)?;
        let (_, flat_in) = flatten(backend, &self.inputs, tensors)?;
        let flat_out = self.flat.apply(backend, flat_in)?;
        unflatten(backend, &self.flat.outputs, flat_out, &self.outputs)
    }
}

/// Compiles and runs a rearrangement in one call.
///
/// # Example
///
/// ```ignore
/// let out = rearrange(&backend, "b (h w) -> b h w", vec![x.into()], &Parameters::from([("h", 2)]), None)?;
/// ```
pub fn rearrange<B: Backend>(
    backend: &B,
    description: &str,
    operands: Vec<Operand<B::Tensor>>,
    parameters: &Parameters,
    config: Option<OpConfig>,
) -> EinxResult<Vec<B::Tensor>> {
    let parsed = parse_description(description)?;
    let shapes = operand_shapes(backend, &operands, parsed.num_inputs())?;
    RearrangePlan::compile(description, &shapes, parameters, config)?.execute(backend, operands)
}

pub(crate) fn display_all(exprs: &[SolvedExpression]) -> Vec<String> {
    exprs.iter().map(|e| format!("{}", e)).collect()
}
