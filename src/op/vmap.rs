//! `vmap`: vectorize a function over the unmarked axes of its inputs.
//!
//! In `"b [c] -> b [d]"` the function sees tensors of shape `(c,)` and must
//! return tensors of shape `(d,)`; the `b` axis is vectorized by the backend.

use alloc::boxed::Box;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::rearrange::display_all;
use super::{instantiate, operand_shapes, solve_description, OpConfig, PlanKey};
use crate::backend::{Backend, Operand, TensorFn};
use crate::error::{EinxError, EinxResult};
use crate::expr::SolvedExpression;
use crate::flatten::{flatten, flatten_expressions, unflatten};
use crate::notation::parse_description;
use crate::notation::validation::require_arrow;
use crate::solver::Parameters;

/// Axis indices of one vectorized axis, in every flat input and output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmapAxis {
    pub name: String,
    pub in_axes: SmallVec<[Option<usize>; 8]>,
    pub out_axes: SmallVec<[usize; 8]>,
    /// Output shapes of one call of the function this axis wraps.
    pub out_shapes: Vec<Vec<usize>>,
}

/// A compiled vmap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmapPlan {
    key: PlanKey,
    inputs: Vec<SolvedExpression>,
    outputs: Vec<SolvedExpression>,
    flat_outputs: Vec<SolvedExpression>,
    /// Marked parts, as seen by the user function.
    func_inputs: Vec<SolvedExpression>,
    func_inputs_flat: Vec<SolvedExpression>,
    func_outputs: Vec<SolvedExpression>,
    /// Outermost first.
    axes: Vec<VmapAxis>,
}

impl VmapPlan {
    pub fn compile(
        description: &str,
        shapes: &[Option<Vec<usize>>],
        parameters: &Parameters,
        config: Option<OpConfig>,
    ) -> EinxResult<Self> {
        let config = config.unwrap_or_default();
        let key = PlanKey::new("vmap", description, shapes, parameters, &config);

        // Parse and solve
        let parsed = parse_description(description)?;
        require_arrow(&parsed)?;
        let solved = solve_description(&parsed, shapes, parameters, config.cse, |_| Ok(Vec::new()))?;
        tracing::debug!(
            inputs = ?display_all(&solved.inputs),
            outputs = ?display_all(&solved.outputs),
            "vmap expressions"
        );

        // Flatten
        let flat_inputs = flatten_expressions(&solved.inputs);
        let flat_outputs = flatten_expressions(&solved.outputs);
        tracing::debug!(
            inputs = ?display_all(&flat_inputs),
            outputs = ?display_all(&flat_outputs),
            "vmap flat expressions"
        );

        let names = vectorized_names(&flat_inputs, &flat_outputs)?;
        let axes = axis_indices(&names, &flat_inputs, &flat_outputs)?;
        for axis in &axes {
            tracing::debug!(
                axis = %axis.name,
                in_axes = ?axis.in_axes,
                out_axes = ?axis.out_axes,
                "vectorizing axis"
            );
        }

        Ok(Self {
            key,
            func_inputs: solved.inputs.iter().map(SolvedExpression::get_marked).collect(),
            func_inputs_flat: flat_inputs.iter().map(SolvedExpression::get_marked).collect(),
            func_outputs: solved.outputs.iter().map(SolvedExpression::get_marked).collect(),
            inputs: solved.inputs,
            outputs: solved.outputs,
            flat_outputs,
            axes,
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

    /// Vectorized axes, outermost first.
    pub fn axes(&self) -> &[VmapAxis] {
        &self.axes
    }

    /// Runs `op` on every combination of vectorized indices.
    ///
    /// `op` receives one tensor per input, shaped like the marked part of
    /// that input, and must return one tensor per output shaped like the
    /// marked part of that output.
    pub fn execute<'a, B, F>(
        &'a self,
        backend: &'a B,
        operands: Vec<Operand<B::Tensor>>,
        op: &'a F,
    ) -> EinxResult<Vec<B::Tensor>>
    where
        B: Backend,
        F: Fn(Vec<B::Tensor>) -> EinxResult<Vec<B::Tensor>>,
    {
        let tensors = instantiate(backend, operands, &self.inputs)?;
        let (_, flat_in) = flatten(backend, &self.inputs, tensors)?;
        tracing::debug!(
            backend = backend.name(),
            shapes = ?flat_in.iter().map(|t| backend.shape(t)).collect::<Vec<_>>(),
            "sending flat tensors to backend vmap"
        );

        let inner: TensorFn<'a, B::Tensor> = Box::new(move |flat_args: Vec<B::Tensor>| {
            let args = unflatten(backend, &self.func_inputs_flat, flat_args, &self.func_inputs)?;
            let results = op(args)?;
            if results.len() != self.func_outputs.len() {
                return Err(EinxError::OutputArity {
                    expected: self.func_outputs.len(),
                    got: results.len(),
                });
            }
            for (i, (expr, tensor)) in self.func_outputs.iter().zip(&results).enumerate() {
                let got = backend.shape(tensor);
                let expected = expr.shape();
                if got != expected {
                    return Err(EinxError::contract(
                        format!("output {} of the vectorized function has the wrong shape", i),
                        &expected,
                        &got,
                    ));
                }
            }
            let (_, flat) = flatten(backend, &self.func_outputs, results)?;
            Ok(flat)
        });

        let f = self
            .axes
            .iter()
            .rev()
            .fold(inner, |f, axis| backend.vmap(f, &axis.in_axes, &axis.out_axes, &axis.out_shapes));
        let flat_out = f(flat_in)?;

        if flat_out.len() != self.flat_outputs.len() {
            return Err(EinxError::OutputArity {
                expected: self.flat_outputs.len(),
                got: flat_out.len(),
            });
        }
        for (tensor, expr) in flat_out.iter().zip(&self.flat_outputs) {
            let got = backend.shape(tensor);
            tracing::debug!(shape = ?got, expr = %expr, "received flat tensor from backend vmap");
            backend.assert_shape(tensor, &expr.shape())?;
        }
        unflatten(backend, &self.flat_outputs, flat_out, &self.outputs)
    }
}

/// Unmarked axes of the flat inputs, in first-seen order.
fn vectorized_names(flat_inputs: &[SolvedExpression], flat_outputs: &[SolvedExpression]) -> EinxResult<Vec<String>> {
    let mut names: Vec<String> = Vec::new();
    for expr in flat_inputs {
        for axis in expr.axes().filter(|a| !a.marked) {
            let Some(name) = axis.name() else {
                return Err(EinxError::axis_usage(format!(
                    "unnamed axis of size {} in '{}' cannot be vectorized; mark it",
                    axis.size, expr
                )));
            };
            if !names.iter().any(|n| n == name) {
                names.push(String::from(name));
            }
        }
    }
    if names.is_empty() {
        return Err(EinxError::axis_usage("no vectorized axes found"));
    }

    for expr in flat_inputs.iter().chain(flat_outputs) {
        for axis in expr.axes() {
            let vectorized = axis.name().is_some_and(|name| names.iter().any(|n| n == name));
            if vectorized == axis.marked {
                let label = axis.name().map_or_else(|| format!("{}", axis.size), String::from);
                return Err(EinxError::axis_usage(if axis.marked {
                    format!("axis '{}' appears both marked and unmarked", label)
                } else {
                    format!("unmarked axis '{}' in '{}' is not an unmarked input axis", label, expr)
                }));
            }
        }
    }
    Ok(names)
}

/// Position of every vectorized axis, removing each one once placed.
fn axis_indices(
    names: &[String],
    flat_inputs: &[SolvedExpression],
    flat_outputs: &[SolvedExpression],
) -> EinxResult<Vec<VmapAxis>> {
    let mut remaining_in: Vec<Vec<Option<&str>>> = flat_inputs.iter().map(SolvedExpression::axis_names).collect();
    let mut remaining_out: Vec<Vec<Option<&str>>> = flat_outputs.iter().map(SolvedExpression::axis_names).collect();
    let mut out_shapes: Vec<Vec<usize>> = flat_outputs.iter().map(SolvedExpression::shape).collect();

    let mut axes = Vec::with_capacity(names.len());
    for name in names {
        let in_axes: SmallVec<_> = remaining_in
            .iter_mut()
            .map(|list| take(list, name))
            .collect();
        let out_axes = remaining_out
            .iter_mut()
            .zip(out_shapes.iter_mut())
            .zip(flat_outputs)
            .map(|((list, shape), expr)| {
                let index = take(list, name).ok_or_else(|| {
                    EinxError::axis_usage(format!(
                        "vectorized axis '{}' does not appear in output '{}'",
                        name, expr
                    ))
                })?;
                shape.remove(index);
                Ok(index)
            })
            .collect::<EinxResult<SmallVec<_>>>()?;
        axes.push(VmapAxis {
            name: name.clone(),
            in_axes,
            out_axes,
            out_shapes: out_shapes.clone(),
        });
    }
    Ok(axes)
}

fn take(list: &mut Vec<Option<&str>>, name: &str) -> Option<usize> {
    let index = list.iter().position(|n| *n == Some(name))?;
    list.remove(index);
    Some(index)
}

/// Compiles and runs a vmap in one call.
///
/// # Example
///
/// ```ignore
/// let sums = vmap(&backend, "b [c] -> b", vec![x.into()], |xs| Ok(vec![sum(&xs[0])]), &Parameters::new(), None)?;
/// ```
pub fn vmap<B, F>(
    backend: &B,
    description: &str,
    operands: Vec<Operand<B::Tensor>>,
    op: F,
    parameters: &Parameters,
    config: Option<OpConfig>,
) -> EinxResult<Vec<B::Tensor>>
where
    B: Backend,
    F: Fn(Vec<B::Tensor>) -> EinxResult<Vec<B::Tensor>>,
{
    let parsed = parse_description(description)?;
    let shapes = operand_shapes(backend, &operands, parsed.num_inputs())?;
    let plan = VmapPlan::compile(description, &shapes, parameters, config)?;
    plan.execute(backend, operands, &op)
}
