//! Helpers shared by the operation compilers.

use alloc::format;
use alloc::vec::Vec;

use smallvec::SmallVec;

use crate::backend::Backend;
use crate::error::{EinxError, EinxResult};
use crate::expr::SolvedExpression;

/// Brings a tensor laid out as flat `expr_in` into the layout of flat `expr_out`.
///
/// Unnamed input axes must have size 1 and are dropped. Named axes are
/// permuted into output order; output axes absent from the input are
/// broadcast.
pub(crate) fn transpose_broadcast<B: Backend>(
    backend: &B,
    expr_in: &SolvedExpression,
    tensor: B::Tensor,
    expr_out: &SolvedExpression,
) -> EinxResult<B::Tensor> {
    let mut tensor = tensor;
    let mut in_axes = Vec::with_capacity(expr_in.ndim());
    for axis in expr_in.axes() {
        match axis.name() {
            Some(name) => in_axes.push((name, axis.size)),
            None if axis.size == 1 => {}
            None => {
                return Err(EinxError::axis_usage(format!(
                    "unnamed axis of size {} in '{}' has no counterpart in '{}'",
                    axis.size, expr_in, expr_out
                )));
            }
        }
    }
    if in_axes.len() != expr_in.ndim() {
        let shape: Vec<usize> = in_axes.iter().map(|(_, size)| *size).collect();
        tensor = backend.reshape(&tensor, &shape)?;
    }

    // Transpose
    let out_names = expr_out.axis_names();
    let mut permutation: SmallVec<[usize; 8]> = SmallVec::new();
    for name in out_names.iter().flatten() {
        if let Some(index) = in_axes.iter().position(|(n, _)| n == name) {
            permutation.push(index);
        }
    }
    if permutation.len() != in_axes.len() {
        let missing: Vec<&str> = in_axes
            .iter()
            .map(|(n, _)| *n)
            .filter(|n| !expr_out.contains(n))
            .collect();
        return Err(EinxError::axis_usage(format!(
            "axes {:?} of '{}' do not appear in '{}'",
            missing, expr_in, expr_out
        )));
    }
    if permutation.iter().enumerate().any(|(i, &p)| i != p) {
        tensor = backend.transpose(&tensor, &permutation)?;
    }

    // Broadcast
    if permutation.len() != expr_out.ndim() {
        let expanded: Vec<usize> = expr_out
            .axes()
            .map(|axis| match axis.name() {
                Some(name) if in_axes.iter().any(|(n, _)| *n == name) => axis.size,
                _ => 1,
            })
            .collect();
        tensor = backend.reshape(&tensor, &expanded)?;
        tensor = backend.broadcast_to(&tensor, &expr_out.shape())?;
    }
    Ok(tensor)
}

/// For each flat output, the first unused flat input whose named axes all
/// appear in that output.
pub(crate) fn assignment(inputs: &[SolvedExpression], outputs: &[SolvedExpression]) -> EinxResult<Vec<usize>> {
    let mut used = alloc::vec![false; inputs.len()];
    outputs
        .iter()
        .map(|output| {
            let index = inputs
                .iter()
                .enumerate()
                .position(|(i, input)| {
                    !used[i] && input.axes().filter_map(|a| a.name()).all(|name| output.contains(name))
                })
                .ok_or_else(|| {
                    EinxError::axis_usage(format!("no input can be rearranged into '{}'", output))
                })?;
            used[index] = true;
            Ok(index)
        })
        .collect()
}
