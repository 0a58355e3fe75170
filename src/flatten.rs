//! Flatten/unflatten between structured and flat expressions.
//!
//! A flat expression has only plain axes at its root. Flattening rewrites
//! the first non-axis dimension until none is left:
//! - a composition is reshaped into its children,
//! - a concatenation is split into one tensor per child.
//!
//! Unflattening walks the same sequence backwards, so the two are inverses.

use alloc::vec::Vec;

use crate::backend::Backend;
use crate::error::{EinxError, EinxResult};
use crate::expr::{Expr, SolvedExpression};

enum Step {
    Flat,
    Compose(SolvedExpression),
    Split(usize, Vec<Expr>),
}

fn next_step(expr: &SolvedExpression) -> Step {
    let dims = expr.dims();
    match dims.iter().position(|d| !matches!(d, Expr::Axis(_))) {
        None => Step::Flat,
        Some(i) => match &dims[i] {
            Expr::Composition(children) => Step::Compose(substitute(dims, i, children)),
            Expr::Concatenation(children) => Step::Split(i, children.clone()),
            Expr::Axis(_) => Step::Flat,
        },
    }
}

/// `dims` with position `i` replaced by `with`.
fn substitute(dims: &[Expr], i: usize, with: &[Expr]) -> SolvedExpression {
    let mut out = Vec::with_capacity(dims.len() + with.len());
    out.extend_from_slice(&dims[..i]);
    out.extend_from_slice(with);
    out.extend_from_slice(&dims[i + 1..]);
    SolvedExpression::new(out)
}

/// Flat expressions of `exprs`, in the order [`flatten`] produces tensors.
pub fn flatten_expressions(exprs: &[SolvedExpression]) -> Vec<SolvedExpression> {
    let mut out = Vec::new();
    for expr in exprs {
        flatten_expression_into(expr.clone(), &mut out);
    }
    out
}

fn flatten_expression_into(expr: SolvedExpression, out: &mut Vec<SolvedExpression>) {
    match next_step(&expr) {
        Step::Flat => out.push(expr),
        Step::Compose(inner) => flatten_expression_into(inner, out),
        Step::Split(i, children) => {
            for child in &children {
                flatten_expression_into(substitute(expr.dims(), i, core::slice::from_ref(child)), out);
            }
        }
    }
}

/// Flattens tensors along with their expressions.
pub fn flatten<B: Backend>(
    backend: &B,
    exprs: &[SolvedExpression],
    tensors: Vec<B::Tensor>,
) -> EinxResult<(Vec<SolvedExpression>, Vec<B::Tensor>)> {
    if exprs.len() != tensors.len() {
        return Err(EinxError::InputCount {
            expected: exprs.len(),
            got: tensors.len(),
        });
    }
    let mut flat_exprs = Vec::new();
    let mut flat_tensors = Vec::new();
    for (expr, tensor) in exprs.iter().zip(tensors) {
        flatten_into(backend, expr.clone(), tensor, &mut flat_exprs, &mut flat_tensors)?;
    }
    Ok((flat_exprs, flat_tensors))
}

fn flatten_into<B: Backend>(
    backend: &B,
    expr: SolvedExpression,
    tensor: B::Tensor,
    exprs: &mut Vec<SolvedExpression>,
    tensors: &mut Vec<B::Tensor>,
) -> EinxResult<()> {
    match next_step(&expr) {
        Step::Flat => {
            exprs.push(expr);
            tensors.push(tensor);
        }
        Step::Compose(inner) => {
            let tensor = backend.reshape(&tensor, &inner.shape())?;
            flatten_into(backend, inner, tensor, exprs, tensors)?;
        }
        Step::Split(i, children) => {
            let sizes: Vec<usize> = children.iter().map(Expr::size).collect();
            let parts = backend.split(&tensor, i, &sizes)?;
            for (child, part) in children.iter().zip(parts) {
                let inner = substitute(expr.dims(), i, core::slice::from_ref(child));
                flatten_into(backend, inner, part, exprs, tensors)?;
            }
        }
    }
    Ok(())
}

/// Rebuilds tensors of shape `targets` from the flat tensors produced for them.
///
/// `flat_exprs` must be the flattening of `targets`; every flat tensor is
/// checked against its flat expression first.
pub fn unflatten<B: Backend>(
    backend: &B,
    flat_exprs: &[SolvedExpression],
    flat_tensors: Vec<B::Tensor>,
    targets: &[SolvedExpression],
) -> EinxResult<Vec<B::Tensor>> {
    if flat_exprs.len() != flat_tensors.len() {
        return Err(EinxError::InputCount {
            expected: flat_exprs.len(),
            got: flat_tensors.len(),
        });
    }
    for (expr, tensor) in flat_exprs.iter().zip(&flat_tensors) {
        backend.assert_shape(tensor, &expr.shape())?;
    }

    let mut remaining = flat_tensors.into_iter();
    let tensors = targets
        .iter()
        .map(|target| unflatten_one(backend, target, &mut remaining))
        .collect::<EinxResult<Vec<_>>>()?;
    let leftover = remaining.len();
    if leftover != 0 {
        return Err(EinxError::InputCount {
            expected: flat_exprs.len() - leftover,
            got: flat_exprs.len(),
        });
    }
    Ok(tensors)
}

fn unflatten_one<B: Backend>(
    backend: &B,
    target: &SolvedExpression,
    tensors: &mut impl Iterator<Item = B::Tensor>,
) -> EinxResult<B::Tensor> {
    match next_step(target) {
        Step::Flat => tensors
            .next()
            .ok_or_else(|| EinxError::backend("too few flat tensors to unflatten")),
        Step::Compose(inner) => {
            let tensor = unflatten_one(backend, &inner, tensors)?;
            backend.reshape(&tensor, &target.shape())
        }
        Step::Split(i, children) => {
            let parts = children
                .iter()
                .map(|child| {
                    let inner = substitute(target.dims(), i, core::slice::from_ref(child));
                    unflatten_one(backend, &inner, tensors)
                })
                .collect::<EinxResult<Vec<_>>>()?;
            backend.concatenate(&parts, i)
        }
    }
}
