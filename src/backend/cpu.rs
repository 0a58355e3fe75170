//! CPU reference backend over `ndarray`.

use alloc::boxed::Box;
use alloc::format;
use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use core::marker::PhantomData;

use ndarray::{ArrayD, Axis, IxDyn, Slice};
use num_traits::FromPrimitive;
use smallvec::SmallVec;

use super::{Backend, DType, TensorFn};
use crate::error::{EinxError, EinxResult};

/// Element types supported by [`CpuBackend`].
pub trait Element: Clone + Default + fmt::Debug + FromPrimitive + 'static {
    const DTYPE: DType;
}

impl Element for i32 {
    const DTYPE: DType = DType::Int32;
}

impl Element for i64 {
    const DTYPE: DType = DType::Int64;
}

impl Element for half::f16 {
    const DTYPE: DType = DType::Float16;
}

impl Element for f32 {
    const DTYPE: DType = DType::Float32;
}

impl Element for f64 {
    const DTYPE: DType = DType::Float64;
}

/// Dense, owned, dynamic-rank arrays of a single element type.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuBackend<E> {
    _elem: PhantomData<E>,
}

impl<E: Element> CpuBackend<E> {
    pub fn new() -> Self {
        Self { _elem: PhantomData }
    }
}

fn shape_error(op: &str, err: ndarray::ShapeError) -> EinxError {
    EinxError::backend(format!("{} failed: {}", op, err))
}

impl<E: Element> Backend for CpuBackend<E> {
    type Tensor = ArrayD<E>;

    fn name(&self) -> &str {
        "cpu"
    }

    fn shape(&self, tensor: &ArrayD<E>) -> Vec<usize> {
        tensor.shape().to_vec()
    }

    fn arange(&self, n: usize, dtype: DType) -> EinxResult<ArrayD<E>> {
        if dtype != E::DTYPE {
            return Err(EinxError::backend(format!(
                "arange with dtype {} on a {} backend",
                dtype,
                E::DTYPE
            )));
        }
        let values = (0..n)
            .map(|i| {
                E::from_usize(i).ok_or_else(|| EinxError::backend(format!("{} is not representable as {}", i, dtype)))
            })
            .collect::<EinxResult<Vec<E>>>()?;
        ArrayD::from_shape_vec(IxDyn(&[n]), values).map_err(|e| shape_error("arange", e))
    }

    fn reshape(&self, tensor: &ArrayD<E>, shape: &[usize]) -> EinxResult<ArrayD<E>> {
        Ok(tensor
            .to_shape(IxDyn(shape))
            .map_err(|e| shape_error("reshape", e))?
            .into_owned())
    }

    fn transpose(&self, tensor: &ArrayD<E>, permutation: &[usize]) -> EinxResult<ArrayD<E>> {
        let mut seen = vec![false; tensor.ndim()];
        let valid = permutation.len() == tensor.ndim()
            && permutation
                .iter()
                .all(|&p| p < seen.len() && !core::mem::replace(&mut seen[p], true));
        if !valid {
            return Err(EinxError::backend(format!(
                "invalid permutation {:?} for a tensor of rank {}",
                permutation,
                tensor.ndim()
            )));
        }
        Ok(tensor.clone().permuted_axes(IxDyn(permutation)))
    }

    fn broadcast_to(&self, tensor: &ArrayD<E>, shape: &[usize]) -> EinxResult<ArrayD<E>> {
        tensor
            .broadcast(IxDyn(shape))
            .map(|view| view.to_owned())
            .ok_or_else(|| {
                EinxError::backend(format!("cannot broadcast {:?} to {:?}", tensor.shape(), shape))
            })
    }

    fn concatenate(&self, tensors: &[ArrayD<E>], axis: usize) -> EinxResult<ArrayD<E>> {
        let views: Vec<_> = tensors.iter().map(|t| t.view()).collect();
        ndarray::concatenate(Axis(axis), &views).map_err(|e| shape_error("concatenate", e))
    }

    fn split(&self, tensor: &ArrayD<E>, axis: usize, sizes: &[usize]) -> EinxResult<Vec<ArrayD<E>>> {
        let len = tensor.shape().get(axis).copied().ok_or_else(|| {
            EinxError::backend(format!("split axis {} out of range for rank {}", axis, tensor.ndim()))
        })?;
        if sizes.iter().sum::<usize>() != len {
            return Err(EinxError::backend(format!(
                "split sizes {:?} do not add up to axis length {}",
                sizes, len
            )));
        }
        let mut start = 0isize;
        let mut parts = Vec::with_capacity(sizes.len());
        for &size in sizes {
            let end = start + size as isize;
            parts.push(tensor.slice_axis(Axis(axis), Slice::from(start..end)).to_owned());
            start = end;
        }
        Ok(parts)
    }

    fn vmap<'a>(
        &'a self,
        f: TensorFn<'a, ArrayD<E>>,
        in_axes: &[Option<usize>],
        out_axes: &[usize],
        out_shapes: &[Vec<usize>],
    ) -> TensorFn<'a, ArrayD<E>> {
        let in_axes: SmallVec<[Option<usize>; 4]> = SmallVec::from_slice(in_axes);
        let out_axes: SmallVec<[usize; 4]> = SmallVec::from_slice(out_axes);
        let out_shapes: Vec<Vec<usize>> = out_shapes.to_vec();
        Box::new(move |inputs: Vec<ArrayD<E>>| {
            if inputs.len() != in_axes.len() {
                return Err(EinxError::InputCount {
                    expected: in_axes.len(),
                    got: inputs.len(),
                });
            }

            let mut batch = None;
            for (tensor, axis) in inputs.iter().zip(&in_axes) {
                let Some(axis) = *axis else { continue };
                let len = tensor.shape().get(axis).copied().ok_or_else(|| {
                    EinxError::backend(format!("vmap axis {} out of range for rank {}", axis, tensor.ndim()))
                })?;
                match batch {
                    Some(b) if b != len => {
                        return Err(EinxError::backend(format!(
                            "vmap over axes of different lengths {} and {}",
                            b, len
                        )));
                    }
                    _ => batch = Some(len),
                }
            }
            let batch = batch.ok_or_else(|| EinxError::backend("vmap needs at least one batched input"))?;
            if batch == 0 {
                return empty_outputs(&out_axes, &out_shapes);
            }

            let mut stacked: Vec<Vec<ArrayD<E>>> = vec![Vec::with_capacity(batch); out_axes.len()];
            for i in 0..batch {
                let args = inputs
                    .iter()
                    .zip(&in_axes)
                    .map(|(tensor, axis)| match axis {
                        Some(axis) => tensor.index_axis(Axis(*axis), i).to_owned(),
                        None => tensor.clone(),
                    })
                    .collect();
                let outputs = f(args)?;
                if outputs.len() != out_axes.len() {
                    return Err(EinxError::OutputArity {
                        expected: out_axes.len(),
                        got: outputs.len(),
                    });
                }
                for (parts, output) in stacked.iter_mut().zip(outputs) {
                    parts.push(output);
                }
            }

            stacked
                .iter()
                .zip(&out_axes)
                .map(|(parts, &axis)| {
                    let views: Vec<_> = parts.iter().map(|p| p.view()).collect();
                    ndarray::stack(Axis(axis), &views).map_err(|e| shape_error("stack", e))
                })
                .collect()
        })
    }
}

/// Zero-length results of a vmap over an empty axis.
fn empty_outputs<E: Element>(out_axes: &[usize], out_shapes: &[Vec<usize>]) -> EinxResult<Vec<ArrayD<E>>> {
    if out_axes.len() != out_shapes.len() {
        return Err(EinxError::backend(format!(
            "vmap got {} output axes but {} output shapes",
            out_axes.len(),
            out_shapes.len()
        )));
    }
    out_axes
        .iter()
        .zip(out_shapes)
        .map(|(&axis, shape)| {
            if axis > shape.len() {
                return Err(EinxError::backend(format!(
                    "vmap output axis {} out of range for rank {}",
                    axis,
                    shape.len()
                )));
            }
            let mut shape = shape.clone();
            shape.insert(axis, 0);
            Ok(ArrayD::default(IxDyn(&shape)))
        })
        .collect()
}
