//! Backend capability interface.
//!
//! The compiler never touches tensor data. Every primitive it needs is
//! requested from a [`Backend`], so the same compiled plan can run on any
//! vectorized-execution engine.

#[cfg(feature = "ndarray")]
mod cpu;

#[cfg(feature = "ndarray")]
pub use cpu::{CpuBackend, Element};

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EinxError, EinxResult};

/// Element type requested from [`Backend::arange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DType {
    #[default]
    Int32,
    Int64,
    Float16,
    Float32,
    Float64,
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DType::Int32 => "int32",
            DType::Int64 => "int64",
            DType::Float16 => "float16",
            DType::Float32 => "float32",
            DType::Float64 => "float64",
        };
        write!(f, "{}", name)
    }
}

/// A tensor-to-tensor callable, as passed to and returned from [`Backend::vmap`].
pub type TensorFn<'a, T> = Box<dyn Fn(Vec<T>) -> EinxResult<Vec<T>> + 'a>;

/// Builds a tensor of the requested shape on demand.
pub type Factory<T> = Box<dyn Fn(&[usize]) -> EinxResult<T>>;

/// An operation input: a tensor, or a factory called once the shape is solved.
pub enum Operand<T> {
    Tensor(T),
    Factory(Factory<T>),
}

impl<T> Operand<T> {
    pub fn factory(f: impl Fn(&[usize]) -> EinxResult<T> + 'static) -> Self {
        Operand::Factory(Box::new(f))
    }

    /// Shape of a concrete tensor; `None` for factories.
    pub fn shape<B: Backend<Tensor = T>>(&self, backend: &B) -> Option<Vec<usize>> {
        match self {
            Operand::Tensor(t) => Some(backend.shape(t)),
            Operand::Factory(_) => None,
        }
    }

    /// Returns the tensor, calling the factory with `shape` if needed.
    pub fn into_tensor<B: Backend<Tensor = T>>(self, backend: &B, shape: &[usize]) -> EinxResult<T> {
        match self {
            Operand::Tensor(t) => Ok(t),
            Operand::Factory(f) => backend.instantiate(&f, shape),
        }
    }
}

impl<T> From<T> for Operand<T> {
    fn from(tensor: T) -> Self {
        Operand::Tensor(tensor)
    }
}

impl<T: fmt::Debug> fmt::Debug for Operand<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Tensor(t) => f.debug_tuple("Tensor").field(t).finish(),
            Operand::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// Tensor primitives required by the operation compiler.
///
/// Axis arguments are zero-based positions in the tensor's shape. Failures
/// of the underlying engine are reported as [`EinxError::Backend`].
pub trait Backend {
    type Tensor: Clone;

    fn name(&self) -> &str;

    fn shape(&self, tensor: &Self::Tensor) -> Vec<usize>;

    /// 1-D tensor `[0, 1, ..., n - 1]`.
    fn arange(&self, n: usize, dtype: DType) -> EinxResult<Self::Tensor>;

    /// Row-major reshape; the element count is unchanged.
    fn reshape(&self, tensor: &Self::Tensor, shape: &[usize]) -> EinxResult<Self::Tensor>;

    fn transpose(&self, tensor: &Self::Tensor, permutation: &[usize]) -> EinxResult<Self::Tensor>;

    /// Numpy-style broadcast to `shape`.
    fn broadcast_to(&self, tensor: &Self::Tensor, shape: &[usize]) -> EinxResult<Self::Tensor>;

    fn concatenate(&self, tensors: &[Self::Tensor], axis: usize) -> EinxResult<Self::Tensor>;

    /// Splits `tensor` along `axis` into consecutive parts of the given sizes.
    fn split(&self, tensor: &Self::Tensor, axis: usize, sizes: &[usize]) -> EinxResult<Vec<Self::Tensor>>;

    /// Vectorizes `f` over one axis per argument.
    ///
    /// `in_axes[i]` is the batched axis of the `i`-th input, or `None` if
    /// that input is passed unchanged to every call. `out_axes[j]` is where
    /// the batch axis is inserted into the `j`-th output. `out_shapes[j]` is
    /// the shape of the `j`-th output of a single call, so an empty batch
    /// can be answered without calling `f`.
    fn vmap<'a>(
        &'a self,
        f: TensorFn<'a, Self::Tensor>,
        in_axes: &[Option<usize>],
        out_axes: &[usize],
        out_shapes: &[Vec<usize>],
    ) -> TensorFn<'a, Self::Tensor>;

    fn assert_shape(&self, tensor: &Self::Tensor, expected: &[usize]) -> EinxResult<()> {
        let got = self.shape(tensor);
        if got != expected {
            return Err(EinxError::contract("unexpected tensor shape", expected, &got));
        }
        Ok(())
    }

    /// Calls a deferred-input factory and checks the shape it produced.
    fn instantiate(&self, factory: &Factory<Self::Tensor>, shape: &[usize]) -> EinxResult<Self::Tensor> {
        let tensor = factory(shape)?;
        let got = self.shape(&tensor);
        if got != shape {
            return Err(EinxError::contract("tensor factory returned wrong shape", shape, &got));
        }
        Ok(tensor)
    }
}
