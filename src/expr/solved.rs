//! Solved expression node types.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use serde::{Deserialize, Serialize};

/// A leaf dimension with a resolved size.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Axis {
    /// Axis name; `None` for literal axes such as `2`.
    pub name: Option<String>,
    /// Resolved size.
    pub size: usize,
    /// Whether the enclosing operation treats this axis specially.
    pub marked: bool,
}

impl Axis {
    pub fn named(name: impl Into<String>, size: usize) -> Self {
        Self {
            name: Some(name.into()),
            size,
            marked: false,
        }
    }

    pub fn unnamed(size: usize) -> Self {
        Self {
            name: None,
            size,
            marked: false,
        }
    }

    pub fn with_marked(mut self, marked: bool) -> Self {
        self.marked = marked;
        self
    }

    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// A node of a solved expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expr {
    /// A single dimension.
    Axis(Axis),
    /// Children merged into one dimension; size is the product.
    Composition(Vec<Expr>),
    /// Children stacked along one dimension; size is the sum.
    Concatenation(Vec<Expr>),
}

impl Expr {
    pub fn axis(name: impl Into<String>, size: usize) -> Self {
        Expr::Axis(Axis::named(name, size))
    }

    pub fn unnamed(size: usize) -> Self {
        Expr::Axis(Axis::unnamed(size))
    }

    pub fn marked_axis(name: impl Into<String>, size: usize) -> Self {
        Expr::Axis(Axis::named(name, size).with_marked(true))
    }

    /// Returns the size this node occupies along its dimension.
    ///
    /// Group sizes of solved expressions are range-checked by the solver.
    pub fn size(&self) -> usize {
        match self {
            Expr::Axis(axis) => axis.size,
            Expr::Composition(children) => children.iter().map(Expr::size).product(),
            Expr::Concatenation(children) => children.iter().map(Expr::size).sum(),
        }
    }

    /// Returns the direct children of this node.
    pub fn children(&self) -> &[Expr] {
        match self {
            Expr::Axis(_) => &[],
            Expr::Composition(children) | Expr::Concatenation(children) => children,
        }
    }

    #[inline]
    pub fn as_axis(&self) -> Option<&Axis> {
        match self {
            Expr::Axis(axis) => Some(axis),
            _ => None,
        }
    }

    /// An axis is marked by its flag; a group is marked when it is non-empty
    /// and all of its children are marked.
    pub fn is_marked(&self) -> bool {
        match self {
            Expr::Axis(axis) => axis.marked,
            Expr::Composition(children) | Expr::Concatenation(children) => {
                !children.is_empty() && children.iter().all(Expr::is_marked)
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Axis(axis) => {
                if axis.marked {
                    write!(f, "[")?;
                }
                match &axis.name {
                    Some(name) => write!(f, "{}", name)?,
                    None => write!(f, "{}", axis.size)?,
                }
                if axis.marked {
                    write!(f, "]")?;
                }
                Ok(())
            }
            Expr::Composition(children) => {
                write!(f, "(")?;
                write_joined(f, children, " ")?;
                write!(f, ")")
            }
            Expr::Concatenation(children) => {
                write!(f, "(")?;
                write_joined(f, children, " + ")?;
                write!(f, ")")
            }
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, exprs: &[Expr], sep: &str) -> fmt::Result {
    for (i, expr) in exprs.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", sep)?;
        }
        write!(f, "{}", expr)?;
    }
    Ok(())
}

/// A solved root expression: one entry per tensor dimension.
///
/// Equality is structural: same node kinds, names, sizes and markers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SolvedExpression {
    dims: Vec<Expr>,
}

impl SolvedExpression {
    pub fn new(dims: Vec<Expr>) -> Self {
        Self { dims }
    }

    #[inline]
    pub fn dims(&self) -> &[Expr] {
        &self.dims
    }

    /// Number of tensor dimensions.
    #[inline]
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// The tensor shape this expression describes.
    pub fn shape(&self) -> Vec<usize> {
        self.dims.iter().map(Expr::size).collect()
    }

    /// Total number of elements, or `None` if it does not fit in `usize`.
    pub fn num_elements(&self) -> Option<usize> {
        self.dims.iter().map(Expr::size).try_fold(1usize, usize::checked_mul)
    }

    /// Returns true if every dimension is a plain axis.
    pub fn is_flat(&self) -> bool {
        self.dims.iter().all(|d| matches!(d, Expr::Axis(_)))
    }

    /// Returns the leaf axes in order.
    pub fn axes(&self) -> impl Iterator<Item = &Axis> + '_ {
        self.all().filter_map(Expr::as_axis)
    }

    /// Returns the names of the leaf axes in order (`None` for unnamed ones).
    pub fn axis_names(&self) -> Vec<Option<&str>> {
        self.axes().map(Axis::name).collect()
    }

    /// Returns true if some leaf axis has this name.
    pub fn contains(&self, name: &str) -> bool {
        self.axes().any(|a| a.name() == Some(name))
    }
}

impl fmt::Display for SolvedExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_joined(f, &self.dims, " ")
    }
}

impl From<Vec<Expr>> for SolvedExpression {
    fn from(dims: Vec<Expr>) -> Self {
        Self::new(dims)
    }
}
