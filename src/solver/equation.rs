//! Solver inputs: equations and named parameters.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::notation::SyntaxTree;

/// The external fact an equation's expression must satisfy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fact {
    /// The expression describes a tensor of exactly this shape.
    Shape(Vec<usize>),
    /// The expression is a single named axis with this value.
    ///
    /// A single value applies to every repetition of an ellipsis axis; a
    /// sequence is matched against the repetitions one by one.
    Parameter(Vec<usize>),
    /// No external fact; the expression only takes part in consistency checks.
    Free,
}

/// An expression paired with what is known about it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Equation {
    pub expr: SyntaxTree,
    pub fact: Fact,
}

impl Equation {
    pub fn new(expr: SyntaxTree, fact: Fact) -> Self {
        Self { expr, fact }
    }

    /// The expression must describe a tensor of `shape`.
    pub fn shape(expr: SyntaxTree, shape: impl Into<Vec<usize>>) -> Self {
        Self::new(expr, Fact::Shape(shape.into()))
    }

    /// The axis `name` has the given value(s).
    pub fn parameter(name: impl Into<String>, value: &ParamValue) -> Self {
        Self::new(SyntaxTree::single_axis(name), Fact::Parameter(value.to_vec()))
    }

    /// The expression takes part in the system without a fact of its own.
    pub fn free(expr: SyntaxTree) -> Self {
        Self::new(expr, Fact::Free)
    }

    #[inline]
    pub fn is_parameter(&self) -> bool {
        matches!(self.fact, Fact::Parameter(_))
    }

    /// Name of the axis a parameter equation constrains.
    pub(crate) fn parameter_name(&self) -> Option<&str> {
        match (&self.fact, self.expr.items()) {
            (Fact::Parameter(_), [crate::notation::Node::Axis(name)]) => Some(name.as_str()),
            _ => None,
        }
    }
}

/// Value of a named parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ParamValue {
    Scalar(usize),
    Sequence(Vec<usize>),
}

impl ParamValue {
    pub fn to_vec(&self) -> Vec<usize> {
        match self {
            ParamValue::Scalar(v) => vec![*v],
            ParamValue::Sequence(vs) => vs.clone(),
        }
    }
}

impl From<usize> for ParamValue {
    fn from(value: usize) -> Self {
        ParamValue::Scalar(value)
    }
}

impl From<Vec<usize>> for ParamValue {
    fn from(values: Vec<usize>) -> Self {
        ParamValue::Sequence(values)
    }
}

impl From<&[usize]> for ParamValue {
    fn from(values: &[usize]) -> Self {
        ParamValue::Sequence(values.to_vec())
    }
}

/// Named axis values supplied out-of-band, kept sorted by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Parameters {
    values: BTreeMap<String, ParamValue>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter, replacing any previous value for the same name.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    /// Iterates over the parameters in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> + '_ {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Builds one parameter equation per entry.
    pub fn equations(&self) -> Vec<Equation> {
        self.iter().map(|(name, value)| Equation::parameter(name, value)).collect()
    }
}

impl<const N: usize> From<[(&str, usize); N]> for Parameters {
    fn from(entries: [(&str, usize); N]) -> Self {
        let mut params = Parameters::new();
        for (name, value) in entries {
            params.insert(name, value);
        }
        params
    }
}
