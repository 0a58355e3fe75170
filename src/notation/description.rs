//! Complete parsed operation description.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use super::syntax::SyntaxTree;

/// A parsed description: input expressions, output expressions and the
/// original string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Description {
    /// Input expressions (empty when elided).
    inputs: Vec<SyntaxTree>,
    /// Output expressions.
    outputs: Vec<SyntaxTree>,
    /// Whether the description had no '->'.
    elided: bool,
    /// Original description string (if available).
    original: Option<String>,
}

impl Description {
    /// Creates a description with explicit inputs and outputs.
    pub fn new(inputs: Vec<SyntaxTree>, outputs: Vec<SyntaxTree>) -> Self {
        Self {
            inputs,
            outputs,
            elided: false,
            original: None,
        }
    }

    /// Creates a description without an input side.
    pub fn elided(outputs: Vec<SyntaxTree>) -> Self {
        Self {
            inputs: Vec::new(),
            outputs,
            elided: true,
            original: None,
        }
    }

    /// Sets the original description string.
    pub fn with_original(mut self, original: impl Into<String>) -> Self {
        self.original = Some(original.into());
        self
    }

    /// Derives the missing input of an elided description by stripping all
    /// marked items from each output.
    ///
    /// `a b [2]` becomes `a b -> a b [2]`.
    pub fn with_unmarked_inputs(mut self) -> Self {
        if self.elided {
            self.inputs = self.outputs.iter().map(SyntaxTree::unmarked).collect();
            self.elided = false;
        }
        self
    }

    #[inline]
    pub fn inputs(&self) -> &[SyntaxTree] {
        &self.inputs
    }

    #[inline]
    pub fn outputs(&self) -> &[SyntaxTree] {
        &self.outputs
    }

    #[inline]
    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    #[inline]
    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }

    /// Returns true if the description had no '->'.
    #[inline]
    pub fn is_elided(&self) -> bool {
        self.elided
    }

    /// Returns the original string, if this description was parsed.
    pub fn original(&self) -> Option<&str> {
        self.original.as_deref()
    }
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_side = |f: &mut fmt::Formatter<'_>, side: &[SyntaxTree]| -> fmt::Result {
            for (i, expr) in side.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", expr)?;
            }
            Ok(())
        };
        if !self.elided {
            write_side(f, &self.inputs)?;
            write!(f, " -> ")?;
        }
        write_side(f, &self.outputs)
    }
}
