//! Operation-specific structural checks on parsed descriptions.
//!
//! The grammar accepts every construct everywhere; each operation then
//! declares which ones are legal on which side.

use alloc::format;

use super::description::Description;
use super::syntax::SyntaxTree;
use crate::error::{EinxError, EinxResult};

/// Which side of a description a check applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Input,
    Output,
}

impl Side {
    fn label(self) -> &'static str {
        match self {
            Side::Input => "input",
            Side::Output => "output",
        }
    }
}

/// Requires an explicit '->'.
pub fn require_arrow(description: &Description) -> EinxResult<()> {
    if description.is_elided() {
        return Err(EinxError::parse("description must contain exactly one '->'"));
    }
    Ok(())
}

/// Requires exactly one expression on the given side.
pub fn require_single(description: &Description, side: Side) -> EinxResult<()> {
    let count = side_of(description, side).len();
    if count != 1 {
        return Err(EinxError::parse(format!(
            "only a single {} expression is allowed, got {}",
            side.label(),
            count
        )));
    }
    Ok(())
}

/// Rejects markers on the given side.
pub fn forbid_markers(description: &Description, side: Side) -> EinxResult<()> {
    if let Some(expr) = side_of(description, side).iter().find(|e| e.contains_marker()) {
        return Err(EinxError::parse(format!(
            "marker in {} expression '{}' is not allowed",
            side.label(),
            expr
        )));
    }
    Ok(())
}

/// Rejects concatenations anywhere in the description.
pub fn forbid_concatenation(description: &Description) -> EinxResult<()> {
    let mut all = description.inputs().iter().chain(description.outputs());
    if let Some(expr) = all.find(|e| e.contains_concatenation()) {
        return Err(EinxError::parse(format!(
            "concatenation in '{}' is not allowed",
            expr
        )));
    }
    Ok(())
}

fn side_of(description: &Description, side: Side) -> &[SyntaxTree] {
    match side {
        Side::Input => description.inputs(),
        Side::Output => description.outputs(),
    }
}
