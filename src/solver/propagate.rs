//! Constraint propagation over axis sizes.
//!
//! Facts seed a table of name → size bindings. Compositions divide and
//! concatenations subtract until no new binding appears.

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use hashbrown::HashMap;

use super::ellipsis::expanded_name;
use super::equation::{Equation, Fact};
use crate::error::{SolveError, SolveResult};
use crate::expr::{Axis, Expr, SolvedExpression};
use crate::notation::{render, Node};

/// Name → size table built during propagation.
#[derive(Debug, Clone, Default)]
pub(crate) struct Bindings {
    values: HashMap<String, usize>,
}

impl Bindings {
    pub fn get(&self, name: &str) -> Option<usize> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn bind(&mut self, name: &str, value: usize) -> SolveResult<()> {
        match self.get(name) {
            Some(existing) if existing != value => Err(SolveError::Contradiction {
                axis: name.to_string(),
                first: existing,
                second: value,
            }),
            Some(_) => Ok(()),
            None => {
                tracing::trace!(axis = name, value, "bound axis");
                self.values.insert(name.to_string(), value);
                Ok(())
            }
        }
    }
}

/// Binds parameter values, spreading them over ellipsis repetitions.
pub(crate) fn seed_parameters(
    equations: &[Equation],
    depths: &HashMap<String, usize>,
    bindings: &mut Bindings,
) -> SolveResult<()> {
    for eq in equations {
        let (Fact::Parameter(values), Some(name)) = (&eq.fact, eq.parameter_name()) else {
            continue;
        };
        match (depths.get(name), values.as_slice()) {
            (Some(&depth), [value]) => {
                for i in 0..depth {
                    bindings.bind(&expanded_name(name, i), *value)?;
                }
            }
            (Some(_), values) => {
                for (i, value) in values.iter().enumerate() {
                    bindings.bind(&expanded_name(name, i), *value)?;
                }
            }
            (None, [value]) => bindings.bind(name, *value)?,
            (None, values) => {
                return Err(SolveError::EllipsisDepth {
                    message: format!(
                        "parameter '{}' has {} values but the axis is not repeated by an ellipsis",
                        name,
                        values.len()
                    ),
                });
            }
        }
    }
    Ok(())
}

/// Applies every equation until the binding table stops growing.
pub(crate) fn propagate(equations: &[Equation], bindings: &mut Bindings) -> SolveResult<()> {
    let mut rounds = 0usize;
    loop {
        let before = bindings.len();
        for eq in equations {
            match &eq.fact {
                Fact::Shape(shape) => {
                    let items = eq.expr.items();
                    if items.len() != shape.len() {
                        return Err(SolveError::RankMismatch {
                            expression: eq.expr.to_string(),
                            expected: items.len(),
                            got: shape.len(),
                        });
                    }
                    for (item, &size) in items.iter().zip(shape) {
                        infer(item, Some(size), bindings)?;
                    }
                }
                Fact::Free => {
                    for item in eq.expr.items() {
                        infer(item, None, bindings)?;
                    }
                }
                Fact::Parameter(_) => {}
            }
        }
        rounds += 1;
        if bindings.len() == before {
            break;
        }
    }
    tracing::trace!(rounds, bound = bindings.len(), "propagation reached fixed point");
    Ok(())
}

#[derive(Clone, Copy)]
enum GroupOp {
    Product,
    Sum,
}

impl GroupOp {
    fn identity(self) -> usize {
        match self {
            GroupOp::Product => 1,
            GroupOp::Sum => 0,
        }
    }

    fn apply(self, acc: usize, size: usize) -> Option<usize> {
        match self {
            GroupOp::Product => acc.checked_mul(size),
            GroupOp::Sum => acc.checked_add(size),
        }
    }
}

/// Returns the size of `node` if it can be determined, binding axes on the way.
fn infer(node: &Node, expected: Option<usize>, bindings: &mut Bindings) -> SolveResult<Option<usize>> {
    match node {
        Node::Axis(name) => {
            if let Some(size) = expected {
                bindings.bind(name, size)?;
            }
            Ok(bindings.get(name))
        }
        Node::Literal(value) => match expected {
            Some(size) if size != *value => Err(SolveError::Contradiction {
                axis: value.to_string(),
                first: *value,
                second: size,
            }),
            _ => Ok(Some(*value)),
        },
        Node::Marker(inner) => infer(inner, expected, bindings),
        Node::Composition(children) => infer_group(node, children, expected, GroupOp::Product, bindings),
        Node::Concatenation(children) => infer_group(node, children, expected, GroupOp::Sum, bindings),
        Node::Ellipsis(_) => Err(SolveError::EllipsisDepth {
            message: format!("unexpanded ellipsis '{}'", render(node)),
        }),
    }
}

fn infer_group(
    node: &Node,
    children: &[Node],
    expected: Option<usize>,
    op: GroupOp,
    bindings: &mut Bindings,
) -> SolveResult<Option<usize>> {
    let sizes: Vec<Option<usize>> = children
        .iter()
        .map(|c| infer(c, None, bindings))
        .collect::<SolveResult<_>>()?;

    let combined = sizes
        .iter()
        .flatten()
        .try_fold(op.identity(), |acc, &size| op.apply(acc, size))
        .ok_or_else(|| SolveError::Overflow {
            expression: render(node),
        })?;
    let unknown: Vec<usize> = sizes
        .iter()
        .enumerate()
        .filter_map(|(i, s)| s.is_none().then_some(i))
        .collect();

    let mismatch = |size: usize| SolveError::Contradiction {
        axis: render(node),
        first: combined,
        second: size,
    };

    match (expected, unknown.as_slice()) {
        (Some(size), []) if size != combined => Err(mismatch(size)),
        (_, []) => Ok(Some(combined)),
        (Some(size), [missing]) => {
            let value = match op {
                GroupOp::Product if combined == 0 => {
                    if size != 0 {
                        return Err(mismatch(size));
                    }
                    None
                }
                GroupOp::Product if size % combined != 0 => return Err(mismatch(size)),
                GroupOp::Product => Some(size / combined),
                GroupOp::Sum => Some(size.checked_sub(combined).ok_or_else(|| mismatch(size))?),
            };
            if let Some(value) = value {
                infer(&children[*missing], Some(value), bindings)?;
            }
            Ok(Some(size))
        }
        (expected, _) => Ok(expected),
    }
}

/// Builds the solved tree of one equation; unbound names are collected.
pub(crate) fn resolve(items: &[Node], bindings: &Bindings, unbound: &mut Vec<String>) -> SolveResult<SolvedExpression> {
    let dims = items
        .iter()
        .map(|item| resolve_node(item, false, bindings, unbound))
        .collect::<SolveResult<Vec<_>>>()?;
    Ok(SolvedExpression::new(dims))
}

fn resolve_node(node: &Node, marked: bool, bindings: &Bindings, unbound: &mut Vec<String>) -> SolveResult<Expr> {
    Ok(match node {
        Node::Axis(name) => {
            let size = bindings.get(name).unwrap_or_else(|| {
                if !unbound.contains(name) {
                    unbound.push(name.clone());
                }
                0
            });
            Expr::Axis(Axis::named(name.clone(), size).with_marked(marked))
        }
        Node::Literal(value) => Expr::Axis(Axis::unnamed(*value).with_marked(marked)),
        Node::Marker(inner) => resolve_node(inner, true, bindings, unbound)?,
        Node::Composition(children) => Expr::Composition(
            children
                .iter()
                .map(|c| resolve_node(c, marked, bindings, unbound))
                .collect::<SolveResult<_>>()?,
        ),
        Node::Concatenation(children) => Expr::Concatenation(
            children
                .iter()
                .map(|c| resolve_node(c, marked, bindings, unbound))
                .collect::<SolveResult<_>>()?,
        ),
        Node::Ellipsis(_) => {
            return Err(SolveError::EllipsisDepth {
                message: format!("unexpanded ellipsis '{}'", render(node)),
            });
        }
    })
}
