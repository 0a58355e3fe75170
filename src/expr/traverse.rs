//! Traversal and pure rewriting of solved expressions.

use alloc::vec::Vec;

use super::solved::{Expr, SolvedExpression};

/// Depth-first, parent-before-children iterator over all nodes.
pub struct Iter<'a> {
    stack: Vec<&'a Expr>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Expr;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children().iter().rev());
        Some(node)
    }
}

impl SolvedExpression {
    /// Iterates over every node, parents before children.
    pub fn all(&self) -> Iter<'_> {
        Iter {
            stack: self.dims().iter().rev().collect(),
        }
    }

    /// Rebuilds the tree, substituting every node for which `f` returns a
    /// replacement. Replaced nodes are not descended into.
    pub fn replace(&self, f: &impl Fn(&Expr) -> Option<Expr>) -> SolvedExpression {
        SolvedExpression::new(self.dims().iter().map(|d| replace_node(d, f)).collect())
    }

    /// Rebuilds the tree without the nodes matching `pred`. Groups that
    /// become empty through the removal are dropped as well.
    pub fn remove(&self, pred: &impl Fn(&Expr) -> bool) -> SolvedExpression {
        SolvedExpression::new(self.dims().iter().filter_map(|d| remove_node(d, pred)).collect())
    }

    /// Clears every marker flag.
    pub fn demark(&self) -> SolvedExpression {
        self.replace(&|expr| match expr {
            Expr::Axis(axis) if axis.marked => Some(Expr::Axis(axis.clone().with_marked(false))),
            _ => None,
        })
    }

    /// Keeps only the marked axes.
    pub fn get_marked(&self) -> SolvedExpression {
        self.remove(&|expr| matches!(expr, Expr::Axis(axis) if !axis.marked))
    }

    /// Keeps only the unmarked axes.
    pub fn get_unmarked(&self) -> SolvedExpression {
        self.remove(&|expr| matches!(expr, Expr::Axis(axis) if axis.marked))
    }

    /// Number of marked leaf axes.
    pub fn num_marked(&self) -> usize {
        self.axes().filter(|a| a.marked).count()
    }
}

fn replace_node(expr: &Expr, f: &impl Fn(&Expr) -> Option<Expr>) -> Expr {
    if let Some(replacement) = f(expr) {
        return replacement;
    }
    match expr {
        Expr::Axis(_) => expr.clone(),
        Expr::Composition(children) => {
            Expr::Composition(children.iter().map(|c| replace_node(c, f)).collect())
        }
        Expr::Concatenation(children) => {
            Expr::Concatenation(children.iter().map(|c| replace_node(c, f)).collect())
        }
    }
}

fn remove_node(expr: &Expr, pred: &impl Fn(&Expr) -> bool) -> Option<Expr> {
    if pred(expr) {
        return None;
    }
    match expr {
        Expr::Axis(_) => Some(expr.clone()),
        Expr::Composition(children) => {
            remove_children(children, pred).map(Expr::Composition)
        }
        Expr::Concatenation(children) => {
            remove_children(children, pred).map(Expr::Concatenation)
        }
    }
}

fn remove_children(children: &[Expr], pred: &impl Fn(&Expr) -> bool) -> Option<Vec<Expr>> {
    let kept: Vec<Expr> = children.iter().filter_map(|c| remove_node(c, pred)).collect();
    if kept.is_empty() && !children.is_empty() {
        None
    } else {
        Some(kept)
    }
}
