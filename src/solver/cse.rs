//! Common subexpression elimination.
//!
//! A composition such as `(a b)` that occurs several times, and whose axes
//! occur nowhere else, is replaced by one axis named `(a b)`. Its size can
//! then be carried from one expression to another without knowing `a` and
//! `b` individually.

use alloc::string::String;
use alloc::vec::Vec;

use hashbrown::HashMap;

use super::equation::Equation;
use crate::notation::{render, Node, SyntaxTree};

pub(crate) fn eliminate(equations: &mut [Equation]) {
    while let Some(key) = find_candidate(equations) {
        tracing::trace!(subexpression = %key, "eliminating common subexpression");
        for eq in equations.iter_mut().filter(|eq| !eq.is_parameter()) {
            let items = eq.expr.items().iter().map(|n| replace(n, &key)).collect();
            eq.expr = SyntaxTree::new(items);
        }
    }
}

#[derive(Default)]
struct Occurrences {
    count: usize,
    /// Axis names inside one occurrence, with multiplicity.
    names: HashMap<String, usize>,
}

fn find_candidate(equations: &[Equation]) -> Option<String> {
    let mut name_counts: HashMap<&str, usize> = HashMap::new();
    let mut groups: HashMap<String, Occurrences> = HashMap::new();

    for eq in equations {
        for name in eq.expr.names() {
            *name_counts.entry(name).or_insert(0) += 1;
        }
        if !eq.is_parameter() {
            for item in eq.expr.items() {
                visit(item, &mut groups);
            }
        }
    }

    groups
        .into_iter()
        .filter(|(_, occ)| occ.count >= 2)
        .filter(|(_, occ)| {
            occ.names.iter().all(|(name, per_instance)| {
                name_counts.get(name.as_str()).copied().unwrap_or(0) == occ.count * per_instance
            })
        })
        .map(|(key, _)| key)
        .max_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
}

fn visit(node: &Node, groups: &mut HashMap<String, Occurrences>) {
    if is_eligible(node) {
        let occ = groups.entry(render(node)).or_default();
        occ.count += 1;
        if occ.names.is_empty() {
            let mut names = Vec::new();
            node.collect_names(&mut names);
            for name in names {
                *occ.names.entry(String::from(name)).or_insert(0) += 1;
            }
        }
    }
    for child in node.children() {
        visit(child, groups);
    }
}

/// Compositions of at least two named axes without markers, literals,
/// concatenations or ellipses.
fn is_eligible(node: &Node) -> bool {
    match node {
        Node::Composition(children) => {
            children.len() >= 2
                && !node.any(&|n| {
                    matches!(
                        n,
                        Node::Literal(_) | Node::Marker(_) | Node::Concatenation(_) | Node::Ellipsis(_)
                    )
                })
        }
        _ => false,
    }
}

fn replace(node: &Node, key: &str) -> Node {
    match node {
        Node::Composition(children) => {
            if is_eligible(node) && render(node) == key {
                Node::Axis(String::from(key))
            } else {
                Node::Composition(children.iter().map(|c| replace(c, key)).collect())
            }
        }
        Node::Concatenation(children) => {
            Node::Concatenation(children.iter().map(|c| replace(c, key)).collect())
        }
        Node::Marker(inner) => Node::Marker(alloc::boxed::Box::new(replace(inner, key))),
        Node::Ellipsis(inner) => Node::Ellipsis(alloc::boxed::Box::new(replace(inner, key))),
        Node::Axis(_) | Node::Literal(_) => node.clone(),
    }
}
