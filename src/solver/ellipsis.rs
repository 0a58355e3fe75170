//! Ellipsis depth resolution and expansion.
//!
//! `b...` repeats `b` as `b.0 b.1 ...`. The number of repetitions is taken
//! from the rank of shape facts and from the length of sequence parameters.
//! All named axes inside one ellipsis share its depth.

use alloc::boxed::Box;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::slice;

use hashbrown::{HashMap, HashSet};

use super::equation::{Equation, Fact};
use crate::error::{SolveError, SolveResult};
use crate::notation::{render, Node, SyntaxTree};

/// Name of the `index`-th repetition of axis `name`.
pub fn expanded_name(name: &str, index: usize) -> String {
    format!("{}.{}", name, index)
}

/// Equations with all ellipses expanded.
pub(crate) struct Expansion {
    pub equations: Vec<Equation>,
    /// Depth of every axis name that appears inside an ellipsis.
    pub depths: HashMap<String, usize>,
}

struct Site {
    /// Depth variables: the axis names inside, or one synthetic key.
    keys: Vec<String>,
    text: String,
    root: bool,
}

pub(crate) fn expand(equations: &[Equation]) -> SolveResult<Expansion> {
    if !equations.iter().any(|eq| eq.expr.contains_ellipsis()) {
        return Ok(Expansion {
            equations: equations.to_vec(),
            depths: HashMap::new(),
        });
    }

    let mut sites: Vec<Vec<Site>> = Vec::with_capacity(equations.len());
    let mut plain: HashSet<String> = HashSet::new();
    for (i, eq) in equations.iter().enumerate() {
        let mut eq_sites = Vec::new();
        if !eq.is_parameter() {
            for item in eq.expr.items() {
                collect_sites(item, i, true, &mut eq_sites, &mut plain)?;
            }
        }
        sites.push(eq_sites);
    }

    for site in sites.iter().flatten() {
        if let Some(key) = site.keys.iter().find(|k| plain.contains(k.as_str())) {
            return Err(SolveError::EllipsisDepth {
                message: format!("axis '{}' is used both with and without ellipsis", key),
            });
        }
    }

    let mut depths: HashMap<String, usize> = HashMap::new();
    loop {
        let mut changed = false;

        for site in sites.iter().flatten() {
            if let Some(depth) = site_depth(site, &depths) {
                changed |= assign(site, depth, &mut depths)?;
            }
        }

        for (eq, eq_sites) in equations.iter().zip(&sites) {
            match &eq.fact {
                Fact::Shape(shape) => {
                    changed |= infer_from_rank(&eq.expr, shape.len(), eq_sites, &mut depths)?;
                }
                Fact::Parameter(values) if values.len() > 1 => {
                    if let Some(name) = eq.parameter_name() {
                        for site in sites.iter().flatten().filter(|s| s.keys.iter().any(|k| k == name)) {
                            changed |= assign(site, values.len(), &mut depths)?;
                        }
                    }
                }
                _ => {}
            }
        }

        if !changed {
            break;
        }
    }

    if let Some(site) = sites.iter().flatten().find(|s| site_depth(s, &depths).is_none()) {
        return Err(SolveError::EllipsisDepth {
            message: format!("cannot determine the depth of '{}'", site.text),
        });
    }

    let expanded = equations
        .iter()
        .zip(&sites)
        .map(|(eq, eq_sites)| {
            let items = match eq.parameter_name().and_then(|n| depths.get(n).map(|&d| (n, d))) {
                Some((name, depth)) => (0..depth)
                    .map(|i| Node::Axis(expanded_name(name, i)))
                    .collect(),
                None => Expander {
                    sites: eq_sites,
                    depths: &depths,
                    next: 0,
                }
                .items(eq.expr.items()),
            };
            Equation::new(SyntaxTree::new(items), eq.fact.clone())
        })
        .collect();

    tracing::trace!(?depths, "resolved ellipsis depths");

    Ok(Expansion {
        equations: expanded,
        depths,
    })
}

fn collect_sites(
    node: &Node,
    equation: usize,
    root: bool,
    sites: &mut Vec<Site>,
    plain: &mut HashSet<String>,
) -> SolveResult<()> {
    match node {
        Node::Ellipsis(inner) => {
            if inner.contains_ellipsis() {
                return Err(SolveError::EllipsisDepth {
                    message: format!("nested ellipsis in '{}'", render(node)),
                });
            }
            let mut names = Vec::new();
            inner.collect_names(&mut names);
            let mut keys: Vec<String> = Vec::new();
            for name in names {
                if !keys.iter().any(|k| k == name) {
                    keys.push(String::from(name));
                }
            }
            if keys.is_empty() {
                keys.push(format!("{}#{}", equation, sites.len()));
            }
            sites.push(Site {
                keys,
                text: render(node),
                root,
            });
        }
        Node::Marker(inner) => collect_sites(inner, equation, root, sites, plain)?,
        Node::Axis(name) => {
            plain.insert(name.clone());
        }
        Node::Literal(_) => {}
        Node::Composition(children) | Node::Concatenation(children) => {
            for child in children {
                collect_sites(child, equation, false, sites, plain)?;
            }
        }
    }
    Ok(())
}

fn site_depth(site: &Site, depths: &HashMap<String, usize>) -> Option<usize> {
    site.keys.iter().find_map(|k| depths.get(k).copied())
}

/// Sets the depth of every key of `site`. Returns true if anything was new.
fn assign(site: &Site, depth: usize, depths: &mut HashMap<String, usize>) -> SolveResult<bool> {
    let mut changed = false;
    for key in &site.keys {
        match depths.get(key) {
            Some(&existing) if existing != depth => {
                return Err(SolveError::EllipsisDepth {
                    message: format!(
                        "'{}' is repeated both {} and {} times",
                        site.text, existing, depth
                    ),
                });
            }
            Some(_) => {}
            None => {
                depths.insert(key.clone(), depth);
                changed = true;
            }
        }
    }
    Ok(changed)
}

fn is_ellipsis_item(node: &Node) -> bool {
    match node {
        Node::Ellipsis(_) => true,
        Node::Marker(inner) => matches!(inner.as_ref(), Node::Ellipsis(_)),
        _ => false,
    }
}

/// Uses the rank of a shape fact to infer the single unknown root ellipsis.
fn infer_from_rank(
    expr: &SyntaxTree,
    rank: usize,
    sites: &[Site],
    depths: &mut HashMap<String, usize>,
) -> SolveResult<bool> {
    let root_sites: Vec<&Site> = sites.iter().filter(|s| s.root).collect();
    if root_sites.is_empty() {
        return Ok(false);
    }

    let fixed = expr.items().iter().filter(|i| !is_ellipsis_item(i)).count();
    let mut known = 0;
    let mut unknown = Vec::new();
    for site in root_sites {
        match site_depth(site, depths) {
            Some(depth) => known += depth,
            None => unknown.push(site),
        }
    }

    let rank_error = |expected| SolveError::RankMismatch {
        expression: format!("{}", expr),
        expected,
        got: rank,
    };

    match unknown.as_slice() {
        [] if fixed + known != rank => Err(rank_error(fixed + known)),
        [site] => {
            let depth = rank
                .checked_sub(fixed + known)
                .ok_or_else(|| rank_error(fixed + known))?;
            assign(site, depth, depths)
        }
        _ => Ok(false),
    }
}

/// Replaces ellipses in one equation, consuming sites in traversal order.
struct Expander<'a> {
    sites: &'a [Site],
    depths: &'a HashMap<String, usize>,
    next: usize,
}

impl Expander<'_> {
    fn take_depth(&mut self) -> usize {
        let depth = self
            .sites
            .get(self.next)
            .and_then(|site| site_depth(site, self.depths))
            .unwrap_or(0);
        self.next += 1;
        depth
    }

    fn items(&mut self, items: &[Node]) -> Vec<Node> {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Node::Ellipsis(inner) => {
                    let depth = self.take_depth();
                    out.extend((0..depth).map(|i| repeat(inner, i)));
                }
                Node::Marker(marked) if matches!(marked.as_ref(), Node::Ellipsis(_)) => {
                    let depth = self.take_depth();
                    if let Node::Ellipsis(inner) = marked.as_ref() {
                        out.extend((0..depth).map(|i| Node::Marker(Box::new(repeat(inner, i)))));
                    }
                }
                other => out.push(self.node(other)),
            }
        }
        out
    }

    fn node(&mut self, node: &Node) -> Node {
        match node {
            Node::Axis(_) | Node::Literal(_) => node.clone(),
            Node::Composition(children) => Node::Composition(self.items(children)),
            Node::Concatenation(children) => Node::Concatenation(
                children
                    .iter()
                    .map(|child| {
                        if is_ellipsis_item(child) {
                            Node::Composition(self.items(slice::from_ref(child)))
                        } else {
                            self.node(child)
                        }
                    })
                    .collect(),
            ),
            Node::Marker(inner) => Node::Marker(Box::new(self.node(inner))),
            Node::Ellipsis(_) => Node::Composition(self.items(slice::from_ref(node))),
        }
    }
}

/// The `index`-th copy of an ellipsis body.
fn repeat(node: &Node, index: usize) -> Node {
    match node {
        Node::Axis(name) => Node::Axis(expanded_name(name, index)),
        Node::Literal(value) => Node::Literal(*value),
        Node::Composition(children) => {
            Node::Composition(children.iter().map(|c| repeat(c, index)).collect())
        }
        Node::Concatenation(children) => {
            Node::Concatenation(children.iter().map(|c| repeat(c, index)).collect())
        }
        Node::Marker(inner) => Node::Marker(Box::new(repeat(inner, index))),
        Node::Ellipsis(inner) => Node::Ellipsis(Box::new(repeat(inner, index))),
    }
}
