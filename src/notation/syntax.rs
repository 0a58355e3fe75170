//! Syntax tree produced by the notation parser.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

/// Name of the hidden axis repeated by a bare `...`.
pub const ANONYMOUS_ELLIPSIS_AXIS: &str = "_anonymous_ellipsis_axis";

/// A single node of an unsolved expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Node {
    /// A named axis, e.g. `b`.
    Axis(String),
    /// An unnamed axis with a literal size, e.g. `2`.
    Literal(usize),
    /// A parenthesized group whose size is the product of its children.
    Composition(Vec<Node>),
    /// Children stacked along one axis, e.g. `(a + b)`.
    Concatenation(Vec<Node>),
    /// A bracket-marked node, e.g. `[c]`.
    Marker(Box<Node>),
    /// A node repeated a solver-determined number of times, e.g. `b...`.
    Ellipsis(Box<Node>),
}

impl Node {
    /// Creates a named axis node.
    pub fn axis(name: impl Into<String>) -> Self {
        Node::Axis(name.into())
    }

    /// Creates an anonymous ellipsis (`...`).
    pub fn anonymous_ellipsis() -> Self {
        Node::Ellipsis(Box::new(Node::axis(ANONYMOUS_ELLIPSIS_AXIS)))
    }

    /// Returns the direct children of this node.
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Axis(_) | Node::Literal(_) => &[],
            Node::Composition(children) | Node::Concatenation(children) => children,
            Node::Marker(inner) | Node::Ellipsis(inner) => core::slice::from_ref(inner.as_ref()),
        }
    }

    /// Returns true if this node or any descendant matches the predicate.
    pub fn any(&self, pred: &impl Fn(&Node) -> bool) -> bool {
        pred(self) || self.children().iter().any(|c| c.any(pred))
    }

    pub fn contains_marker(&self) -> bool {
        self.any(&|n| matches!(n, Node::Marker(_)))
    }

    pub fn contains_concatenation(&self) -> bool {
        self.any(&|n| matches!(n, Node::Concatenation(_)))
    }

    pub fn contains_ellipsis(&self) -> bool {
        self.any(&|n| matches!(n, Node::Ellipsis(_)))
    }

    /// Pushes every axis name in this subtree onto `out`, in order of appearance.
    pub fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        if let Node::Axis(name) = self {
            out.push(name);
        }
        for child in self.children() {
            child.collect_names(out);
        }
    }

    /// Pushes the content of every marker in this subtree onto `out`.
    pub fn collect_marked(&self, out: &mut Vec<Node>) {
        match self {
            Node::Marker(inner) => out.push(inner.as_ref().clone()),
            other => {
                for child in other.children() {
                    child.collect_marked(out);
                }
            }
        }
    }

    /// Removes marked nodes. Groups emptied by the removal disappear too.
    pub fn strip_marked(&self) -> Option<Node> {
        match self {
            Node::Marker(_) => None,
            Node::Axis(_) | Node::Literal(_) => Some(self.clone()),
            Node::Composition(children) => {
                let kept: Vec<Node> = children.iter().filter_map(Node::strip_marked).collect();
                (children.is_empty() || !kept.is_empty()).then_some(Node::Composition(kept))
            }
            Node::Concatenation(children) => {
                let kept: Vec<Node> = children.iter().filter_map(Node::strip_marked).collect();
                (!kept.is_empty()).then_some(Node::Concatenation(kept))
            }
            Node::Ellipsis(inner) => inner.strip_marked().map(|n| Node::Ellipsis(Box::new(n))),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Axis(name) if name == ANONYMOUS_ELLIPSIS_AXIS => Ok(()),
            Node::Axis(name) => write!(f, "{}", name),
            Node::Literal(value) => write!(f, "{}", value),
            Node::Composition(children) => {
                write!(f, "(")?;
                write_joined(f, children, " ")?;
                write!(f, ")")
            }
            Node::Concatenation(children) => {
                write!(f, "(")?;
                write_joined(f, children, " + ")?;
                write!(f, ")")
            }
            Node::Marker(inner) => write!(f, "[{}]", inner),
            Node::Ellipsis(inner) => write!(f, "{}...", inner),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, nodes: &[Node], sep: &str) -> fmt::Result {
    for (i, node) in nodes.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", sep)?;
        }
        write!(f, "{}", node)?;
    }
    Ok(())
}

/// The syntax tree of one expression: the ordered list of its top-level items.
///
/// Each item occupies one dimension, except for ellipses which occupy as many
/// dimensions as the solver assigns to them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SyntaxTree {
    items: Vec<Node>,
}

impl SyntaxTree {
    pub fn new(items: Vec<Node>) -> Self {
        Self { items }
    }

    /// Creates the tree of a single named axis, as used by parameter equations.
    pub fn single_axis(name: impl Into<String>) -> Self {
        Self::new(alloc::vec![Node::axis(name)])
    }

    #[inline]
    pub fn items(&self) -> &[Node] {
        &self.items
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains_marker(&self) -> bool {
        self.items.iter().any(Node::contains_marker)
    }

    pub fn contains_concatenation(&self) -> bool {
        self.items.iter().any(Node::contains_concatenation)
    }

    pub fn contains_ellipsis(&self) -> bool {
        self.items.iter().any(Node::contains_ellipsis)
    }

    /// Returns all axis names in order of appearance (with repetitions).
    pub fn names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        for item in &self.items {
            item.collect_names(&mut out);
        }
        out
    }

    /// Returns the contents of all markers, in order of appearance.
    pub fn marked(&self) -> Vec<Node> {
        let mut out = Vec::new();
        for item in &self.items {
            item.collect_marked(&mut out);
        }
        out
    }

    /// Returns this expression with all marked items removed.
    pub fn unmarked(&self) -> SyntaxTree {
        SyntaxTree::new(self.items.iter().filter_map(Node::strip_marked).collect())
    }
}

impl fmt::Display for SyntaxTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_joined(f, &self.items, " ")
    }
}

impl From<Vec<Node>> for SyntaxTree {
    fn from(items: Vec<Node>) -> Self {
        Self::new(items)
    }
}

/// Renders a tree as a string, for error messages and subexpression keys.
pub(crate) fn render(node: &Node) -> String {
    alloc::format!("{}", node)
}
