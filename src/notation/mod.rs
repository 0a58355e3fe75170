//! Notation parsing and representation.
//!
//! Supports the full description grammar:
//! - Basic: `a b -> b a`
//! - Composition: `b (h w) c -> b h w c`
//! - Markers: `b [c] -> b [d]`
//! - Concatenation: `a, b -> (a + b)`
//! - Ellipsis: `b... c -> c b...`
//! - Elided input: `a b [2]` (implies `a b -> a b [2]`)

mod description;
mod parser;
mod syntax;
pub mod validation;

pub use description::Description;
pub use parser::{parse_description, parse_expression, is_identifier, ARROW};
pub use syntax::{Node, SyntaxTree, ANONYMOUS_ELLIPSIS_AXIS};
pub(crate) use syntax::render;
