//! Notation parser.
//!
//! Parses strings like "b (h w) [c] -> b h w [c]" into structured descriptions.

use alloc::boxed::Box;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::iter::Peekable;
use core::str::CharIndices;

use super::description::Description;
use super::syntax::{Node, SyntaxTree};
use crate::error::{EinxError, EinxResult};

/// Separator between the input and output side of a description.
pub const ARROW: &str = "->";

/// Parses an operation description.
///
/// # Grammar
///
/// ```text
/// description ::= side '->' side | side
/// side        ::= expression (',' expression)*
/// expression  ::= item*
/// item        ::= atom '...'?
/// atom        ::= identifier | integer | '...' | group | marker
/// group       ::= '(' item* ')' | '(' item* ('+' item*)+ ')'
/// marker      ::= '[' item* ']'
/// ```
///
/// Without an arrow, all expressions are returned as outputs and the
/// description is flagged as elided; the operation decides what that means.
///
/// # Examples
///
/// ```ignore
/// let d = parse_description("a b -> b a [2]")?;
/// let d = parse_description("a b [2]")?;  // Elided input
/// let d = parse_description("b [c], b [c] -> b [c]")?;  // Two inputs
/// ```
pub fn parse_description(description: &str) -> EinxResult<Description> {
    let description = description.trim();

    if description.is_empty() {
        return Err(EinxError::parse("empty description"));
    }

    let arrows = description.matches(ARROW).count();
    if arrows > 1 {
        return Err(EinxError::parse(format!(
            "description must contain at most one '{}', got {}",
            ARROW, arrows
        )));
    }

    let parsed = if let Some(arrow_pos) = description.find(ARROW) {
        let inputs = parse_side(&description[..arrow_pos])?;
        let outputs = parse_side(&description[arrow_pos + ARROW.len()..])?;
        Description::new(inputs, outputs)
    } else {
        Description::elided(parse_side(description)?)
    };

    Ok(parsed.with_original(description))
}

/// Parses one comma-separated side of a description.
fn parse_side(side: &str) -> EinxResult<Vec<SyntaxTree>> {
    side.split(',').map(parse_expression).collect()
}

/// Parses a single expression.
pub fn parse_expression(expression: &str) -> EinxResult<SyntaxTree> {
    let mut parser = ExprParser {
        source: expression,
        chars: expression.char_indices().peekable(),
        in_marker: false,
    };
    let mut operands = parser.parse_sequence(None)?;
    // '+' is rejected outside of parentheses, so the top level is a single operand.
    Ok(SyntaxTree::new(operands.pop().unwrap_or_default()))
}

struct ExprParser<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    in_marker: bool,
}

impl ExprParser<'_> {
    /// Parses items until `close` (or end of input), splitting operands on '+'.
    fn parse_sequence(&mut self, close: Option<char>) -> EinxResult<Vec<Vec<Node>>> {
        let mut operands: Vec<Vec<Node>> = alloc::vec![Vec::new()];

        loop {
            self.skip_whitespace();
            let Some(&(pos, c)) = self.chars.peek() else {
                if let Some(close) = close {
                    return Err(self.error(format!("missing closing '{}'", close)));
                }
                break;
            };

            match c {
                c if Some(c) == close => {
                    self.chars.next();
                    break;
                }
                ')' | ']' => {
                    return Err(self.error(format!("unbalanced '{}' at position {}", c, pos)));
                }
                '+' => {
                    if close != Some(')') {
                        return Err(self.error("'+' is only allowed inside parentheses"));
                    }
                    self.chars.next();
                    operands.push(Vec::new());
                }
                '[' => {
                    if self.in_marker {
                        return Err(self.error("nested markers are not allowed"));
                    }
                    self.chars.next();
                    self.in_marker = true;
                    let mut inner = self.parse_sequence(Some(']'))?;
                    self.in_marker = false;
                    if self.peek_ellipsis() {
                        return Err(self.error("'...' cannot follow a marker, write '[x...]' instead"));
                    }
                    let current = operands.last_mut().ok_or_else(|| self.error("empty operand"))?;
                    for node in inner.pop().unwrap_or_default() {
                        current.push(Node::Marker(Box::new(node)));
                    }
                }
                _ => {
                    let atom = self.parse_atom()?;
                    let item = self.parse_ellipsis_suffix(atom)?;
                    operands
                        .last_mut()
                        .ok_or_else(|| self.error("empty operand"))?
                        .push(item);
                }
            }
        }

        Ok(operands)
    }

    fn parse_atom(&mut self) -> EinxResult<Node> {
        let Some(&(pos, c)) = self.chars.peek() else {
            return Err(self.error("unexpected end of expression"));
        };

        match c {
            '(' => {
                self.chars.next();
                let operands = self.parse_sequence(Some(')'))?;
                group(operands).map_err(|message| self.error(message))
            }
            '.' => {
                self.expect_ellipsis()?;
                Ok(Node::anonymous_ellipsis())
            }
            '0'..='9' => {
                let digits = self.take_while(|c| c.is_ascii_digit());
                digits
                    .parse::<usize>()
                    .map(Node::Literal)
                    .map_err(|_| self.error(format!("invalid axis size '{}'", digits)))
            }
            c if is_identifier_start(c) => {
                let name = self.take_while(is_identifier_continue);
                Ok(Node::Axis(name))
            }
            _ => Err(self.error(format!("invalid character '{}' at position {}", c, pos))),
        }
    }

    fn parse_ellipsis_suffix(&mut self, atom: Node) -> EinxResult<Node> {
        if !self.peek_ellipsis() {
            return Ok(atom);
        }
        self.expect_ellipsis()?;
        if atom.contains_ellipsis() {
            return Err(self.error("nested ellipses are not allowed"));
        }
        Ok(Node::Ellipsis(Box::new(atom)))
    }

    fn peek_ellipsis(&mut self) -> bool {
        matches!(self.chars.peek(), Some((_, '.')))
    }

    fn expect_ellipsis(&mut self) -> EinxResult<()> {
        for _ in 0..3 {
            if !matches!(self.chars.next(), Some((_, '.'))) {
                return Err(self.error("incomplete ellipsis, expected '...'"));
            }
        }
        Ok(())
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(&(_, c)) = self.chars.peek() {
            if !pred(c) {
                break;
            }
            out.push(c);
            self.chars.next();
        }
        out
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.chars.peek(), Some((_, c)) if c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn error(&self, message: impl Into<String>) -> EinxError {
        EinxError::parse(format!("{} in '{}'", message.into(), self.source.trim()))
    }
}

/// Builds a composition, or a concatenation when the group contains '+'.
fn group(mut operands: Vec<Vec<Node>>) -> Result<Node, String> {
    if operands.len() == 1 {
        return Ok(Node::Composition(operands.pop().unwrap_or_default()));
    }

    let mut children = Vec::with_capacity(operands.len());
    for mut operand in operands {
        match operand.len() {
            0 => return Err(String::from("empty operand in concatenation")),
            1 => children.extend(operand.pop()),
            _ => children.push(Node::Composition(operand)),
        }
    }
    Ok(Node::Concatenation(children))
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Returns true if `name` can be used as a named axis (and thus as a parameter key).
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(is_identifier_start) && chars.all(is_identifier_continue)
}
