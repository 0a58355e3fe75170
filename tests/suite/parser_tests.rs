//! Parser tests for the description notation.

use cubek_einx::notation::validation::{forbid_concatenation, forbid_markers, require_arrow, Side};
use cubek_einx::notation::{parse_description, parse_expression, Node};
use cubek_einx::EinxError;

#[test]
fn test_parse_transpose() {
    let desc = parse_description("a b -> b a").unwrap();
    assert_eq!(desc.num_inputs(), 1);
    assert_eq!(desc.num_outputs(), 1);
    assert!(!desc.is_elided());
    assert_eq!(desc.to_string(), "a b -> b a");
}

#[test]
fn test_parse_elided_arange() {
    let desc = parse_description("a b [2]").unwrap();
    assert!(desc.is_elided());
    let desc = desc.with_unmarked_inputs();
    assert_eq!(desc.inputs()[0].to_string(), "a b");
    assert_eq!(desc.outputs()[0].to_string(), "a b [2]");
}

#[test]
fn test_parse_multiple_inputs() {
    let desc = parse_description("b [c], b [c] -> b [c]").unwrap();
    assert_eq!(desc.num_inputs(), 2);
    assert_eq!(desc.original(), Some("b [c], b [c] -> b [c]"));
}

#[test]
fn test_parse_composition_and_concatenation() {
    let tree = parse_expression("b (h w) (x + y 2)").unwrap();
    assert_eq!(tree.len(), 3);
    assert!(matches!(&tree.items()[1], Node::Composition(children) if children.len() == 2));
    match &tree.items()[2] {
        Node::Concatenation(children) => {
            assert_eq!(children.len(), 2);
            assert!(matches!(&children[1], Node::Composition(_)));
        }
        other => panic!("expected concatenation, got {:?}", other),
    }
}

#[test]
fn test_parse_ellipsis_forms() {
    assert!(parse_expression("b... c").unwrap().contains_ellipsis());
    assert!(parse_expression("(a b)... c").unwrap().contains_ellipsis());
    assert!(parse_expression("... c").unwrap().contains_ellipsis());
    assert!(parse_expression("[c...]").unwrap().contains_marker());
}

#[test]
fn test_parse_errors() {
    for bad in [
        "a -> b -> c",
        "(a b",
        "a b)",
        "[a [b]]",
        "(a...)...",
        "(a + )",
        "a + b",
        "a $ b",
        "[a]...",
        "",
    ] {
        let result = parse_description(bad);
        assert!(
            matches!(result, Err(EinxError::Parse { .. })),
            "'{}' should not parse, got {:?}",
            bad,
            result
        );
    }
}

#[test]
fn test_validation_rules() {
    let desc = parse_description("a [b] -> (a + c)").unwrap();
    assert!(forbid_markers(&desc, Side::Input).is_err());
    assert!(forbid_markers(&desc, Side::Output).is_ok());
    assert!(forbid_concatenation(&desc).is_err());
    assert!(require_arrow(&desc).is_ok());
    assert!(require_arrow(&parse_description("a [2]").unwrap()).is_err());
}
