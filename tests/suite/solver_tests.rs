//! Solver tests: shapes, parameters, ellipses and failure reporting.

use cubek_einx::notation::parse_expression;
use cubek_einx::solver::{expanded_name, solve, solve_with_hook, Equation, ParamValue};
use cubek_einx::{SolveError, SolvedExpression};
use pretty_assertions::assert_eq;

fn shape(expr: &str, shape: &[usize]) -> Equation {
    Equation::shape(parse_expression(expr).unwrap(), shape.to_vec())
}

fn free(expr: &str) -> Equation {
    Equation::free(parse_expression(expr).unwrap())
}

fn param(name: &str, value: impl Into<ParamValue>) -> Equation {
    Equation::parameter(name, &value.into())
}

fn shapes(solved: &[SolvedExpression]) -> Vec<Vec<usize>> {
    solved.iter().map(SolvedExpression::shape).collect()
}

#[test]
fn test_split_composition_with_parameter() {
    let solved = solve(&[shape("b (h w) c", &[2, 12, 3]), free("b h w c"), param("h", 3)], true).unwrap();
    assert_eq!(solved[1].shape(), vec![2, 3, 4, 3]);
    assert_eq!(solved[0].to_string(), "b (h w) c");
}

#[test]
fn test_concatenation_sizes() {
    let solved = solve(&[shape("a", &[2]), shape("b", &[3]), free("(a + b) c"), param("c", 4)], true).unwrap();
    assert_eq!(solved[2].shape(), vec![5, 4]);
}

#[test]
fn test_contradiction_reports_both_values() {
    let err = solve(&[shape("a b", &[2, 3]), shape("b a", &[2, 3])], true).unwrap_err();
    assert!(matches!(err, SolveError::Contradiction { .. }));
}

#[test]
fn test_parameter_contradiction() {
    let err = solve(&[shape("a", &[4]), param("a", 5)], true).unwrap_err();
    assert_eq!(
        err,
        SolveError::Contradiction {
            axis: "a".into(),
            first: 5,
            second: 4
        }
    );
}

#[test]
fn test_underdetermined() {
    let err = solve(&[free("a b")], true).unwrap_err();
    assert_eq!(
        err,
        SolveError::Underdetermined {
            axes: vec!["a".into(), "b".into()]
        }
    );
}

#[test]
fn test_rank_mismatch() {
    let err = solve(&[shape("a b c", &[1, 2])], true).unwrap_err();
    assert!(matches!(err, SolveError::RankMismatch { expected: 3, got: 2, .. }));
}

#[test]
fn test_ellipsis_depth_from_rank() {
    let solved = solve(&[shape("b... c", &[2, 3, 4]), free("c b...")], true).unwrap();
    assert_eq!(solved[1].shape(), vec![4, 2, 3]);
    assert_eq!(solved[1].to_string(), format!("c {} {}", expanded_name("b", 0), expanded_name("b", 1)));
}

#[test]
fn test_ellipsis_depth_from_sequence_parameter() {
    let solved = solve(&[free("s... c"), param("s", vec![2, 3]), param("c", 1)], true).unwrap();
    assert_eq!(solved[0].shape(), vec![2, 3, 1]);
}

#[test]
fn test_scalar_parameter_applies_to_every_repetition() {
    let solved = solve(&[shape("x y...", &[7, 1, 1]), free("y... x"), param("y", 1)], true).unwrap();
    assert_eq!(solved[1].shape(), vec![1, 1, 7]);
}

#[test]
fn test_anonymous_ellipsis() {
    let solved = solve(&[shape("... c", &[2, 3, 4]), free("c ...")], true).unwrap();
    assert_eq!(solved[1].shape(), vec![4, 2, 3]);
}

#[test]
fn test_ellipsis_rank_conflict() {
    let err = solve(&[shape("b... c", &[2, 3, 4]), shape("b...", &[2])], true).unwrap_err();
    assert!(matches!(err, SolveError::RankMismatch { expected: 2, got: 1, .. }));
}

#[test]
fn test_ellipsis_depth_undetermined() {
    let err = solve(&[free("b... c"), param("c", 2)], true).unwrap_err();
    assert!(matches!(err, SolveError::EllipsisDepth { .. }));
}

#[test]
fn test_cse_toggle_agrees_when_both_succeed() {
    let eqs = [shape("(a b) c", &[6, 2]), free("c (a b)"), free("a b"), param("a", 2)];
    let with = solve(&eqs, true).unwrap();
    let without = solve(&eqs, false).unwrap();
    assert_eq!(shapes(&with), shapes(&without));
}

#[test]
fn test_hook_failure_aborts() {
    let err = solve_with_hook(&[shape("a", &[2])], true, |_| {
        Err(SolveError::MarkerCardinality { max: 1, got: 2 })
    })
    .unwrap_err();
    assert_eq!(err, SolveError::MarkerCardinality { max: 1, got: 2 });
}

#[test]
#[cfg(target_pointer_width = "64")]
fn test_composition_overflow_is_an_error() {
    let err = solve(&[free("(a b)"), param("a", 1usize << 40), param("b", 1usize << 40)], true).unwrap_err();
    assert_eq!(
        err,
        SolveError::Overflow {
            expression: "(a b)".into()
        }
    );
}

#[test]
fn test_concatenation_overflow_is_an_error() {
    let err = solve(&[shape("a", &[usize::MAX]), free("(a + b)"), param("b", 1)], false).unwrap_err();
    assert!(matches!(err, SolveError::Overflow { .. }));
}
