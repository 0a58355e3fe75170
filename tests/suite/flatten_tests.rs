//! Flatten/unflatten tests on the CPU backend.

use cubek_einx::flatten::{flatten, flatten_expressions, unflatten};
use cubek_einx::notation::parse_expression;
use cubek_einx::solver::{solve, Equation, ParamValue};
use cubek_einx::{Backend, CpuBackend, DType, SolvedExpression};
use pretty_assertions::assert_eq;

fn solved(expr: &str, shape: &[usize], params: &[(&str, usize)]) -> SolvedExpression {
    let mut eqs = vec![Equation::shape(parse_expression(expr).unwrap(), shape.to_vec())];
    eqs.extend(params.iter().map(|(name, value)| Equation::parameter(*name, &ParamValue::Scalar(*value))));
    solve(&eqs, false).unwrap().remove(0)
}

fn rendered(exprs: &[SolvedExpression]) -> Vec<String> {
    exprs.iter().map(|e| e.to_string()).collect()
}

#[test]
fn test_flat_expressions_are_flat() {
    let expr = solved("(a + (b c)) d", &[7, 2], &[("a", 3), ("b", 2)]);
    let flat = flatten_expressions(&[expr]);
    assert!(flat.iter().all(SolvedExpression::is_flat));
    assert_eq!(rendered(&flat), vec!["a d", "b c d"]);
}

#[test]
fn test_round_trip_preserves_elements() {
    let backend = CpuBackend::<i64>::new();
    let expr = solved("(a + 2) (b + 1)", &[5, 4], &[]);
    let tensor = backend.reshape(&backend.arange(20, DType::Int64).unwrap(), &[5, 4]).unwrap();

    let (flat_exprs, flat_tensors) = flatten(&backend, &[expr.clone()], vec![tensor.clone()]).unwrap();
    assert_eq!(flat_tensors.len(), 4);
    for (e, t) in flat_exprs.iter().zip(&flat_tensors) {
        assert_eq!(backend.shape(t), e.shape());
    }

    let restored = unflatten(&backend, &flat_exprs, flat_tensors, &[expr]).unwrap();
    assert_eq!(restored, vec![tensor]);
}

#[test]
fn test_nested_composition_round_trip() {
    let backend = CpuBackend::<i32>::new();
    let expr = solved("((a b) c)", &[24], &[("a", 2), ("b", 3)]);
    let tensor = backend.arange(24, DType::Int32).unwrap();
    let (flat_exprs, flat_tensors) = flatten(&backend, &[expr.clone()], vec![tensor.clone()]).unwrap();
    assert_eq!(flat_exprs[0].to_string(), "a b c");
    let restored = unflatten(&backend, &flat_exprs, flat_tensors, &[expr]).unwrap();
    assert_eq!(restored, vec![tensor]);
}
