//! Property-based tests for the solver and the flatten transformer.

use cubek_einx::flatten::{flatten, unflatten};
use cubek_einx::notation::parse_expression;
use cubek_einx::solver::{solve, Equation, ParamValue};
use cubek_einx::{Backend, CpuBackend, DType, SolvedExpression};
use proptest::prelude::*;
use std::collections::BTreeMap;

// ===== Strategies =====

/// Sizes for the axes a, b, c, d.
fn arb_sizes() -> impl Strategy<Value = [usize; 4]> {
    [1usize..5, 1usize..5, 1usize..5, 1usize..5]
}

/// Expressions over a, b, c, d mixing compositions and concatenations.
fn arb_layout() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("a b c d"),
        Just("(a b) c d"),
        Just("a (b c d)"),
        Just("(a + b) (c d)"),
        Just("((a b) + c) d"),
        Just("(a + (b c)) (d + 1)"),
        Just("(a b + c d)"),
    ]
}

fn equations(layout: &str, sizes: [usize; 4]) -> Vec<Equation> {
    let mut eqs = vec![Equation::free(parse_expression(layout).unwrap())];
    for (name, size) in ["a", "b", "c", "d"].into_iter().zip(sizes) {
        eqs.push(Equation::parameter(name, &ParamValue::Scalar(size)));
    }
    eqs
}

/// Several shape-bearing equations over one image-like layout.
fn arb_image_system() -> impl Strategy<Value = Vec<Equation>> {
    (1usize..4, 1usize..4, 1usize..4, 1usize..4).prop_flat_map(|(b, h, w, c)| {
        let shape = |expr: &str, shape: Vec<usize>| Equation::shape(parse_expression(expr).unwrap(), shape);
        let free = |expr: &str| Equation::free(parse_expression(expr).unwrap());
        Just(vec![
            shape("b (h w) c", vec![b, h * w, c]),
            shape("c b", vec![c, b]),
            free("b h w c"),
            free("(b c) w h"),
            free("(h + w) (c b)"),
            Equation::parameter("h", &ParamValue::Scalar(h)),
        ])
        .prop_shuffle()
    })
}

/// Solved expressions of every non-parameter equation, keyed by their text.
fn solved_by_expression(eqs: &[Equation], solved: &[SolvedExpression]) -> BTreeMap<String, SolvedExpression> {
    eqs.iter()
        .zip(solved)
        .filter(|(eq, _)| !eq.is_parameter())
        .map(|(eq, expr)| (eq.expr.to_string(), expr.clone()))
        .collect()
}

// ===== Property Tests =====

proptest! {
    #[test]
    fn prop_solving_is_order_independent(layout in arb_layout(), sizes in arb_sizes(), rotate in 0usize..5) {
        let eqs = equations(layout, sizes);
        let mut rotated = eqs.clone();
        rotated.rotate_left(rotate);

        let expected = solve(&eqs, true).unwrap();
        let got = solve(&rotated, true).unwrap();
        prop_assert_eq!(solved_by_expression(&eqs, &expected), solved_by_expression(&rotated, &got));
    }

    #[test]
    fn prop_shape_systems_solve_in_any_order(eqs in arb_image_system()) {
        let mut canonical = eqs.clone();
        canonical.sort_by_key(|eq| eq.expr.to_string());
        let expected = solve(&canonical, true).unwrap();
        let got = solve(&eqs, true).unwrap();
        prop_assert_eq!(solved_by_expression(&canonical, &expected), solved_by_expression(&eqs, &got));
    }

    #[test]
    fn prop_cse_does_not_change_shapes(layout in arb_layout(), sizes in arb_sizes()) {
        let eqs = equations(layout, sizes);
        let with = solve(&eqs, true).unwrap();
        let without = solve(&eqs, false).unwrap();
        prop_assert_eq!(with[0].shape(), without[0].shape());
    }

    #[test]
    fn prop_flatten_round_trip(layout in arb_layout(), sizes in arb_sizes()) {
        let backend = CpuBackend::<i32>::new();
        let expr = solve(&equations(layout, sizes), true).unwrap().remove(0);
        let shape = expr.shape();
        let tensor = backend
            .reshape(&backend.arange(expr.num_elements().unwrap(), DType::Int32).unwrap(), &shape)
            .unwrap();

        let (flat_exprs, flat_tensors) = flatten(&backend, &[expr.clone()], vec![tensor.clone()]).unwrap();
        prop_assert!(flat_exprs.iter().all(SolvedExpression::is_flat));
        let restored = unflatten(&backend, &flat_exprs, flat_tensors, &[expr]).unwrap();
        prop_assert_eq!(&restored[0], &tensor);
    }
}

#[test]
fn test_contradictions_are_never_resolved() {
    let eqs = vec![
        Equation::shape(parse_expression("(a b)").unwrap(), vec![6]),
        Equation::parameter("a", &ParamValue::Scalar(4)),
    ];
    assert!(solve(&eqs, true).is_err());
}
