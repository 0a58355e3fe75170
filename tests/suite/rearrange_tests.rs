//! rearrange tests on the CPU backend.

use cubek_einx::{rearrange, Backend, CpuBackend, DType, EinxError, Operand, Parameters, RearrangePlan};
use ndarray::{array, ArrayD};

fn operands(tensors: Vec<ArrayD<i32>>) -> Vec<Operand<ArrayD<i32>>> {
    tensors.into_iter().map(Operand::from).collect()
}

fn iota(backend: &CpuBackend<i32>, shape: &[usize]) -> ArrayD<i32> {
    let n = shape.iter().product();
    backend.reshape(&backend.arange(n, DType::Int32).unwrap(), shape).unwrap()
}

#[test]
fn test_rearrange_transpose() {
    let backend = CpuBackend::<i32>::new();
    let x = iota(&backend, &[2, 3]);
    let out = rearrange(&backend, "a b -> b a", vec![x.clone().into()], &Parameters::new(), None).unwrap();
    assert_eq!(out[0], x.t().to_owned());
}

#[test]
fn test_rearrange_split_and_merge() {
    let backend = CpuBackend::<i32>::new();
    let x = iota(&backend, &[2, 6]);
    let out = rearrange(
        &backend,
        "b (h w) -> b w h",
        vec![x.into()],
        &Parameters::from([("h", 2)]),
        None,
    )
    .unwrap();
    assert_eq!(backend.shape(&out[0]), vec![2, 3, 2]);
    assert_eq!(out[0][[1, 2, 1]], 6 + 3 + 2);

    let merged = rearrange(&backend, "b w h -> b (h w)", operands(out), &Parameters::new(), None).unwrap();
    assert_eq!(merged[0], iota(&backend, &[2, 6]));
}

#[test]
fn test_rearrange_concatenate_and_split() {
    let backend = CpuBackend::<i32>::new();
    let a = array![0, 1].into_dyn();
    let b = array![2, 3, 4].into_dyn();
    let out = rearrange(&backend, "a, b -> (a + b)", vec![a.clone().into(), b.clone().into()], &Parameters::new(), None)
        .unwrap();
    assert_eq!(out[0], array![0, 1, 2, 3, 4].into_dyn());

    let parts = rearrange(&backend, "(a + b) -> a, b", operands(out), &Parameters::from([("a", 2)]), None).unwrap();
    assert_eq!(parts, vec![a, b]);
}

#[test]
fn test_rearrange_broadcast() {
    let backend = CpuBackend::<i32>::new();
    let x = array![1, 2].into_dyn();
    let out = rearrange(&backend, "a -> a b 1", vec![x.into()], &Parameters::from([("b", 3)]), None).unwrap();
    assert_eq!(out[0], array![[[1], [1], [1]], [[2], [2], [2]]].into_dyn());
}

#[test]
fn test_rearrange_drops_unit_axis() {
    let backend = CpuBackend::<i32>::new();
    let x = iota(&backend, &[3, 1]);
    let out = rearrange(&backend, "a 1 -> a", vec![x.into()], &Parameters::new(), None).unwrap();
    assert_eq!(out[0], array![0, 1, 2].into_dyn());
}

#[test]
fn test_rearrange_errors() {
    let p = Parameters::new();
    // dropping a named axis
    let err = RearrangePlan::compile("a b -> a", &[Some(vec![2, 3])], &p, None).unwrap_err();
    assert!(matches!(err, EinxError::AxisUsage { .. }));
    // markers are not part of rearrange
    let err = RearrangePlan::compile("a [b] -> a b", &[Some(vec![2, 3])], &p, None).unwrap_err();
    assert!(matches!(err, EinxError::Parse { .. }));
    // flat counts differ
    let err = RearrangePlan::compile("a, b -> a b", &[Some(vec![2]), Some(vec![3])], &p, None).unwrap_err();
    assert!(matches!(err, EinxError::AxisUsage { .. }));
    // wrong shape
    let err = RearrangePlan::compile("a b -> b a", &[Some(vec![2])], &p, None).unwrap_err();
    assert!(matches!(err, EinxError::Solve(_)));
}

#[test]
fn test_rearrange_plan_key_is_stable() {
    let p = Parameters::from([("h", 2)]);
    let k1 = RearrangePlan::compile("b (h w) -> b h w", &[Some(vec![2, 6])], &p, None).unwrap();
    let k2 = RearrangePlan::compile("b (h w) -> b h w", &[Some(vec![2, 6])], &p, None).unwrap();
    assert_eq!(k1.key(), k2.key());
    assert_eq!(k1, k2);
}
