//! vmap tests on the CPU backend.

use cubek_einx::{vmap, Backend, CpuBackend, EinxError, EinxResult, Operand, Parameters, VmapPlan};
use ndarray::{arr0, array, ArrayD, IxDyn};

type Tensor = ArrayD<f32>;

fn sum_all(xs: Vec<Tensor>) -> EinxResult<Vec<Tensor>> {
    Ok(vec![arr0(xs[0].sum()).into_dyn()])
}

#[test]
fn test_vmap_row_sums() {
    crate::init_tracing();
    let backend = CpuBackend::<f32>::new();
    let x = array![[1.0f32, 2.0, 3.0], [4.0, 5.0, 6.0]].into_dyn();
    let out = vmap(&backend, "b [c] -> b", vec![x.into()], sum_all, &Parameters::new(), None).unwrap();
    assert_eq!(out[0], array![6.0f32, 15.0].into_dyn());
}

#[test]
fn test_vmap_column_sums_transposed_input() {
    let backend = CpuBackend::<f32>::new();
    let x = array![[1.0f32, 2.0, 3.0], [4.0, 5.0, 6.0]].into_dyn();
    let out = vmap(&backend, "[c] b -> b", vec![x.into()], sum_all, &Parameters::new(), None).unwrap();
    assert_eq!(out[0], array![5.0f32, 7.0, 9.0].into_dyn());
}

#[test]
fn test_vmap_marked_output_and_two_inputs() {
    let backend = CpuBackend::<f32>::new();
    let x = array![[1.0f32, 2.0], [3.0, 4.0]].into_dyn();
    let y = array![10.0f32, 20.0].into_dyn();
    let add = |xs: Vec<Tensor>| -> EinxResult<Vec<Tensor>> { Ok(vec![&xs[0] + &xs[1]]) };
    let out = vmap(
        &backend,
        "a [c], [c] -> [c] a",
        vec![x.into(), y.into()],
        add,
        &Parameters::new(),
        None,
    )
    .unwrap();
    assert_eq!(out[0], array![[11.0f32, 13.0], [22.0, 24.0]].into_dyn());
}

#[test]
fn test_vmap_composed_vectorized_axis() {
    let backend = CpuBackend::<f32>::new();
    let x = ArrayD::from_shape_vec(vec![6, 2], (0..12).map(|v| v as f32).collect()).unwrap();
    let plan = VmapPlan::compile(
        "(a b) [c] -> a b",
        &[Some(vec![6, 2])],
        &Parameters::from([("a", 2)]),
        None,
    )
    .unwrap();
    assert_eq!(plan.axes().len(), 2);
    assert_eq!(plan.axes()[0].name, "a");
    let out = plan.execute(&backend, vec![x.into()], &sum_all).unwrap();
    assert_eq!(backend.shape(&out[0]), vec![2, 3]);
    assert_eq!(out[0][[1, 2]], 10.0 + 11.0);
}

#[test]
fn test_vmap_wrong_output_shape_is_contract_error() {
    let backend = CpuBackend::<f32>::new();
    let x = array![[1.0f32, 2.0], [3.0, 4.0]].into_dyn();
    let bad = |xs: Vec<Tensor>| -> EinxResult<Vec<Tensor>> { Ok(vec![xs[0].clone()]) };
    let err = vmap(&backend, "b [c] -> b [d]", vec![x.into()], bad, &Parameters::from([("d", 3)]), None)
        .unwrap_err();
    match err {
        EinxError::BackendContract { expected, got, .. } => {
            assert_eq!(expected, vec![3]);
            assert_eq!(got, vec![2]);
        }
        other => panic!("expected a contract error, got {:?}", other),
    }
}

#[test]
fn test_vmap_wrong_output_count() {
    let backend = CpuBackend::<f32>::new();
    let x = array![[1.0f32, 2.0]].into_dyn();
    let none = |_: Vec<Tensor>| -> EinxResult<Vec<Tensor>> { Ok(vec![]) };
    let err = vmap(&backend, "b [c] -> b", vec![x.into()], none, &Parameters::new(), None).unwrap_err();
    assert_eq!(err, EinxError::OutputArity { expected: 1, got: 0 });
}

#[test]
fn test_vmap_missing_output_axis_fails_before_backend() {
    let err = VmapPlan::compile("b [c] -> [c]", &[Some(vec![2, 3])], &Parameters::new(), None).unwrap_err();
    assert!(matches!(err, EinxError::AxisUsage { .. }));
}

#[test]
fn test_vmap_axis_usage_errors() {
    let p = Parameters::new();
    // marked and unmarked
    let err = VmapPlan::compile("b [b] -> b", &[Some(vec![2, 2])], &p, None).unwrap_err();
    assert!(matches!(err, EinxError::AxisUsage { .. }));
    // nothing to vectorize
    let err = VmapPlan::compile("[c] -> [c]", &[Some(vec![2])], &p, None).unwrap_err();
    assert!(matches!(err, EinxError::AxisUsage { .. }));
    // unnamed unmarked axis
    let err = VmapPlan::compile("b 2 [c] -> b", &[Some(vec![3, 2, 4])], &p, None).unwrap_err();
    assert!(matches!(err, EinxError::AxisUsage { .. }));
}

#[test]
fn test_vmap_input_count() {
    let backend = CpuBackend::<f32>::new();
    let x = array![1.0f32].into_dyn();
    let err = vmap(&backend, "a, a -> a", vec![x.into()], sum_all, &Parameters::new(), None).unwrap_err();
    assert_eq!(err, EinxError::InputCount { expected: 2, got: 1 });
}

#[test]
fn test_vmap_deferred_input() {
    let backend = CpuBackend::<f32>::new();
    let x = array![[1.0f32, 2.0], [3.0, 4.0]].into_dyn();
    let ones = Operand::factory(|shape: &[usize]| Ok(ArrayD::<f32>::ones(shape.to_vec())));
    let add = |xs: Vec<Tensor>| -> EinxResult<Vec<Tensor>> { Ok(vec![&xs[0] + &xs[1]]) };
    let out = vmap(&backend, "b [c], [c] -> b [c]", vec![x.into(), ones], add, &Parameters::new(), None).unwrap();
    assert_eq!(out[0], array![[2.0f32, 3.0], [4.0, 5.0]].into_dyn());
}

#[test]
fn test_vmap_over_empty_axis() {
    let backend = CpuBackend::<f32>::new();
    let x = Tensor::zeros(IxDyn(&[0, 3]));
    let out = vmap(&backend, "b [c] -> b", vec![x.into()], sum_all, &Parameters::new(), None).unwrap();
    assert_eq!(out[0].shape(), &[0]);
}

#[test]
fn test_vmap_over_empty_inner_axis_keeps_marked_output() {
    let backend = CpuBackend::<f32>::new();
    let x = Tensor::zeros(IxDyn(&[2, 0, 3]));
    let y = array![1.0f32, 2.0, 3.0].into_dyn();
    let add = |xs: Vec<Tensor>| -> EinxResult<Vec<Tensor>> { Ok(vec![&xs[0] + &xs[1]]) };
    let out = vmap(
        &backend,
        "a b [c], [c] -> b [c] a",
        vec![x.into(), y.into()],
        add,
        &Parameters::new(),
        None,
    )
    .unwrap();
    assert_eq!(out[0].shape(), &[0, 3, 2]);
}
