//! Integration tests for cubek-einx.

mod flatten_tests;
mod parser_tests;
mod proptests;
mod rearrange_tests;
mod solver_tests;
mod vmap_tests;

/// Routes crate logs to the test writer. Filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
