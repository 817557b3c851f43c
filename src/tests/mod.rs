
mod condition_tests;
mod engine_tests;

/// Routes crate log events through the test harness. Opt in with
/// `RUST_LOG=debug cargo test -- --nocapture` to see parse and search events.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
