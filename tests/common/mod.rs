use schedsim::{SimReport, Simulation, Workload};

/// Initialize tracing from `RUST_LOG`.
///
/// `try_init()` is idempotent: the first call in the process succeeds,
/// subsequent calls are silently ignored.
pub fn setup_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

/// Parse a workload description and run it to completion.
pub fn run_workload(input: &str) -> SimReport {
    setup_test();
    let workload = Workload::parse(input).expect("workload should parse");
    Simulation::run(workload, None)
}

/// The summary lines exactly as the binary would print them.
pub fn summary_lines(report: &SimReport) -> Vec<String> {
    report.summaries.iter().map(|s| s.to_string()).collect()
}

/// Basic accounting sanity that must hold for every finished process:
/// compute, block, and wait ticks cannot exceed the finish time.
pub fn assert_accounting(report: &SimReport) {
    for s in &report.summaries {
        assert!(
            s.run_time + s.block_time + s.wait_time <= s.finished_at,
            "proc {}.{}: run {} + block {} + wait {} exceeds finish time {}",
            s.node.0,
            s.id.0,
            s.run_time,
            s.block_time,
            s.wait_time,
            s.finished_at
        );
    }
}
