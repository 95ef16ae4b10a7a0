//! Synthesized workloads replayed end to end.

use segfit_core::HeapConfig;
use segfit_harness::{synthesize, TraceRunner, Workload};

#[test]
fn synthetic_workloads_replay_clean() {
    for workload in [
        Workload::RandomChurn,
        Workload::Sawtooth,
        Workload::SizeClassThrash,
    ] {
        let trace = synthesize(workload, 2000, 0x1234_5678);
        let report = TraceRunner::new(64)
            .replay(&trace, HeapConfig::default())
            .expect("replay");
        assert!(report.passed(), "{}: {report:?}", trace.workload);
        assert_eq!(report.live_at_exit, 0, "{}", trace.workload);
        assert_eq!(report.skipped_ops, 0, "{}", trace.workload);
        assert!(report.checker_runs > 0);
        assert_eq!(report.ops_executed, trace.ops.len());
    }
}

#[test]
fn replay_is_deterministic() {
    let trace = synthesize(Workload::RandomChurn, 1500, 99);
    let a = TraceRunner::new(128)
        .replay(&trace, HeapConfig::default())
        .unwrap();
    let b = TraceRunner::new(128)
        .replay(&trace, HeapConfig::default())
        .unwrap();
    assert_eq!(a, b);
}
