//! Trace replay engine.
//!
//! Replays a trace against a fresh heap. Every live block's payload is
//! filled with an id-derived pattern at allocation time and verified before
//! every free and resize, so any cross-block scribble the allocator commits
//! shows up as an integrity failure even between checker runs.

use std::collections::HashMap;

use segfit_core::{check, HeapConfig, HeapError, HeapState};

use crate::report::TraceReportV1;
use crate::trace::{TraceFileV1, TraceOp};

#[derive(Debug, Clone, Copy)]
struct LiveBlock {
    ptr: usize,
    size: usize,
    pattern: u8,
}

fn pattern_for(id: u64) -> u8 {
    (id % 251) as u8 ^ 0x5A
}

/// Replays traces and produces [`TraceReportV1`] reports.
pub struct TraceRunner {
    /// Run the checker every N operations; 0 disables periodic checks
    /// (explicit `Check` ops still run it).
    pub check_every: usize,
}

impl TraceRunner {
    #[must_use]
    pub fn new(check_every: usize) -> Self {
        Self { check_every }
    }

    /// Replays `trace` against a fresh heap built from `config`.
    pub fn replay(
        &self,
        trace: &TraceFileV1,
        config: HeapConfig,
    ) -> Result<TraceReportV1, HeapError> {
        let mut heap = HeapState::new(config)?;
        let mut live: HashMap<u64, LiveBlock> = HashMap::new();

        let mut report = TraceReportV1 {
            version: 1,
            workload: trace.workload.clone(),
            seed: trace.seed,
            ops_executed: 0,
            mallocs: 0,
            callocs: 0,
            reallocs: 0,
            frees: 0,
            failed_allocs: 0,
            skipped_ops: 0,
            checker_runs: 0,
            checker_violations: 0,
            integrity_failures: 0,
            live_at_exit: 0,
            peak_heap_bytes: 0,
            final_heap_bytes: 0,
            utilization_permille: 0,
            reuse_rate_permille: 0,
        };

        for op in &trace.ops {
            report.ops_executed += 1;
            match *op {
                TraceOp::Malloc { id, size } => {
                    report.mallocs += 1;
                    match heap.malloc(size) {
                        Some(ptr) => {
                            let pattern = pattern_for(id);
                            heap.payload_mut(ptr)[..size].fill(pattern);
                            live.insert(id, LiveBlock { ptr, size, pattern });
                        }
                        None => report.failed_allocs += 1,
                    }
                }
                TraceOp::Calloc {
                    id,
                    count,
                    elem_size,
                } => {
                    report.callocs += 1;
                    match heap.calloc(count, elem_size) {
                        Some(ptr) => {
                            let size = count * elem_size;
                            if !heap.payload(ptr)[..size].iter().all(|&b| b == 0) {
                                report.integrity_failures += 1;
                            }
                            let pattern = pattern_for(id);
                            heap.payload_mut(ptr)[..size].fill(pattern);
                            live.insert(id, LiveBlock { ptr, size, pattern });
                        }
                        None => report.failed_allocs += 1,
                    }
                }
                TraceOp::Realloc { id, size } => {
                    report.reallocs += 1;
                    let Some(old) = live.get(&id).copied() else {
                        report.skipped_ops += 1;
                        continue;
                    };
                    if size == 0 {
                        verify(&heap, &old, &mut report);
                        heap.realloc(old.ptr, 0);
                        live.remove(&id);
                        continue;
                    }
                    verify(&heap, &old, &mut report);
                    match heap.realloc(old.ptr, size) {
                        Some(new_ptr) => {
                            let kept = old.size.min(size);
                            if !heap.payload(new_ptr)[..kept]
                                .iter()
                                .all(|&b| b == old.pattern)
                            {
                                report.integrity_failures += 1;
                            }
                            let pattern = pattern_for(id);
                            heap.payload_mut(new_ptr)[..size].fill(pattern);
                            live.insert(
                                id,
                                LiveBlock {
                                    ptr: new_ptr,
                                    size,
                                    pattern,
                                },
                            );
                        }
                        // Failed resize leaves the original block live.
                        None => report.failed_allocs += 1,
                    }
                }
                TraceOp::Free { id } => {
                    report.frees += 1;
                    match live.remove(&id) {
                        Some(block) => {
                            verify(&heap, &block, &mut report);
                            heap.free(block.ptr);
                        }
                        None => report.skipped_ops += 1,
                    }
                }
                TraceOp::Check => {
                    report.checker_runs += 1;
                    report.checker_violations += check(&heap).len();
                }
            }

            if self.check_every != 0 && report.ops_executed % self.check_every == 0 {
                report.checker_runs += 1;
                report.checker_violations += check(&heap).len();
            }
            if report.ops_executed % 4096 == 0 {
                heap.drain_lifecycle_logs();
            }
        }

        let stats = heap.stats();
        report.live_at_exit = live.len();
        report.peak_heap_bytes = stats.peak_heap_bytes;
        report.final_heap_bytes = stats.heap_bytes;
        report.utilization_permille = if stats.heap_bytes == 0 {
            0
        } else {
            ((stats.total_allocated as u64 * 1000) / stats.heap_bytes as u64) as u16
        };
        report.reuse_rate_permille = stats.reuse_rate_permille;
        Ok(report)
    }
}

fn verify(heap: &HeapState, block: &LiveBlock, report: &mut TraceReportV1) {
    if !heap.payload(block.ptr)[..block.size]
        .iter()
        .all(|&b| b == block.pattern)
    {
        report.integrity_failures += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::TraceOp;

    fn run(ops: Vec<TraceOp>) -> TraceReportV1 {
        let trace = TraceFileV1 {
            version: 1,
            workload: "handwritten".to_string(),
            seed: 0,
            ops,
        };
        TraceRunner::new(1)
            .replay(&trace, HeapConfig::default())
            .expect("replay")
    }

    #[test]
    fn test_replay_counts_operations() {
        let report = run(vec![
            TraceOp::Malloc { id: 1, size: 100 },
            TraceOp::Calloc {
                id: 2,
                count: 10,
                elem_size: 8,
            },
            TraceOp::Realloc { id: 1, size: 300 },
            TraceOp::Free { id: 1 },
            TraceOp::Free { id: 2 },
            TraceOp::Check,
        ]);
        assert_eq!(report.mallocs, 1);
        assert_eq!(report.callocs, 1);
        assert_eq!(report.reallocs, 1);
        assert_eq!(report.frees, 2);
        assert_eq!(report.live_at_exit, 0);
        assert_eq!(report.skipped_ops, 0);
        assert!(report.checker_runs >= 7);
        assert!(report.passed(), "{report:?}");
    }

    #[test]
    fn test_replay_skips_unknown_ids() {
        let report = run(vec![
            TraceOp::Free { id: 99 },
            TraceOp::Realloc { id: 98, size: 64 },
        ]);
        assert_eq!(report.skipped_ops, 2);
        assert!(report.passed());
    }

    #[test]
    fn test_replay_surfaces_exhaustion_as_failed_allocs() {
        let trace = TraceFileV1 {
            version: 1,
            workload: "oom".to_string(),
            seed: 0,
            ops: vec![
                TraceOp::Malloc { id: 1, size: 64 },
                TraceOp::Malloc {
                    id: 2,
                    size: 1 << 20,
                },
            ],
        };
        let report = TraceRunner::new(0)
            .replay(
                &trace,
                HeapConfig {
                    max_heap: 4096,
                    ..HeapConfig::default()
                },
            )
            .expect("replay");
        assert_eq!(report.failed_allocs, 1);
        assert_eq!(report.live_at_exit, 1);
        assert!(report.passed());
    }
}
