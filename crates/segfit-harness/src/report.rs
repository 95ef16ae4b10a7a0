//! Replay report schema.

use serde::{Deserialize, Serialize};

/// Versioned replay report (v1).
///
/// One report per trace replay: operation tallies, checker findings,
/// byte-level integrity results and heap shape at exit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceReportV1 {
    pub version: u32,
    pub workload: String,
    pub seed: u64,
    pub ops_executed: usize,
    pub mallocs: usize,
    pub callocs: usize,
    pub reallocs: usize,
    pub frees: usize,
    pub failed_allocs: usize,
    pub skipped_ops: usize,
    pub checker_runs: usize,
    pub checker_violations: usize,
    pub integrity_failures: usize,
    pub live_at_exit: usize,
    pub peak_heap_bytes: usize,
    pub final_heap_bytes: usize,
    /// Live allocated bytes over heap bytes at exit, in permille.
    pub utilization_permille: u16,
    /// Requests served from the free lists, in permille.
    pub reuse_rate_permille: u16,
}

impl TraceReportV1 {
    /// A replay passes when the checker stayed quiet and no payload byte
    /// was lost.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.checker_violations == 0 && self.integrity_failures == 0
    }

    /// Renders the report as pretty-printed JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}
