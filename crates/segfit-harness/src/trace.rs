//! Allocation trace schema and synthetic workload generation.
//!
//! Traces name blocks by client-chosen ids; the runner maps ids to payload
//! offsets at replay time, so a trace is independent of any particular heap
//! layout.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// A single operation in an allocation trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TraceOp {
    Malloc { id: u64, size: usize },
    Calloc { id: u64, count: usize, elem_size: usize },
    Realloc { id: u64, size: usize },
    Free { id: u64 },
    Check,
}

/// Versioned trace file schema (v1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceFileV1 {
    pub version: u32,
    pub workload: String,
    pub seed: u64,
    pub ops: Vec<TraceOp>,
}

/// Synthetic workload families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Workload {
    /// Random mix of malloc, free and realloc over a bounded live set.
    RandomChurn,
    /// Fill a batch of allocations, then drain it, repeatedly.
    Sawtooth,
    /// Sizes hugging size-class boundaries, including the inverted pair.
    SizeClassThrash,
}

impl Workload {
    pub fn as_str(self) -> &'static str {
        match self {
            Workload::RandomChurn => "random_churn",
            Workload::Sawtooth => "sawtooth",
            Workload::SizeClassThrash => "size_class_thrash",
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    fn new(seed: u64) -> Self {
        // A zero state would stick at zero.
        Self {
            state: seed | 0x9E37_79B9_7F4A_7C15,
        }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    fn gen_range(&mut self, low: usize, high_inclusive: usize) -> usize {
        let span = high_inclusive - low + 1;
        low + (self.next_u64() as usize % span)
    }
}

/// Generates a deterministic trace of roughly `ops` operations.
#[must_use]
pub fn synthesize(workload: Workload, ops: usize, seed: u64) -> TraceFileV1 {
    let mut rng = XorShift64::new(seed);
    let mut trace = Vec::with_capacity(ops + ops / 64 + 1);
    let mut live: Vec<u64> = Vec::new();
    let mut next_id: u64 = 1;

    while trace.len() < ops {
        match workload {
            Workload::RandomChurn => {
                let roll = rng.next_u64() % 10;
                if roll < 3 && !live.is_empty() {
                    let idx = rng.gen_range(0, live.len() - 1);
                    trace.push(TraceOp::Free { id: live.swap_remove(idx) });
                } else if roll < 5 && !live.is_empty() {
                    let idx = rng.gen_range(0, live.len() - 1);
                    trace.push(TraceOp::Realloc {
                        id: live[idx],
                        size: rng.gen_range(1, 4096),
                    });
                } else if roll < 6 {
                    let id = next_id;
                    next_id += 1;
                    live.push(id);
                    trace.push(TraceOp::Calloc {
                        id,
                        count: rng.gen_range(1, 64),
                        elem_size: rng.gen_range(1, 32),
                    });
                } else {
                    let id = next_id;
                    next_id += 1;
                    live.push(id);
                    trace.push(TraceOp::Malloc {
                        id,
                        size: rng.gen_range(1, 4096),
                    });
                }
            }
            Workload::Sawtooth => {
                let batch = rng.gen_range(16, 64);
                for _ in 0..batch {
                    let id = next_id;
                    next_id += 1;
                    live.push(id);
                    trace.push(TraceOp::Malloc {
                        id,
                        size: rng.gen_range(1, 512),
                    });
                }
                while let Some(id) = live.pop() {
                    trace.push(TraceOp::Free { id });
                }
            }
            Workload::SizeClassThrash => {
                const EDGES: [usize; 12] = [
                    15, 16, 17, 24, 25, 48, 128, 4096, 9200, 32000, 33000, 41000,
                ];
                if live.len() >= 32 {
                    let idx = rng.gen_range(0, live.len() - 1);
                    trace.push(TraceOp::Free { id: live.swap_remove(idx) });
                } else {
                    let id = next_id;
                    next_id += 1;
                    live.push(id);
                    trace.push(TraceOp::Malloc {
                        id,
                        size: EDGES[rng.gen_range(0, EDGES.len() - 1)],
                    });
                }
            }
        }
        if trace.len() % 256 == 0 {
            trace.push(TraceOp::Check);
        }
    }

    // Tear down whatever is still live so replays end on an empty heap.
    while let Some(id) = live.pop() {
        trace.push(TraceOp::Free { id });
    }
    trace.push(TraceOp::Check);

    TraceFileV1 {
        version: 1,
        workload: workload.as_str().to_string(),
        seed,
        ops: trace,
    }
}
