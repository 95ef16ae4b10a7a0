//! Fragmentation storm tests: sustained churn workloads with periodic
//! consistency checks and byte-level integrity verification.

use segfit_core::{check, HeapConfig, HeapState};
use serde_json::json;

const TARGET_OPS_RELEASE: usize = 100_000;
const TARGET_OPS_DEBUG: usize = 20_000;

const SLOT_CAPACITY: usize = 256;
const CHECK_INTERVAL: usize = 1024;

#[derive(Clone, Copy, Debug)]
struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    fn new(seed: u64) -> Self {
        Self { state: seed }
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
        assert!(low <= high_inclusive);
        let span = high_inclusive - low + 1;
        low + (self.next_u64() as usize % span)
    }
}

#[derive(Clone, Copy, Debug)]
enum StormType {
    Sawtooth,
    RandomChurn,
    SizeClassThrash,
}

impl StormType {
    fn as_str(self) -> &'static str {
        match self {
            StormType::Sawtooth => "sawtooth",
            StormType::RandomChurn => "random_churn",
            StormType::SizeClassThrash => "size_class_thrash",
        }
    }

    fn pick_size(self, rng: &mut XorShift64) -> usize {
        match self {
            StormType::Sawtooth => rng.gen_range(1, 512),
            StormType::RandomChurn => rng.gen_range(1, 4096),
            StormType::SizeClassThrash => {
                // Sizes hugging class boundaries, including the inverted
                // 40000/32768 pair.
                const EDGES: [usize; 12] = [
                    15, 16, 17, 24, 25, 48, 128, 4096, 9200, 32000, 33000, 41000,
                ];
                EDGES[rng.gen_range(0, EDGES.len() - 1)]
            }
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct AllocationRec {
    ptr: usize,
    size: usize,
    pattern: u8,
}

struct StormRunner {
    heap: HeapState,
    slots: Vec<Option<AllocationRec>>,
    rng: XorShift64,
    ops_count: usize,
    failed_allocs: usize,
    integrity_failures: usize,
    checker_violations: usize,
}

impl StormRunner {
    fn new(seed: u64) -> Self {
        Self {
            heap: HeapState::new(HeapConfig::default()).expect("heap init"),
            slots: vec![None; SLOT_CAPACITY],
            rng: XorShift64::new(seed),
            ops_count: 0,
            failed_allocs: 0,
            integrity_failures: 0,
            checker_violations: 0,
        }
    }

    fn target_ops() -> usize {
        if cfg!(debug_assertions) {
            TARGET_OPS_DEBUG
        } else {
            TARGET_OPS_RELEASE
        }
    }

    fn alloc_into(&mut self, idx: usize, size: usize) {
        match self.heap.malloc(size) {
            Some(ptr) => {
                let pattern = (ptr % 251) as u8;
                self.heap.payload_mut(ptr)[..size].fill(pattern);
                self.slots[idx] = Some(AllocationRec { ptr, size, pattern });
            }
            None => self.failed_allocs += 1,
        }
        self.tick();
    }

    fn free_slot(&mut self, idx: usize) {
        if let Some(rec) = self.slots[idx].take() {
            if !self.heap.payload(rec.ptr)[..rec.size]
                .iter()
                .all(|&b| b == rec.pattern)
            {
                self.integrity_failures += 1;
            }
            self.heap.free(rec.ptr);
        }
        self.tick();
    }

    fn tick(&mut self) {
        self.ops_count += 1;
        if self.ops_count % CHECK_INTERVAL == 0 {
            self.checker_violations += check(&self.heap).len();
        }
        // Keep the lifecycle log from growing without bound over the storm.
        if self.ops_count % 4096 == 0 {
            self.heap.drain_lifecycle_logs();
        }
    }

    fn run(mut self, storm: StormType) -> serde_json::Value {
        let target = Self::target_ops();
        while self.ops_count < target {
            match storm {
                StormType::Sawtooth => {
                    // Fill every slot, then drain them all.
                    for idx in 0..self.slots.len() {
                        if self.slots[idx].is_none() {
                            let size = storm.pick_size(&mut self.rng);
                            self.alloc_into(idx, size);
                        }
                    }
                    for idx in 0..self.slots.len() {
                        self.free_slot(idx);
                    }
                }
                StormType::RandomChurn | StormType::SizeClassThrash => {
                    let idx = self.rng.gen_range(0, self.slots.len() - 1);
                    if self.slots[idx].is_some() {
                        self.free_slot(idx);
                    } else {
                        let size = storm.pick_size(&mut self.rng);
                        self.alloc_into(idx, size);
                    }
                }
            }
        }

        // Drain all remaining slots and verify the heap collapses cleanly.
        for idx in 0..self.slots.len() {
            self.free_slot(idx);
        }
        self.checker_violations += check(&self.heap).len();

        let stats = self.heap.stats();
        assert_eq!(self.integrity_failures, 0, "{}: payload corruption", storm.as_str());
        assert_eq!(self.checker_violations, 0, "{}: checker findings", storm.as_str());
        assert_eq!(stats.active_count, 0, "{}: leaked allocations", storm.as_str());

        json!({
            "storm_type": storm.as_str(),
            "ops_count": self.ops_count,
            "failed_allocs": self.failed_allocs,
            "peak_heap_bytes": stats.peak_heap_bytes,
            "final_heap_bytes": stats.heap_bytes,
            "reuse_rate_permille": stats.reuse_rate_permille,
            "coalesce_cases": stats.coalesce_cases.to_vec(),
        })
    }
}

#[test]
fn storm_sawtooth() {
    let metrics = StormRunner::new(0x5EED_0001).run(StormType::Sawtooth);
    println!("{metrics}");
}

#[test]
fn storm_random_churn() {
    let metrics = StormRunner::new(0x5EED_0002).run(StormType::RandomChurn);
    println!("{metrics}");
}

#[test]
fn storm_size_class_thrash() {
    let metrics = StormRunner::new(0x5EED_0003).run(StormType::SizeClassThrash);
    println!("{metrics}");
}
