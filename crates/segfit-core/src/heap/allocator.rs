//! Core allocator state.
//!
//! [`HeapState`] centralizes everything the allocator owns: the managed
//! region, its configuration, operation counters, and the structured
//! lifecycle log. The four client operations plus the checker entry point
//! are methods; internal helpers implement heap extension, boundary-tag
//! coalescing and first-fit placement with splitting.
//!
//! Clients address allocations by payload offset into the managed region.
//! Offset 0 plays the role of the null pointer; no payload can ever sit at
//! offset 0 because the region starts with the pad word and list heads.

use crate::config::HeapConfig;
use crate::error::HeapError;
use crate::mem::{SystemMemory, DSIZE, WSIZE};

use super::checker;
use super::free_list;
use super::size_class::{list_index, LIST_NUM};
use super::tags::{self, MIN_BLOCK_SIZE};
use super::HEAP_BASE;

/// Offset value used for "no block" in the client API.
pub const NIL: usize = 0;

/// Heap lifecycle log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapLogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Structured heap lifecycle record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapLogRecord {
    /// Monotonic decision/event id.
    pub decision_id: u64,
    /// Correlation id for this lifecycle record.
    pub trace_id: String,
    /// Severity level.
    pub level: HeapLogLevel,
    /// API symbol (`malloc`, `free`, `calloc`, `realloc`, `init`, ...).
    pub symbol: &'static str,
    /// Event kind (`alloc`, `free`, `extend`, `heap_stats`, ...).
    pub event: &'static str,
    /// Payload offset involved in the event.
    pub ptr: Option<usize>,
    /// Size value involved in the event.
    pub size: Option<usize>,
    /// Size-class list index involved in the event.
    pub list: Option<usize>,
    /// Machine-readable outcome label.
    pub outcome: &'static str,
    /// Free-form details for debugging.
    pub details: String,
    /// Snapshot: currently active allocation count.
    pub active_count: usize,
    /// Snapshot: currently allocated bytes (block sizes, headers included).
    pub total_allocated: usize,
    /// Snapshot: managed region size in bytes.
    pub heap_bytes: usize,
    /// Snapshot: free-list fit counter.
    pub fit_hits: u64,
    /// Snapshot: fit-miss counter (searches that had to extend).
    pub fit_misses: u64,
    /// Snapshot: heap extension counter.
    pub extend_calls: u64,
    /// Snapshot: share of requests served from the free lists, in permille.
    pub reuse_rate_permille: u16,
}

/// Point-in-time summary of heap shape and counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapStats {
    /// Managed region size in bytes.
    pub heap_bytes: usize,
    /// Largest region size observed.
    pub peak_heap_bytes: usize,
    /// Live allocation count.
    pub active_count: usize,
    /// Live allocated bytes (block sizes, headers included).
    pub total_allocated: usize,
    /// Free blocks currently linked in the index.
    pub free_block_count: usize,
    /// Bytes held by free blocks.
    pub free_bytes: usize,
    /// Requests served from the free lists.
    pub fit_hits: u64,
    /// Requests that had to extend the heap.
    pub fit_misses: u64,
    /// Heap extensions performed.
    pub extend_calls: u64,
    /// Coalesce outcomes: [no merge, merged next, merged prev, merged both].
    pub coalesce_cases: [u64; 4],
    /// Share of requests served from the free lists, in permille.
    pub reuse_rate_permille: u16,
}

/// Global allocator state.
///
/// Owns the sbrk provider and the in-heap metadata (free-list heads,
/// boundary tags). All operations are methods; external serialization is
/// the caller's job, exactly as with a process-wide C heap.
#[derive(Debug)]
pub struct HeapState {
    mem: SystemMemory,
    config: HeapConfig,
    /// Live allocation count.
    active_count: usize,
    /// Live allocated bytes, in block sizes.
    total_allocated: usize,
    /// Requests served from the free lists.
    fit_hits: u64,
    /// Requests that extended the heap.
    fit_misses: u64,
    /// Heap extensions performed.
    extend_calls: u64,
    /// Largest region size observed.
    peak_heap_bytes: usize,
    /// Coalesce outcome tallies, indexed by case.
    coalesce_cases: [u64; 4],
    /// Monotonic lifecycle decision id.
    next_decision_id: u64,
    /// Structured heap lifecycle records.
    lifecycle_logs: Vec<HeapLogRecord>,
}

impl HeapState {
    /// Creates and initializes a heap: pad word, free-list heads, prologue,
    /// epilogue, then one chunk-size extension so the first request has a
    /// block to carve from.
    pub fn new(config: HeapConfig) -> Result<Self, HeapError> {
        if config.chunk_size < MIN_BLOCK_SIZE {
            return Err(HeapError::InvalidConfig {
                reason: "chunk_size below the minimum block size",
            });
        }
        let mut mem = SystemMemory::new(config.max_heap);
        let base = mem.sbrk((4 + LIST_NUM) * WSIZE)?;

        mem.put_word(base, 0); // alignment pad
        for i in 0..LIST_NUM {
            mem.put_word(base + (i + 1) * WSIZE, 0); // free-list heads
        }
        mem.put_word(base + (LIST_NUM + 1) * WSIZE, tags::pack(DSIZE, true)); // prologue header
        mem.put_word(base + (LIST_NUM + 2) * WSIZE, tags::pack(DSIZE, true)); // prologue footer
        mem.put_word(base + (LIST_NUM + 3) * WSIZE, tags::pack(0, true)); // epilogue header

        let mut state = Self {
            mem,
            config,
            active_count: 0,
            total_allocated: 0,
            fit_hits: 0,
            fit_misses: 0,
            extend_calls: 0,
            peak_heap_bytes: 0,
            coalesce_cases: [0; 4],
            next_decision_id: 1,
            lifecycle_logs: Vec::new(),
        };
        // The prologue is allocated; tell the epilogue so.
        tags::set_prev_alloc(&mut state.mem, HEAP_BASE);

        state.extend_heap(config.chunk_size / WSIZE)?;
        let heap_bytes = state.mem.size();
        state.record_lifecycle(
            HeapLogLevel::Debug,
            "init",
            "heap_initialized",
            None,
            Some(heap_bytes),
            None,
            "success",
            format!(
                "chunk_size={} max_heap={}",
                config.chunk_size, config.max_heap
            ),
        );
        Ok(state)
    }

    /// Allocates a block with at least `size` bytes of payload.
    ///
    /// Returns the payload offset, or `None` for a zero-size request or
    /// when the sbrk provider is exhausted.
    pub fn malloc(&mut self, size: usize) -> Option<usize> {
        if size == 0 {
            self.record_lifecycle(
                HeapLogLevel::Trace,
                "malloc",
                "alloc",
                None,
                Some(0),
                None,
                "noop",
                "zero_size_request",
            );
            return None;
        }

        let Some(asize) = adjusted_size(size) else {
            self.record_lifecycle(
                HeapLogLevel::Warn,
                "malloc",
                "alloc",
                None,
                Some(size),
                None,
                "denied",
                "request_size_overflow",
            );
            return None;
        };
        let list = list_index(asize);

        if let Some(bp) = free_list::find_fit(&self.mem, asize) {
            self.fit_hits += 1;
            let placed = self.place(bp, asize);
            self.active_count += 1;
            self.total_allocated += placed;
            self.record_lifecycle(
                HeapLogLevel::Trace,
                "malloc",
                "alloc",
                Some(bp),
                Some(size),
                Some(list),
                "success",
                format!("path=free_list_fit asize={asize} placed={placed}"),
            );
            self.record_heap_stats("malloc");
            return Some(bp);
        }
        self.fit_misses += 1;

        // No fit anywhere in the index; grow the heap and carve from the
        // (possibly tail-coalesced) new free block.
        let extend_bytes = asize.max(self.config.chunk_size);
        let bp = match self.extend_heap(extend_bytes / WSIZE) {
            Ok(bp) => bp,
            Err(err) => {
                self.record_lifecycle(
                    HeapLogLevel::Warn,
                    "malloc",
                    "alloc",
                    None,
                    Some(size),
                    Some(list),
                    "oom",
                    format!("extend_heap_failed: {err}"),
                );
                self.record_heap_stats("malloc");
                return None;
            }
        };
        let placed = self.place(bp, asize);
        self.active_count += 1;
        self.total_allocated += placed;
        self.record_lifecycle(
            HeapLogLevel::Trace,
            "malloc",
            "alloc",
            Some(bp),
            Some(size),
            Some(list),
            "success",
            format!("path=extend_heap asize={asize} placed={placed}"),
        );
        self.record_heap_stats("malloc");
        Some(bp)
    }

    /// Frees the block at payload offset `bp`. A nil offset is a no-op.
    ///
    /// Freeing anything that is not a live payload offset returned by this
    /// heap is client misuse and corrupts the heap (or panics on an
    /// out-of-range offset); it is not detected.
    pub fn free(&mut self, bp: usize) {
        if bp == NIL {
            self.record_lifecycle(
                HeapLogLevel::Trace,
                "free",
                "free_nil",
                Some(NIL),
                None,
                None,
                "noop",
                "nil_offset",
            );
            return;
        }

        let size = tags::block_size(&self.mem, bp);
        tags::put_preserving_prev(&mut self.mem, tags::header_of(bp), tags::pack(size, false));
        let ftr = tags::footer_of(&self.mem, bp);
        self.mem.put_word(ftr, tags::pack(size, false));
        tags::clear_prev_alloc(&mut self.mem, bp);
        let merged = self.coalesce(bp);

        match self.total_allocated.checked_sub(size) {
            Some(next) => self.total_allocated = next,
            None => {
                self.total_allocated = 0;
                self.record_lifecycle(
                    HeapLogLevel::Error,
                    "free",
                    "invariant_total_allocated_underflow",
                    Some(bp),
                    Some(size),
                    None,
                    "recovered",
                    "checked_sub_failed",
                );
            }
        }
        match self.active_count.checked_sub(1) {
            Some(next) => self.active_count = next,
            None => {
                self.active_count = 0;
                self.record_lifecycle(
                    HeapLogLevel::Error,
                    "free",
                    "invariant_active_count_underflow",
                    Some(bp),
                    Some(size),
                    None,
                    "recovered",
                    "checked_sub_failed",
                );
            }
        }

        self.record_lifecycle(
            HeapLogLevel::Trace,
            "free",
            "free",
            Some(bp),
            Some(size),
            Some(list_index(size)),
            "success",
            format!("merged_block={merged}"),
        );
        self.record_heap_stats("free");
    }

    /// Resizes the block at `ptr` to hold at least `size` payload bytes.
    ///
    /// `realloc(NIL, size)` behaves like `malloc(size)`; `realloc(ptr, 0)`
    /// behaves like `free(ptr)` and returns `None`. On allocation failure
    /// the original block is left untouched and `None` is returned.
    pub fn realloc(&mut self, ptr: usize, size: usize) -> Option<usize> {
        if size == 0 {
            self.free(ptr);
            self.record_lifecycle(
                HeapLogLevel::Trace,
                "realloc",
                "realloc_zero_as_free",
                Some(ptr),
                Some(0),
                None,
                "freed",
                "new_size_was_zero",
            );
            return None;
        }
        if ptr == NIL {
            let out = self.malloc(size);
            self.record_lifecycle(
                HeapLogLevel::Trace,
                "realloc",
                "realloc_nil_as_malloc",
                out,
                Some(size),
                None,
                if out.is_some() { "success" } else { "oom" },
                "ptr_was_nil",
            );
            return out;
        }

        let old_size = tags::block_size(&self.mem, ptr);
        let Some(new_ptr) = self.malloc(size) else {
            self.record_lifecycle(
                HeapLogLevel::Warn,
                "realloc",
                "realloc_allocate_new_failed",
                Some(ptr),
                Some(size),
                None,
                "oom",
                format!("old_size={old_size} original_block_untouched"),
            );
            return None;
        };

        // Copy up to the old payload capacity; the header word is metadata,
        // not client bytes.
        let copy_len = size.min(old_size - WSIZE);
        self.mem.copy(ptr, new_ptr, copy_len);
        self.free(ptr);

        self.record_lifecycle(
            HeapLogLevel::Trace,
            "realloc",
            "realloc_move",
            Some(new_ptr),
            Some(size),
            Some(list_index(old_size)),
            "success",
            format!("old_ptr={ptr} old_size={old_size} copied={copy_len}"),
        );
        self.record_heap_stats("realloc");
        Some(new_ptr)
    }

    /// Allocates zero-initialized memory for `count` objects of
    /// `elem_size` bytes each.
    ///
    /// Returns `None` if the element count multiplication overflows, the
    /// product is zero, or allocation fails.
    pub fn calloc(&mut self, count: usize, elem_size: usize) -> Option<usize> {
        let Some(total) = count.checked_mul(elem_size) else {
            self.record_lifecycle(
                HeapLogLevel::Warn,
                "calloc",
                "calloc_overflow",
                None,
                None,
                None,
                "denied",
                format!("count={count} elem_size={elem_size}"),
            );
            return None;
        };

        let out = self.malloc(total);
        if let Some(ptr) = out {
            self.mem.fill(ptr, total, 0);
        }
        self.record_lifecycle(
            HeapLogLevel::Trace,
            "calloc",
            "calloc_result",
            out,
            Some(total),
            None,
            if out.is_some() { "success" } else { "oom" },
            format!("count={count} elem_size={elem_size}"),
        );
        out
    }

    /// Borrows the payload of the allocated block at `bp`.
    ///
    /// The slice covers the block's full payload capacity, which may exceed
    /// the originally requested size by alignment padding.
    #[must_use]
    pub fn payload(&self, bp: usize) -> &[u8] {
        let len = tags::block_size(&self.mem, bp) - WSIZE;
        self.mem.bytes(bp, len)
    }

    /// Mutably borrows the payload of the allocated block at `bp`.
    pub fn payload_mut(&mut self, bp: usize) -> &mut [u8] {
        let len = tags::block_size(&self.mem, bp) - WSIZE;
        self.mem.bytes_mut(bp, len)
    }

    /// Runs the consistency checker, prints every violation to stderr, and
    /// returns the violation count. With `verbose` set, also prints a
    /// physical walk of the heap, one line per block.
    pub fn check_heap(&self, verbose: bool) -> usize {
        if verbose {
            println!("heap ({} bytes):", self.mem.size());
            let mut bp = HEAP_BASE;
            while bp <= self.mem.size() {
                let size = tags::block_size(&self.mem, bp);
                if size == 0 {
                    println!("  {bp}: EOL");
                    break;
                }
                if tags::is_allocated(&self.mem, bp) {
                    println!("  {bp}: header [{size}:a]");
                } else {
                    let ftr = tags::footer_of(&self.mem, bp);
                    println!(
                        "  {bp}: header [{size}:f] footer [{}:{}]",
                        tags::size_at(&self.mem, ftr),
                        if tags::alloc_at(&self.mem, ftr) { 'a' } else { 'f' },
                    );
                }
                bp = tags::next_block(&self.mem, bp);
            }
        }

        let violations = checker::check(self);
        for violation in &violations {
            eprintln!("heap check: {violation}");
        }
        violations.len()
    }

    /// Returns a point-in-time summary of heap shape and counters.
    ///
    /// Free-block figures are gathered by walking the index, so the cost is
    /// proportional to the number of free blocks.
    #[must_use]
    pub fn stats(&self) -> HeapStats {
        let mut free_block_count = 0;
        let mut free_bytes = 0;
        for (bp, _) in self.free_list_nodes() {
            if bp > self.mem.size() {
                // Corrupt linkage; the checker reports it.
                continue;
            }
            free_block_count += 1;
            free_bytes += tags::block_size(&self.mem, bp);
        }
        HeapStats {
            heap_bytes: self.mem.size(),
            peak_heap_bytes: self.peak_heap_bytes,
            active_count: self.active_count,
            total_allocated: self.total_allocated,
            free_block_count,
            free_bytes,
            fit_hits: self.fit_hits,
            fit_misses: self.fit_misses,
            extend_calls: self.extend_calls,
            coalesce_cases: self.coalesce_cases,
            reuse_rate_permille: self.reuse_rate_permille(),
        }
    }

    /// Current managed region size in bytes.
    #[must_use]
    pub fn heap_size(&self) -> usize {
        self.mem.size()
    }

    /// Returns a view of heap lifecycle log records.
    #[must_use]
    pub fn lifecycle_logs(&self) -> &[HeapLogRecord] {
        &self.lifecycle_logs
    }

    /// Drains heap lifecycle log records.
    pub fn drain_lifecycle_logs(&mut self) -> Vec<HeapLogRecord> {
        std::mem::take(&mut self.lifecycle_logs)
    }

    /// Extends the heap by `words` words (rounded up to keep alignment) and
    /// returns the resulting free block, coalesced with a free tail if one
    /// was adjacent.
    fn extend_heap(&mut self, words: usize) -> Result<usize, HeapError> {
        let size = if words % 2 == 1 {
            (words + 1) * WSIZE
        } else {
            words * WSIZE
        };
        let bp = self.mem.sbrk(size)?;
        self.extend_calls += 1;
        self.peak_heap_bytes = self.mem.size();

        // The old epilogue word becomes the new block's header; its
        // prev-alloc bit still describes the block before the extension.
        tags::put_preserving_prev(&mut self.mem, tags::header_of(bp), tags::pack(size, false));
        let ftr = tags::footer_of(&self.mem, bp);
        self.mem.put_word(ftr, tags::pack(size, false));
        // Fresh epilogue past the new block; the new memory is zeroed, so
        // its prev-alloc bit is already the correct "free" state.
        let epilogue = tags::header_of(tags::next_block(&self.mem, bp));
        tags::put_preserving_prev(&mut self.mem, epilogue, tags::pack(0, true));

        self.record_lifecycle(
            HeapLogLevel::Debug,
            "extend",
            "extend",
            Some(bp),
            Some(size),
            None,
            "success",
            format!("heap_bytes={}", self.mem.size()),
        );
        Ok(self.coalesce(bp))
    }

    /// Boundary-tag coalescing. Merges the free block at `bp` with free
    /// physical neighbors, keeps the free-list index in step, and returns
    /// the merged block.
    ///
    /// Order matters in every case: neighbors leave their lists before any
    /// header is rewritten, because list membership is keyed by the size
    /// stored in the header, and the merged block usually lands in a
    /// different class than its pieces.
    fn coalesce(&mut self, mut bp: usize) -> usize {
        let prev_alloc = tags::prev_allocated(&self.mem, bp);
        let next_alloc = tags::is_allocated(&self.mem, tags::next_block(&self.mem, bp));
        let mut size = tags::block_size(&self.mem, bp);

        if prev_alloc && next_alloc {
            self.coalesce_cases[0] += 1;
            free_list::insert(&mut self.mem, bp);
        } else if prev_alloc && !next_alloc {
            self.coalesce_cases[1] += 1;
            let next = tags::next_block(&self.mem, bp);
            free_list::remove(&mut self.mem, next);
            size += tags::block_size(&self.mem, next);
            tags::put_preserving_prev(&mut self.mem, tags::header_of(bp), tags::pack(size, false));
            let ftr = tags::footer_of(&self.mem, bp);
            self.mem.put_word(ftr, tags::pack(size, false));
            free_list::insert(&mut self.mem, bp);
        } else if !prev_alloc && next_alloc {
            self.coalesce_cases[2] += 1;
            let prev = tags::prev_block(&self.mem, bp);
            free_list::remove(&mut self.mem, prev);
            size += tags::block_size(&self.mem, prev);
            let ftr = tags::footer_of(&self.mem, bp);
            self.mem.put_word(ftr, tags::pack(size, false));
            tags::put_preserving_prev(
                &mut self.mem,
                tags::header_of(prev),
                tags::pack(size, false),
            );
            bp = prev;
            free_list::insert(&mut self.mem, bp);
        } else {
            self.coalesce_cases[3] += 1;
            let prev = tags::prev_block(&self.mem, bp);
            let next = tags::next_block(&self.mem, bp);
            free_list::remove(&mut self.mem, prev);
            free_list::remove(&mut self.mem, next);
            size += tags::block_size(&self.mem, prev) + tags::block_size(&self.mem, next);
            let ftr = tags::footer_of(&self.mem, next);
            tags::put_preserving_prev(
                &mut self.mem,
                tags::header_of(prev),
                tags::pack(size, false),
            );
            self.mem.put_word(ftr, tags::pack(size, false));
            bp = prev;
            free_list::insert(&mut self.mem, bp);
        }
        bp
    }

    /// Places an `asize`-byte allocation at the start of the free block at
    /// `bp`, splitting off the remainder when it can stand as a block of
    /// its own. Returns the size actually consumed.
    fn place(&mut self, bp: usize, asize: usize) -> usize {
        let csize = tags::block_size(&self.mem, bp);
        free_list::remove(&mut self.mem, bp);

        if csize - asize >= MIN_BLOCK_SIZE {
            tags::put_preserving_prev(&mut self.mem, tags::header_of(bp), tags::pack(asize, true));
            tags::set_prev_alloc(&mut self.mem, bp);
            let rest = tags::next_block(&self.mem, bp);
            tags::put_preserving_prev(
                &mut self.mem,
                tags::header_of(rest),
                tags::pack(csize - asize, false),
            );
            let ftr = tags::footer_of(&self.mem, rest);
            self.mem.put_word(ftr, tags::pack(csize - asize, false));
            tags::clear_prev_alloc(&mut self.mem, rest);
            free_list::insert(&mut self.mem, rest);
            asize
        } else {
            tags::put_preserving_prev(&mut self.mem, tags::header_of(bp), tags::pack(csize, true));
            tags::set_prev_alloc(&mut self.mem, bp);
            csize
        }
    }

    fn reuse_rate_permille(&self) -> u16 {
        let total = self.fit_hits + self.fit_misses;
        if total == 0 {
            return 0;
        }
        ((self.fit_hits.saturating_mul(1000)) / total) as u16
    }

    fn next_log_decision_id(&mut self) -> u64 {
        let id = self.next_decision_id;
        self.next_decision_id = self.next_decision_id.wrapping_add(1);
        id
    }

    fn record_lifecycle(
        &mut self,
        level: HeapLogLevel,
        symbol: &'static str,
        event: &'static str,
        ptr: Option<usize>,
        size: Option<usize>,
        list: Option<usize>,
        outcome: &'static str,
        details: impl Into<String>,
    ) {
        let decision_id = self.next_log_decision_id();
        let trace_id = format!("segfit::heap::{}::{:016x}", symbol, decision_id);
        self.lifecycle_logs.push(HeapLogRecord {
            decision_id,
            trace_id,
            level,
            symbol,
            event,
            ptr,
            size,
            list,
            outcome,
            details: details.into(),
            active_count: self.active_count,
            total_allocated: self.total_allocated,
            heap_bytes: self.mem.size(),
            fit_hits: self.fit_hits,
            fit_misses: self.fit_misses,
            extend_calls: self.extend_calls,
            reuse_rate_permille: self.reuse_rate_permille(),
        });
    }

    fn record_heap_stats(&mut self, symbol: &'static str) {
        self.record_lifecycle(
            HeapLogLevel::Debug,
            symbol,
            "heap_stats",
            None,
            None,
            None,
            "snapshot",
            format!(
                "heap_bytes={};active={};allocated={}",
                self.mem.size(),
                self.active_count,
                self.total_allocated
            ),
        );
    }

    /// Iterates every (payload offset, list index) pair linked in the
    /// free-list index. Used by `stats` and the checker.
    pub(crate) fn free_list_nodes(&self) -> Vec<(usize, usize)> {
        let mut nodes = Vec::new();
        for list in 0..LIST_NUM {
            let slot = super::FREE_LIST_BASE + list * WSIZE;
            let mut off = self.mem.word(slot);
            let mut hops = 0usize;
            while off != 0 {
                let bp = HEAP_BASE + off as usize;
                nodes.push((bp, list));
                // Bail out of pathological cycles; the checker reports them.
                hops += 1;
                if hops > self.mem.size() / MIN_BLOCK_SIZE + 1 {
                    break;
                }
                if bp + WSIZE > self.mem.size() {
                    break;
                }
                off = self.mem.word(bp);
            }
        }
        nodes
    }

    pub(crate) fn memory(&self) -> &SystemMemory {
        &self.mem
    }

    #[cfg(test)]
    pub(crate) fn memory_mut(&mut self) -> &mut SystemMemory {
        &mut self.mem
    }
}

/// Rounds a request up to a legal block size: header word plus payload,
/// doubleword aligned, never below the minimum block size. `None` when the
/// arithmetic would overflow.
fn adjusted_size(size: usize) -> Option<usize> {
    if size <= DSIZE {
        Some(2 * DSIZE)
    } else {
        let padded = size.checked_add(WSIZE + (DSIZE - 1))?;
        Some(DSIZE * (padded / DSIZE))
    }
}
