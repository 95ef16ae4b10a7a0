//! Heap consistency checker.
//!
//! A read-only pass over the whole heap that cross-checks the physical
//! block walk against the free-list index and reports every violation it
//! can find. It never modifies state and keeps going after a finding
//! wherever the walk can still be trusted.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::mem::{DSIZE, WSIZE};

use super::allocator::HeapState;
use super::size_class::list_index;
use super::tags::{self, MIN_BLOCK_SIZE};
use super::HEAP_BASE;

/// A single consistency finding.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    #[error("bad prologue header: size {size}, allocated {allocated}")]
    BadPrologue { size: usize, allocated: bool },
    #[error("bad prologue footer: size {size}, allocated {allocated}")]
    BadPrologueFooter { size: usize, allocated: bool },
    #[error("bad epilogue at offset {at}: size {size}, allocated {allocated}")]
    BadEpilogue {
        at: usize,
        size: usize,
        allocated: bool,
    },
    #[error("block at {bp} is not doubleword aligned")]
    MisalignedBlock { bp: usize },
    #[error("block at {bp} has size {size}, below the minimum block size")]
    UndersizedBlock { bp: usize, size: usize },
    #[error("block at {bp} has size {size}, not a doubleword multiple")]
    RaggedSize { bp: usize, size: usize },
    #[error("block at {bp} runs past the end of the managed region")]
    BlockOutOfRange { bp: usize },
    #[error("free block at {bp}: header {header:#010x} disagrees with footer {footer:#010x}")]
    TagMismatch { bp: usize, header: u32, footer: u32 },
    #[error("blocks at {bp} and {next} are both free and not coalesced")]
    AdjacentFreeBlocks { bp: usize, next: usize },
    #[error("block at {bp}: prev-alloc bit says {recorded}, predecessor is actually {actual}")]
    PrevAllocMismatch {
        bp: usize,
        recorded: bool,
        actual: bool,
    },
    #[error("free block at {bp} is linked in {count} free-list positions, expected exactly 1")]
    ListMembership { bp: usize, count: usize },
    #[error("list {list} links block at {bp}, which belongs in list {expected}")]
    WrongList {
        list: usize,
        bp: usize,
        expected: usize,
    },
    #[error("list {list} links block at {bp}, which is not free")]
    AllocatedInList { list: usize, bp: usize },
    #[error("list {list} links block at {bp}, which is no block boundary")]
    StrayListNode { list: usize, bp: usize },
    #[error("list {list} links offset {bp} outside the working heap")]
    ListNodeOutOfRange { list: usize, bp: usize },
}

/// Checks every heap invariant and returns the findings, empty when the
/// heap is consistent.
#[must_use]
pub fn check(heap: &HeapState) -> Vec<Violation> {
    let mem = heap.memory();
    let mut violations = Vec::new();

    let pro_size = tags::block_size(mem, HEAP_BASE);
    let pro_alloc = tags::is_allocated(mem, HEAP_BASE);
    if pro_size != DSIZE || !pro_alloc {
        violations.push(Violation::BadPrologue {
            size: pro_size,
            allocated: pro_alloc,
        });
    }
    // The prologue encodes PACK(8, 1) twice; its footer word sits at the
    // heap base itself and must agree independently of the header.
    let pro_ftr_size = tags::size_at(mem, HEAP_BASE);
    let pro_ftr_alloc = tags::alloc_at(mem, HEAP_BASE);
    if pro_ftr_size != DSIZE || !pro_ftr_alloc {
        violations.push(Violation::BadPrologueFooter {
            size: pro_ftr_size,
            allocated: pro_ftr_alloc,
        });
    }

    // Forward physical walk from the first working block to the epilogue.
    let mut free_blocks = Vec::new();
    let mut prev_free: Option<usize> = None;
    let mut prev_allocated = pro_alloc;
    let mut bp = tags::next_block(mem, HEAP_BASE);
    loop {
        if bp > mem.size() {
            violations.push(Violation::BlockOutOfRange { bp });
            break;
        }
        let size = tags::block_size(mem, bp);
        let allocated = tags::is_allocated(mem, bp);
        let recorded = tags::prev_allocated(mem, bp);
        if recorded != prev_allocated {
            violations.push(Violation::PrevAllocMismatch {
                bp,
                recorded,
                actual: prev_allocated,
            });
        }
        if size == 0 {
            // Epilogue: allocated, and flush with the region end.
            let at = tags::header_of(bp);
            if !allocated || at != mem.size() - WSIZE {
                violations.push(Violation::BadEpilogue {
                    at,
                    size,
                    allocated,
                });
            }
            break;
        }
        if bp % DSIZE != 0 {
            violations.push(Violation::MisalignedBlock { bp });
        }
        if size < MIN_BLOCK_SIZE {
            violations.push(Violation::UndersizedBlock { bp, size });
        }
        if size % DSIZE != 0 {
            // The walk cannot be trusted past a ragged size.
            violations.push(Violation::RaggedSize { bp, size });
            break;
        }
        if bp + size > mem.size() {
            violations.push(Violation::BlockOutOfRange { bp });
            break;
        }
        if allocated {
            prev_free = None;
        } else {
            let header = mem.word(tags::header_of(bp));
            let footer = mem.word(tags::footer_of(mem, bp));
            let sizes_agree = tags::size_at(mem, tags::header_of(bp))
                == tags::size_at(mem, tags::footer_of(mem, bp));
            let alloc_agree = tags::alloc_at(mem, tags::header_of(bp))
                == tags::alloc_at(mem, tags::footer_of(mem, bp));
            if !sizes_agree || !alloc_agree {
                violations.push(Violation::TagMismatch { bp, header, footer });
            }
            if let Some(prev_bp) = prev_free {
                violations.push(Violation::AdjacentFreeBlocks {
                    bp: prev_bp,
                    next: bp,
                });
            }
            prev_free = Some(bp);
            free_blocks.push(bp);
        }
        prev_allocated = allocated;
        bp = tags::next_block(mem, bp);
    }

    // Cross-check the free-list index against the physical walk.
    let physical: HashSet<usize> = free_blocks.iter().copied().collect();
    let mut link_counts: HashMap<usize, usize> = HashMap::new();
    for (node, list) in heap.free_list_nodes() {
        if node < HEAP_BASE + DSIZE || node + WSIZE > mem.size() || node % WSIZE != 0 {
            violations.push(Violation::ListNodeOutOfRange { list, bp: node });
            continue;
        }
        *link_counts.entry(node).or_default() += 1;
        if !physical.contains(&node) {
            if tags::is_allocated(mem, node) {
                violations.push(Violation::AllocatedInList { list, bp: node });
            } else {
                violations.push(Violation::StrayListNode { list, bp: node });
            }
            continue;
        }
        let expected = list_index(tags::block_size(mem, node));
        if expected != list {
            violations.push(Violation::WrongList {
                list,
                bp: node,
                expected,
            });
        }
    }
    for &free_bp in &free_blocks {
        let count = link_counts.get(&free_bp).copied().unwrap_or(0);
        if count != 1 {
            violations.push(Violation::ListMembership { bp: free_bp, count });
        }
    }

    violations
}
