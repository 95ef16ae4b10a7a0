//! The segregated free-list index.
//!
//! One head word per size class lives at the front of the managed region;
//! each holds the offset of the first free block in that class, or 0 for an
//! empty list. A free block's first two payload words are its next and prev
//! siblings, encoded as 32-bit offsets from the heap base (0 = nil).
//! Insertion is LIFO at the head; search is first-fit from the requested
//! class upward.

use crate::mem::{SystemMemory, WSIZE};

use super::size_class::{list_index, LIST_NUM};
use super::tags;
use super::{FREE_LIST_BASE, HEAP_BASE};

/// Address of the head word for list `index`.
#[inline]
fn head_slot(index: usize) -> usize {
    FREE_LIST_BASE + index * WSIZE
}

#[inline]
fn to_offset(bp: usize) -> u32 {
    (bp - HEAP_BASE) as u32
}

#[inline]
fn from_offset(off: u32) -> usize {
    HEAP_BASE + off as usize
}

/// Link word addresses inside a free block's payload.
#[inline]
fn next_link(bp: usize) -> usize {
    bp
}

#[inline]
fn prev_link(bp: usize) -> usize {
    bp + WSIZE
}

/// Pushes the free block at `bp` onto the head of its size-class list.
pub(crate) fn insert(mem: &mut SystemMemory, bp: usize) {
    let slot = head_slot(list_index(tags::block_size(mem, bp)));
    let head = mem.word(slot);

    if head == 0 {
        mem.put_word(slot, to_offset(bp));
        mem.put_word(next_link(bp), 0);
        mem.put_word(prev_link(bp), 0);
    } else {
        mem.put_word(next_link(bp), head);
        mem.put_word(prev_link(bp), 0);
        mem.put_word(prev_link(from_offset(head)), to_offset(bp));
        mem.put_word(slot, to_offset(bp));
    }
}

/// Unlinks the free block at `bp` from its size-class list.
///
/// The four positions (only node, tail, head, interior) are mutually
/// exclusive, so exactly one branch runs.
pub(crate) fn remove(mem: &mut SystemMemory, bp: usize) {
    let slot = head_slot(list_index(tags::block_size(mem, bp)));
    let next = mem.word(next_link(bp));
    let prev = mem.word(prev_link(bp));

    if next == 0 && prev == 0 {
        mem.put_word(slot, 0);
    } else if next == 0 {
        mem.put_word(next_link(from_offset(prev)), 0);
    } else if prev == 0 {
        mem.put_word(prev_link(from_offset(next)), 0);
        mem.put_word(slot, next);
    } else {
        mem.put_word(prev_link(from_offset(next)), prev);
        mem.put_word(next_link(from_offset(prev)), next);
    }
}

/// First-fit search: scans lists from the class of `asize` upward and
/// returns the first free block whose size covers `asize`.
pub(crate) fn find_fit(mem: &SystemMemory, asize: usize) -> Option<usize> {
    (list_index(asize)..LIST_NUM).find_map(|entry| find_in_list(mem, head_slot(entry), asize))
}

fn find_in_list(mem: &SystemMemory, slot: usize, asize: usize) -> Option<usize> {
    let mut off = mem.word(slot);
    while off != 0 {
        let bp = from_offset(off);
        if tags::block_size(mem, bp) >= asize {
            return Some(bp);
        }
        off = mem.word(next_link(bp));
    }
    None
}
