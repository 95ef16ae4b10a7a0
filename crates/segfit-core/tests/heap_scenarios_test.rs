//! End-to-end allocator scenarios, each starting from a fresh heap.

use segfit_core::{check, HeapConfig, HeapState};

fn fresh_heap() -> HeapState {
    HeapState::new(HeapConfig::default()).expect("heap init")
}

#[test]
fn scenario_single_block_is_reused_after_free() {
    let mut heap = fresh_heap();
    let p = heap.malloc(1).expect("first allocation");
    assert_eq!(p % 8, 0);
    let top_before = heap.heap_size();
    heap.free(p);
    let q = heap.malloc(1).expect("second allocation");
    assert_eq!(q, p, "freed region should be reused");
    assert_eq!(heap.heap_size(), top_before, "no new heap growth");
    assert!(check(&heap).is_empty());
}

#[test]
fn scenario_three_frees_coalesce_into_one_block() {
    let mut heap = fresh_heap();
    let a = heap.malloc(24).unwrap();
    let b = heap.malloc(24).unwrap();
    let c = heap.malloc(24).unwrap();
    heap.free(b);
    heap.free(a);
    heap.free(c);
    let stats = heap.stats();
    assert_eq!(stats.active_count, 0);
    assert_eq!(
        stats.free_block_count, 1,
        "the working region should be one free block"
    );
    assert_eq!(stats.free_bytes, heap.heap_size() - 28 * 4);
    assert!(check(&heap).is_empty());
}

#[test]
fn scenario_mixed_sizes_lifo_teardown_stays_consistent() {
    let mut heap = fresh_heap();
    let sizes = [8usize, 16, 112, 128, 4096, 100_000];
    let mut ptrs = Vec::new();
    for &size in &sizes {
        let p = heap.malloc(size).expect("allocation");
        assert_eq!(p % 8, 0);
        assert_eq!(heap.check_heap(false), 0, "after malloc({size})");
        ptrs.push(p);
    }
    while let Some(p) = ptrs.pop() {
        heap.free(p);
        assert_eq!(heap.check_heap(false), 0, "after free({p})");
    }
    assert_eq!(heap.stats().active_count, 0);
}

#[test]
fn scenario_realloc_preserves_first_hundred_bytes() {
    let mut heap = fresh_heap();
    let p = heap.malloc(100).unwrap();
    for (i, byte) in heap.payload_mut(p)[..100].iter_mut().enumerate() {
        *byte = i as u8;
    }
    let q = heap.realloc(p, 200).expect("realloc");
    for (i, &byte) in heap.payload(q)[..100].iter().enumerate() {
        assert_eq!(byte, i as u8, "byte {i} lost in realloc");
    }
    assert!(check(&heap).is_empty());
}

#[test]
fn scenario_calloc_thousand_bytes_all_zero() {
    let mut heap = fresh_heap();
    // Dirty some memory first so the zeroing is observable.
    let scratch = heap.malloc(1200).unwrap();
    heap.payload_mut(scratch).fill(0xEE);
    heap.free(scratch);

    let p = heap.calloc(1000, 1).expect("calloc");
    assert!(heap.payload(p)[..1000].iter().all(|&b| b == 0));
    assert!(check(&heap).is_empty());
}

#[test]
fn scenario_matching_class_allocation_comes_from_free_list() {
    let mut heap = fresh_heap();
    let ptrs: Vec<usize> = (0..16).map(|_| heap.malloc(48).unwrap()).collect();
    let mut freed = Vec::new();
    for (i, &p) in ptrs.iter().enumerate() {
        if i % 2 == 1 {
            heap.free(p);
            freed.push(p);
        }
    }
    assert_eq!(heap.check_heap(false), 0);

    let before = heap.stats();
    let q = heap.malloc(48).expect("allocation");
    let after = heap.stats();
    assert!(freed.contains(&q), "allocation should reuse a freed block");
    assert_eq!(after.free_block_count, before.free_block_count - 1);
    assert_eq!(after.heap_bytes, before.heap_bytes, "no heap growth");
    assert_eq!(after.fit_hits, before.fit_hits + 1);
    assert!(check(&heap).is_empty());
}

#[test]
fn payload_round_trip_until_freed() {
    let mut heap = fresh_heap();
    let p = heap.malloc(100).unwrap();
    for (i, byte) in heap.payload_mut(p)[..100].iter_mut().enumerate() {
        *byte = (i * 3) as u8;
    }
    let q = heap.malloc(64).unwrap();
    heap.payload_mut(q).fill(0x42);
    for (i, &byte) in heap.payload(p)[..100].iter().enumerate() {
        assert_eq!(byte, (i * 3) as u8);
    }
    heap.free(q);
    for (i, &byte) in heap.payload(p)[..100].iter().enumerate() {
        assert_eq!(byte, (i * 3) as u8);
    }
}

#[test]
fn payload_writes_are_isolated_between_allocations() {
    let mut heap = fresh_heap();
    let a = heap.malloc(64).unwrap();
    let b = heap.malloc(64).unwrap();
    let c = heap.malloc(64).unwrap();
    heap.payload_mut(a).fill(0xAA);
    heap.payload_mut(b).fill(0xBB);
    heap.payload_mut(c).fill(0xCC);
    heap.payload_mut(a).fill(0x11);
    assert!(heap.payload(b).iter().all(|&x| x == 0xBB));
    assert!(heap.payload(c).iter().all(|&x| x == 0xCC));
    heap.free(b);
    assert!(heap.payload(a).iter().all(|&x| x == 0x11));
    assert!(heap.payload(c).iter().all(|&x| x == 0xCC));
    assert!(check(&heap).is_empty());
}
