//! Randomized allocate/free/reallocate traces, checking the allocator's
//! structural invariants and data safety after every operation.
//!
//! `cargo test` runs test binaries (and, within a binary, `#[test]`
//! functions) concurrently by default. `sbrk` is process-wide state, so
//! this file relies on running with a single thread
//! (`cargo test -- --test-threads=1`) to avoid two traces racing on the
//! same break — the same constraint the crate's single-threaded design
//! already assumes for the allocator itself.

use proptest::prelude::*;
use rallocator::Allocator;

#[derive(Debug, Clone)]
enum Op {
    Allocate(usize),
    Free(usize),
    Reallocate(usize, usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1usize..4096).prop_map(Op::Allocate),
        any::<usize>().prop_map(Op::Free),
        (any::<usize>(), 1usize..4096).prop_map(|(i, s)| Op::Reallocate(i, s)),
    ]
}

struct LiveBlock {
    ptr: *mut u8,
    size: usize,
    pattern: u8,
}

fn fill(ptr: *mut u8, size: usize, pattern: u8) {
    unsafe { std::ptr::write_bytes(ptr, pattern, size) };
}

fn verify(ptr: *mut u8, size: usize, pattern: u8) -> bool {
    unsafe { std::slice::from_raw_parts(ptr, size) }
        .iter()
        .all(|&b| b == pattern)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_traces_preserve_invariants_and_data(ops in prop::collection::vec(op_strategy(), 1..80)) {
        let mut allocator = Allocator::new();
        allocator.init().expect("sbrk should succeed under test");

        let mut live: Vec<LiveBlock> = Vec::new();
        let mut next_pattern: u8 = 1;

        for op in ops {
            match op {
                Op::Allocate(size) => {
                    let ptr = allocator.allocate(size);
                    prop_assert!(!ptr.is_null());
                    prop_assert_eq!((ptr as usize) % 8, 0, "payload must be 8-byte aligned");
                    let pattern = next_pattern;
                    next_pattern = next_pattern.wrapping_add(1).max(1);
                    fill(ptr, size, pattern);
                    live.push(LiveBlock { ptr, size, pattern });
                }
                Op::Free(idx) => {
                    if live.is_empty() {
                        continue;
                    }
                    let i = idx % live.len();
                    let block = live.remove(i);
                    allocator.free(block.ptr);
                }
                Op::Reallocate(idx, new_size) => {
                    if live.is_empty() {
                        continue;
                    }
                    let i = idx % live.len();
                    let old = &live[i];
                    let new_ptr = allocator.reallocate(old.ptr, new_size);
                    if new_ptr.is_null() {
                        // Allocation failure: original must remain valid and untouched.
                        prop_assert!(verify(old.ptr, old.size, old.pattern));
                        continue;
                    }
                    let preserved = old.size.min(new_size);
                    prop_assert!(verify(new_ptr, preserved, old.pattern));
                    let pattern = old.pattern;
                    live[i] = LiveBlock { ptr: new_ptr, size: new_size, pattern };
                }
            }

            prop_assert!(allocator.check_invariants().is_ok());
            for block in &live {
                prop_assert!(verify(block.ptr, block.size, block.pattern));
            }
        }
    }
}
