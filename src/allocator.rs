//! # Allocator Facade
//!
//! The public entry point: `init`, `allocate`, `free`, `reallocate`, plus
//! [`GlobalAllocator`], a `Mutex`-guarded wrapper for dropping this crate in
//! as `#[global_allocator]`. Everything here is orchestration — the actual
//! heap-layout invariants, free-list bookkeeping, placement, and coalescing
//! logic all live in `block`, `freelist`, `placement`, and `coalesce`.
//!
//! ## Heap shape after `init`
//!
//! ```text
//!   ┌──────┬───────────┬───────────┬───────────┬───────────────┬───────────┐
//!   │ pad  │ prologue   │ prologue  │ (free chunk, CHUNKSIZE)    │ epilogue  │
//!   │ (4B) │ header(8,1)│ footer(8,1)│           ...             │ header(0,1)│
//!   └──────┴───────────┴───────────┴─────────────────────────────┴───────────┘
//!          ▲
//!          └── heap_listp (the prologue's own "bp", used only as a fixed
//!              reference point for PREV_BLKP-style arithmetic and as the
//!              base offset links in the free-list directory are relative to)
//! ```
//!
//! # Thread Safety
//!
//! Matches the crate-wide single-threaded cooperative model: `Allocator`
//! holds no internal lock, is not `Sync`, and `init` must run exactly once
//! before any other operation. [`GlobalAllocator`] exists precisely because
//! `#[global_allocator]` statics must be `Sync`; it serializes every caller
//! through a `Mutex<Allocator>` rather than pretending `Allocator` is safe
//! to share across threads on its own.

use std::alloc::{GlobalAlloc, Layout};
use std::collections::BTreeSet;
use std::ptr;
use std::sync::Mutex;

use crate::block::{self, CHUNKSIZE, WSIZE};
use crate::coalesce;
use crate::error::AllocError;
use crate::freelist::FreeListDirectory;
use crate::heap::HeapProvider;
use crate::placement;

/// Owns the heap provider, the segregated free-list directory, and the
/// fixed reference point (`heap_listp`) the rest of the machinery is
/// addressed relative to.
pub struct Allocator {
    heap: HeapProvider,
    dir: FreeListDirectory,
    heap_listp: *mut u8,
    initialized: bool,
}

impl Default for Allocator {
    fn default() -> Self {
        Self::new()
    }
}

impl Allocator {
    /// Creates an allocator that has not yet claimed any heap. Call
    /// [`init`](Self::init) before any other operation.
    pub const fn new() -> Self {
        Self {
            heap: HeapProvider::new(),
            dir: FreeListDirectory::new(),
            heap_listp: std::ptr::null_mut(),
            initialized: false,
        }
    }

    /// Establishes the prologue/epilogue sentinels and performs the
    /// initial [`CHUNKSIZE`] growth. Must be called exactly once before
    /// `allocate`/`free`/`reallocate`.
    pub fn init(&mut self) -> Result<(), AllocError> {
        let base = self
            .heap
            .extend(4 * WSIZE)
            .ok_or(AllocError::HeapExhausted)?;

        unsafe {
            // Word 0: alignment padding (unused).
            (base as *mut u32).write(0);
            // Word 1/2: the prologue, a permanently allocated zero-payload block.
            block::set_block(base.add(2 * WSIZE), block::DSIZE, true);
            // Word 3: the epilogue header (size 0, allocated).
            (base.add(3 * WSIZE) as *mut u32).write(block::pack(0, true));
        }

        self.heap_listp = unsafe { base.add(2 * WSIZE) };
        self.dir.set_base(self.heap_listp);

        unsafe { placement::grow(&mut self.heap, &mut self.dir, CHUNKSIZE / WSIZE) }
            .ok_or(AllocError::HeapExhausted)?;

        self.initialized = true;
        log::debug!("allocator initialized, heap_listp = {:p}", self.heap_listp);
        Ok(())
    }

    /// Allocates at least `size` bytes, returning an 8-byte-aligned
    /// payload pointer, or null if `size` is 0 or the heap provider
    /// refuses to grow.
    pub fn allocate(&mut self, size: usize) -> *mut u8 {
        debug_assert!(self.initialized, "Allocator::init must run before allocate");
        if size == 0 {
            return ptr::null_mut();
        }

        let asize = block::align_request(size);

        if let Some(bp) = placement::find_fit(&self.dir, asize) {
            log::trace!("allocate({size}) fit in existing free block, asize = {asize}");
            return unsafe { placement::place(&mut self.dir, bp, asize) };
        }

        let words = placement::growth_words(asize);
        match unsafe { placement::grow(&mut self.heap, &mut self.dir, words) } {
            Some(bp) => unsafe { placement::place(&mut self.dir, bp, asize) },
            None => {
                log::warn!("allocate({size}) failed: heap provider refused to grow");
                ptr::null_mut()
            }
        }
    }

    /// Frees a block previously returned by `allocate`/`reallocate`.
    /// `ptr` must not have already been freed; passing an unrelated
    /// pointer is undefined, matching the crate's client contract.
    pub fn free(&mut self, ptr: *mut u8) {
        if ptr.is_null() {
            return;
        }
        debug_assert!(self.initialized, "Allocator::init must run before free");

        let size = unsafe { block::block_size(ptr) };
        unsafe {
            block::set_block(ptr, size, false);
            coalesce::coalesce(&mut self.dir, ptr);
        }
    }

    /// Resizes a previous allocation. `ptr == null` behaves like
    /// `allocate(size)`; `size == 0` behaves like `free(ptr)` and returns
    /// null. Otherwise tries to grow in place into a free successor
    /// before falling back to allocate-copy-free; on allocation failure
    /// the original block is left untouched and null is returned.
    pub fn reallocate(&mut self, ptr: *mut u8, size: usize) -> *mut u8 {
        if ptr.is_null() {
            return self.allocate(size);
        }
        if size == 0 {
            self.free(ptr);
            return ptr::null_mut();
        }

        let old_size = unsafe { block::block_size(ptr) };
        let old_payload = old_size - block::DSIZE;
        let asize = block::align_request(size);

        if asize <= old_size {
            return ptr;
        }

        if let Some(grown) = unsafe { self.try_grow_in_place(ptr, old_size, asize) } {
            log::trace!("reallocate grew {ptr:p} in place to {asize} bytes");
            return grown;
        }

        let new_ptr = self.allocate(size);
        if new_ptr.is_null() {
            return ptr::null_mut();
        }
        let copy_len = old_payload.min(size);
        unsafe { ptr::copy_nonoverlapping(ptr, new_ptr, copy_len) };
        self.free(ptr);
        new_ptr
    }

    /// Attempts to satisfy a growing `reallocate` by absorbing an
    /// immediately following free block, without moving the payload.
    /// Supplements the spec's baseline allocate-copy-free `reallocate`
    /// per the allocator's documented known suboptimality, without
    /// changing any externally observable contract.
    ///
    /// # Safety
    ///
    /// `ptr` must address a live allocated block of size `old_size`.
    unsafe fn try_grow_in_place(
        &mut self,
        ptr: *mut u8,
        old_size: usize,
        asize: usize,
    ) -> Option<*mut u8> {
        if unsafe { block::next_alloc(ptr) } {
            return None;
        }
        let next = unsafe { block::next_bp(ptr) };
        let next_size = unsafe { block::block_size(next) };
        let combined = old_size + next_size;
        if combined < asize {
            return None;
        }

        unsafe { self.dir.remove(next) };
        if combined - asize >= block::MIN_BLOCK_SIZE {
            unsafe {
                block::set_block(ptr, asize, true);
                let remainder = block::next_bp(ptr);
                block::set_block(remainder, combined - asize, false);
                coalesce::coalesce(&mut self.dir, remainder);
            }
        } else {
            unsafe { block::set_block(ptr, combined, true) };
        }
        Some(ptr)
    }

    /// Walks every block from the prologue to the epilogue and checks the
    /// structural invariants the allocator depends on: boundary-tag
    /// agreement, minimum size and alignment, no two adjacent free
    /// blocks, and free-list membership consistent with each block's
    /// alloc bit (including class assignment, ascending sort, and
    /// pred/succ consistency within each list). Intended for debug builds
    /// and tests, not the hot path.
    pub fn check_invariants(&self) -> Result<(), AllocError> {
        let mut bp = self.heap_listp;
        let mut prev_was_free = false;
        let mut free_in_heap: BTreeSet<usize> = BTreeSet::new();

        loop {
            let size = unsafe { block::block_size(bp) };
            let alloc = unsafe { block::is_alloc(bp) };

            if bp != self.heap_listp && size < block::MIN_BLOCK_SIZE {
                return Err(AllocError::InvariantViolation(format!(
                    "block at {bp:p} has size {size} below the {} byte minimum",
                    block::MIN_BLOCK_SIZE
                )));
            }
            if size % block::ALIGNMENT != 0 {
                return Err(AllocError::InvariantViolation(format!(
                    "block at {bp:p} has size {size} that is not 8-byte aligned"
                )));
            }
            if size != 0 {
                let footer = unsafe { (block::ftr_ptr(bp) as *const u32).read() };
                let header = unsafe { block::header(bp) };
                if footer != header {
                    return Err(AllocError::InvariantViolation(format!(
                        "block at {bp:p} has mismatched header/footer"
                    )));
                }
            }
            if !alloc && prev_was_free {
                return Err(AllocError::InvariantViolation(format!(
                    "two adjacent free blocks meeting at {bp:p}"
                )));
            }
            prev_was_free = !alloc;

            if size != 0 && !alloc && bp != self.heap_listp {
                free_in_heap.insert(bp as usize);
            }

            if size == 0 {
                break; // epilogue reached
            }
            bp = unsafe { block::next_bp(bp) };
        }

        let free_in_lists = unsafe { self.dir.check_invariants() }?;
        if free_in_heap != free_in_lists {
            return Err(AllocError::InvariantViolation(format!(
                "free blocks found while walking the heap ({} blocks) do not match \
                 the set found across the free lists ({} blocks)",
                free_in_heap.len(),
                free_in_lists.len()
            )));
        }

        Ok(())
    }
}

// Safety: every access to `Allocator`'s raw-pointer fields happens through
// `GlobalAllocator`'s mutex, which serializes all callers down to one at a
// time; the fields never observe concurrent access.
unsafe impl Send for Allocator {}

/// A `Sync`, lock-guarded wrapper so an [`Allocator`] can be installed as a
/// binary's `#[global_allocator]`.
///
/// `Allocator` itself holds raw pointers and assumes the single-threaded
/// cooperative access model documented at the crate root — it is not
/// `Sync` and must not be shared across threads without synchronization.
/// `GlobalAllocator` supplies that synchronization with a
/// [`std::sync::Mutex`], mirroring how allocator-adjacent kernels in this
/// codebase's corpus serialize a raw-pointer-based allocator behind a lock
/// (e.g. a `SpinLock`-guarded free list) rather than asserting it is
/// inherently thread-safe.
///
/// ```rust,ignore
/// #[global_allocator]
/// static ALLOCATOR: rallocator::GlobalAllocator = rallocator::GlobalAllocator::new();
/// ```
pub struct GlobalAllocator(Mutex<Allocator>);

impl GlobalAllocator {
    /// Creates a wrapper around a not-yet-initialized [`Allocator`]. The
    /// first `alloc`/`dealloc`/`realloc` call lazily runs
    /// [`Allocator::init`]; a failure there surfaces as a null return from
    /// that call, per `GlobalAlloc`'s OOM contract.
    pub const fn new() -> Self {
        Self(Mutex::new(Allocator::new()))
    }

    fn with_locked<R>(&self, f: impl FnOnce(&mut Allocator) -> R) -> R {
        let mut guard = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    /// Ensures the wrapped allocator has run `init`, returning `false` if
    /// the heap provider refused.
    fn ensure_init(allocator: &mut Allocator) -> bool {
        allocator.initialized || allocator.init().is_ok()
    }
}

impl Default for GlobalAllocator {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl GlobalAlloc for GlobalAllocator {
    /// Alignment beyond 8 bytes is not honored — the allocator's boundary
    /// tags fix alignment at 8, matching the crate's documented scope (no
    /// calling-context policy).
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        self.with_locked(|allocator| {
            if !Self::ensure_init(allocator) {
                return ptr::null_mut();
            }
            allocator.allocate(layout.size())
        })
    }

    unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
        self.with_locked(|allocator| allocator.free(ptr));
    }

    unsafe fn realloc(&self, ptr: *mut u8, _layout: Layout, new_size: usize) -> *mut u8 {
        self.with_locked(|allocator| {
            if !Self::ensure_init(allocator) {
                return ptr::null_mut();
            }
            allocator.reallocate(ptr, new_size)
        })
    }
}
