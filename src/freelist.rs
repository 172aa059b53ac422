//! # Free-List Directory
//!
//! Twenty segregated, doubly-linked, size-sorted free lists. Each list is
//! indexed by size class (`floor(log2(size))`, capped at 19) and kept
//! sorted ascending by block size, which turns "first fit within a class"
//! into "best fit within a class" for free.
//!
//! Links are stored as [`block::Offset`]s relative to a fixed `base`
//! pointer (the heap's prologue payload, which never moves once
//! [`init`](crate::allocator::Allocator::init) has run) rather than as raw
//! pointers, so a free block's two link words fit in `block::WSIZE` bytes
//! each — see `block`'s module docs for why that matters for the minimum
//! block size.

use std::collections::BTreeSet;

use crate::block::{self, LISTLIMIT, Offset};
use crate::error::AllocError;

/// The segregated free-list heads, plus the base address link offsets are
/// relative to.
pub struct FreeListDirectory {
    heads: [Offset; LISTLIMIT],
    base: *mut u8,
}

impl FreeListDirectory {
    /// Creates a directory with all lists empty. `base` is not yet known;
    /// call [`set_base`](Self::set_base) once the heap's prologue exists.
    pub const fn new() -> Self {
        Self {
            heads: [0; LISTLIMIT],
            base: std::ptr::null_mut(),
        }
    }

    /// Sets the base address link offsets are computed relative to, and
    /// resets all lists to empty. Must be called once, during
    /// `Allocator::init`, before any block is ever inserted.
    pub fn set_base(&mut self, base: *mut u8) {
        self.base = base;
        self.heads = [0; LISTLIMIT];
    }

    #[inline]
    fn to_offset(&self, bp: *mut u8) -> Offset {
        (bp as usize - self.base as usize) as Offset
    }

    #[inline]
    fn from_offset(&self, offset: Offset) -> *mut u8 {
        if offset == 0 {
            std::ptr::null_mut()
        } else {
            (self.base as usize + offset as usize) as *mut u8
        }
    }

    /// Computes the size class a block of `size` bytes belongs to, by
    /// repeated right-shift (portable across word widths, matching the
    /// allocator's design notes).
    pub fn class_of(size: usize) -> usize {
        let mut size = size;
        let mut class = 0;
        while class < LISTLIMIT - 1 && size > 1 {
            size >>= 1;
            class += 1;
        }
        class
    }

    /// Head of size class `class`, or null if empty.
    pub fn head(&self, class: usize) -> *mut u8 {
        self.from_offset(self.heads[class])
    }

    unsafe fn pred(&self, bp: *mut u8) -> *mut u8 {
        self.from_offset(unsafe { block::pred_offset(bp) })
    }

    /// Successor of `bp` within its free list, or null at the tail.
    ///
    /// # Safety
    ///
    /// `bp` must address a block currently linked into one of this
    /// directory's free lists.
    pub unsafe fn succ(&self, bp: *mut u8) -> *mut u8 {
        self.from_offset(unsafe { block::succ_offset(bp) })
    }

    unsafe fn set_pred(&self, bp: *mut u8, pred: *mut u8) {
        unsafe { block::set_pred_offset(bp, self.to_offset(pred)) };
    }

    unsafe fn set_succ(&self, bp: *mut u8, succ: *mut u8) {
        unsafe { block::set_succ_offset(bp, self.to_offset(succ)) };
    }

    fn set_head(&mut self, class: usize, bp: *mut u8) {
        self.heads[class] = self.to_offset(bp);
    }

    /// Inserts a just-freed block into its size class, keeping the class
    /// sorted ascending by size. Scans forward for the first block whose
    /// size is `>= size` and splices `bp` immediately before it (or
    /// appends at the tail / becomes the head, as appropriate).
    ///
    /// # Safety
    ///
    /// `bp` must address a free block not already present in any list,
    /// large enough to hold the link words, with `size` matching its
    /// header.
    pub unsafe fn insert(&mut self, bp: *mut u8, size: usize) {
        let class = Self::class_of(size);
        let mut insert_after: *mut u8 = std::ptr::null_mut();
        let mut search = self.head(class);

        while !search.is_null() && size > unsafe { block::block_size(search) } {
            insert_after = search;
            search = unsafe { self.succ(search) };
        }

        match (search.is_null(), insert_after.is_null()) {
            // Middle of the list.
            (false, false) => unsafe {
                self.set_succ(bp, search);
                self.set_pred(bp, insert_after);
                self.set_pred(search, bp);
                self.set_succ(insert_after, bp);
            },
            // New head of a non-empty list.
            (false, true) => unsafe {
                self.set_succ(bp, search);
                self.set_pred(bp, std::ptr::null_mut());
                self.set_pred(search, bp);
                self.set_head(class, bp);
            },
            // New tail of a non-empty list.
            (true, false) => unsafe {
                self.set_succ(bp, std::ptr::null_mut());
                self.set_pred(bp, insert_after);
                self.set_succ(insert_after, bp);
            },
            // Sole element of an empty list.
            (true, true) => unsafe {
                self.set_succ(bp, std::ptr::null_mut());
                self.set_pred(bp, std::ptr::null_mut());
                self.set_head(class, bp);
            },
        }
    }

    /// Removes `bp` from whichever free list it currently sits in.
    ///
    /// # Safety
    ///
    /// `bp` must address a free block currently present in its class's
    /// list (i.e. its header's size must still be accurate).
    pub unsafe fn remove(&mut self, bp: *mut u8) {
        let class = Self::class_of(unsafe { block::block_size(bp) });
        let pred = unsafe { self.pred(bp) };
        let succ = unsafe { self.succ(bp) };

        match (succ.is_null(), pred.is_null()) {
            // Middle of the list.
            (false, false) => unsafe {
                self.set_pred(succ, pred);
                self.set_succ(pred, succ);
            },
            // Head of a longer list.
            (false, true) => unsafe {
                self.set_pred(succ, std::ptr::null_mut());
                self.set_head(class, succ);
            },
            // Tail of a longer list.
            (true, false) => unsafe {
                self.set_succ(pred, std::ptr::null_mut());
            },
            // Sole element.
            (true, true) => {
                self.heads[class] = 0;
            }
        }
    }

    /// Walks every size class, checking that each list only holds blocks
    /// belonging to that class, sizes are non-decreasing along the list,
    /// and pred/succ links are mutually consistent (the head has a null
    /// pred; every other node's pred really does point back to it).
    ///
    /// Returns the set of block addresses found across all lists (as
    /// `usize`), so the caller can cross-check it against the set of free
    /// blocks found by walking the heap itself — that comparison is what
    /// actually verifies "a block is in exactly one free list iff its
    /// alloc bit is 0"; this method alone only verifies the lists are
    /// internally well-formed.
    ///
    /// # Safety
    ///
    /// Every block reachable from a list head must have a valid header.
    pub unsafe fn check_invariants(&self) -> Result<BTreeSet<usize>, AllocError> {
        let mut seen = BTreeSet::new();

        for class in 0..LISTLIMIT {
            let mut pred: *mut u8 = std::ptr::null_mut();
            let mut prev_size = 0usize;
            let mut bp = self.head(class);

            while !bp.is_null() {
                if !seen.insert(bp as usize) {
                    return Err(AllocError::InvariantViolation(format!(
                        "block at {bp:p} is linked into more than one free-list position"
                    )));
                }

                let size = unsafe { block::block_size(bp) };
                if Self::class_of(size) != class {
                    return Err(AllocError::InvariantViolation(format!(
                        "block at {bp:p} of size {size} sits in class {class}, expected class {}",
                        Self::class_of(size)
                    )));
                }
                if size < prev_size {
                    return Err(AllocError::InvariantViolation(format!(
                        "class {class} is not sorted ascending: {prev_size} appears before {size}"
                    )));
                }
                prev_size = size;

                let actual_pred = unsafe { self.pred(bp) };
                if actual_pred != pred {
                    return Err(AllocError::InvariantViolation(format!(
                        "block at {bp:p} has pred {actual_pred:p}, expected {pred:p}"
                    )));
                }

                pred = bp;
                bp = unsafe { self.succ(bp) };
            }
        }

        Ok(seen)
    }
}
