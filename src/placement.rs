//! # Placement Engine
//!
//! Turns a size request into a concrete block: `find_fit` locates a
//! candidate free block, `place` carves it up (splitting off a
//! still-free remainder when worthwhile), and `grow` is the fallback that
//! asks the [heap provider](crate::heap::HeapProvider) for more address
//! space when no class has anything big enough.

use crate::block::{self, CHUNKSIZE, LISTLIMIT, MIN_BLOCK_SIZE};
use crate::freelist::FreeListDirectory;
use crate::heap::HeapProvider;

/// Searches size classes `class_of(asize)` upward for the first block
/// that fits. Because each class's list is sorted ascending, the first
/// block found in a class is the best fit *within that class*.
pub fn find_fit(dir: &FreeListDirectory, asize: usize) -> Option<*mut u8> {
    for class in FreeListDirectory::class_of(asize)..LISTLIMIT {
        let mut bp = dir.head(class);
        while !bp.is_null() {
            if unsafe { block::block_size(bp) } >= asize {
                return Some(bp);
            }
            bp = unsafe { dir.succ(bp) };
        }
    }
    None
}

/// Removes a free block of size `>= asize` from its list and allocates
/// `asize` bytes out of it, splitting off and reinserting a free
/// remainder when one of at least [`MIN_BLOCK_SIZE`] bytes would be left.
///
/// # Safety
///
/// `bp` must address a free block of size `>= asize` that is not already
/// removed from `dir`.
pub unsafe fn place(dir: &mut FreeListDirectory, bp: *mut u8, asize: usize) -> *mut u8 {
    let csize = unsafe { block::block_size(bp) };
    unsafe { dir.remove(bp) };

    if csize - asize >= MIN_BLOCK_SIZE {
        unsafe {
            block::set_block(bp, asize, true);
            let remainder = block::next_bp(bp);
            block::set_block(remainder, csize - asize, false);
            crate::coalesce::coalesce(dir, remainder);
        }
    } else {
        unsafe { block::set_block(bp, csize, true) };
    }
    bp
}

/// Extends the heap by at least `n_words` words (rounded up to an even
/// count to preserve 8-byte alignment), converts the new region into a
/// free block by repurposing the old epilogue header as its header,
/// writes a fresh epilogue past it, coalesces with the predecessor (which
/// may itself be free), and returns the resulting free block — already
/// inserted into `dir` by [`coalesce`](crate::coalesce::coalesce).
///
/// # Safety
///
/// `heap` must be the provider that owns the region `dir`'s blocks live
/// in, and the heap must already have a valid epilogue at its current
/// high end.
pub unsafe fn grow(
    heap: &mut HeapProvider,
    dir: &mut FreeListDirectory,
    n_words: usize,
) -> Option<*mut u8> {
    let words = if n_words % 2 != 0 { n_words + 1 } else { n_words };
    let size = words * block::WSIZE;

    // The old break sits exactly WSIZE bytes past the old epilogue's
    // header, i.e. it *is* the payload pointer the new block will use:
    // its own header lands on the bytes that used to hold the epilogue.
    let bp = unsafe { heap.heap_hi().add(1) };
    heap.extend(size)?;

    unsafe {
        block::set_block(bp, size, false);
        block::set_block(block::next_bp(bp), 0, true); // new epilogue
    }

    Some(unsafe { crate::coalesce::coalesce(dir, bp) })
}

/// Requests at least `CHUNKSIZE` bytes, or `asize` bytes if larger,
/// rounded to whole words.
pub fn growth_words(asize: usize) -> usize {
    asize.max(CHUNKSIZE) / block::WSIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn growth_words_picks_the_larger_of_asize_and_chunksize() {
        assert_eq!(growth_words(64), CHUNKSIZE / block::WSIZE);
        assert_eq!(growth_words(CHUNKSIZE * 3), (CHUNKSIZE * 3) / block::WSIZE);
    }

    #[test]
    fn place_splits_when_remainder_is_large_enough() {
        let mut buf = [0u8; 256];
        let mut dir = FreeListDirectory::new();
        dir.set_base(buf.as_mut_ptr());

        let bp = unsafe { buf.as_mut_ptr().add(block::WSIZE) };
        unsafe {
            block::set_block(bp, 128, false);
            block::set_block(block::next_bp(bp), 0, true); // epilogue sentinel
            dir.insert(bp, 128);
            let placed = place(&mut dir, bp, 32);
            assert_eq!(placed, bp);
            assert_eq!(block::block_size(placed), 32);
            assert!(block::is_alloc(placed));
            let remainder = block::next_bp(placed);
            assert_eq!(block::block_size(remainder), 96);
            assert!(!block::is_alloc(remainder));
        }
    }

    #[test]
    fn place_takes_whole_block_when_remainder_too_small() {
        let mut buf = [0u8; 256];
        let mut dir = FreeListDirectory::new();
        dir.set_base(buf.as_mut_ptr());

        let bp = unsafe { buf.as_mut_ptr().add(block::WSIZE) };
        unsafe {
            block::set_block(bp, 40, false);
            block::set_block(block::next_bp(bp), 0, true);
            dir.insert(bp, 40);
            let placed = place(&mut dir, bp, 32);
            assert_eq!(block::block_size(placed), 40, "too-small remainder stays with the block");
            assert!(block::is_alloc(placed));
        }
    }
}
