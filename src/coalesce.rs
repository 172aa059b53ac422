//! # Coalescer
//!
//! Merges a newly-freed block with whichever of its neighbors are also
//! free, restoring the "no two adjacent free blocks" invariant, then
//! inserts the (possibly merged) result into the free-list directory.
//!
//! The four neighbor-state cases below are exactly the ones worked out in
//! the allocator's design: `P`/`N` stand for "previous"/"next" block
//! allocated.

use crate::block;
use crate::freelist::FreeListDirectory;

/// Coalesces `bp` (a block whose header/footer already say "free") with
/// any free neighbors and inserts the result into `dir`. Returns the
/// payload pointer of the (possibly merged) free block.
///
/// # Safety
///
/// `bp` must address a block within the managed heap whose header and
/// footer have already been written with the free bit cleared; its
/// neighbors (if within bounds) must have valid boundary tags.
pub unsafe fn coalesce(dir: &mut FreeListDirectory, bp: *mut u8) -> *mut u8 {
    let prev_alloc = unsafe { block::prev_alloc(bp) };
    let next_alloc = unsafe { block::next_alloc(bp) };
    let mut size = unsafe { block::block_size(bp) };

    let merged = match (prev_alloc, next_alloc) {
        (true, true) => bp,
        (true, false) => unsafe {
            let next = block::next_bp(bp);
            dir.remove(next);
            size += block::block_size(next);
            block::set_block(bp, size, false);
            bp
        },
        (false, true) => unsafe {
            let prev = block::prev_bp(bp);
            dir.remove(prev);
            size += block::block_size(prev);
            block::set_block(prev, size, false);
            prev
        },
        (false, false) => unsafe {
            let prev = block::prev_bp(bp);
            let next = block::next_bp(bp);
            dir.remove(prev);
            dir.remove(next);
            size += block::block_size(prev) + block::block_size(next);
            block::set_block(prev, size, false);
            prev
        },
    };

    unsafe { dir.insert(merged, size) };
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::WSIZE;

    /// Builds `prologue(8,alloc) block*(sizes) epilogue(0,alloc)` inside
    /// `buf`, returning each real block's payload pointer.
    fn lay_out(buf: &mut [u8], sizes_and_alloc: &[(usize, bool)]) -> Vec<*mut u8> {
        unsafe {
            let mut cursor = buf.as_mut_ptr();
            block::set_block(cursor.add(WSIZE), block::DSIZE, true); // prologue
            cursor = cursor.add(block::DSIZE);
            let mut bps = Vec::new();
            for &(size, alloc) in sizes_and_alloc {
                let bp = cursor.add(WSIZE);
                block::set_block(bp, size, alloc);
                bps.push(bp);
                cursor = cursor.add(size);
            }
            // epilogue: header only, size 0, alloc.
            (cursor as *mut u32).write(block::pack(0, true));
            bps
        }
    }

    #[test]
    fn case_p_and_n_inserts_as_is() {
        let mut buf = [0u8; 256];
        let bps = lay_out(&mut buf, &[(32, true), (48, false), (32, true)]);
        let mut dir = dir_for(&mut buf);
        let merged = unsafe { coalesce(&mut dir, bps[1]) };
        assert_eq!(merged, bps[1]);
        assert_eq!(unsafe { block::block_size(merged) }, 48);
        assert!(!unsafe { block::is_alloc(merged) });
    }

    #[test]
    fn case_not_p_and_n_merges_with_prev() {
        let mut buf = [0u8; 256];
        let bps = lay_out(&mut buf, &[(32, false), (48, false), (32, true)]);
        let mut dir = dir_for(&mut buf);
        unsafe { dir.insert(bps[0], 32) };
        let merged = unsafe { coalesce(&mut dir, bps[1]) };
        assert_eq!(merged, bps[0]);
        assert_eq!(unsafe { block::block_size(merged) }, 80);
    }

    #[test]
    fn case_p_and_not_n_merges_with_next() {
        let mut buf = [0u8; 256];
        let bps = lay_out(&mut buf, &[(32, true), (48, false), (32, false)]);
        let mut dir = dir_for(&mut buf);
        unsafe { dir.insert(bps[2], 32) };
        let merged = unsafe { coalesce(&mut dir, bps[1]) };
        assert_eq!(merged, bps[1]);
        assert_eq!(unsafe { block::block_size(merged) }, 80);
    }

    #[test]
    fn case_neither_merges_all_three() {
        let mut buf = [0u8; 256];
        let bps = lay_out(&mut buf, &[(32, false), (48, false), (32, false)]);
        let mut dir = dir_for(&mut buf);
        unsafe {
            dir.insert(bps[0], 32);
            dir.insert(bps[2], 32);
        }
        let merged = unsafe { coalesce(&mut dir, bps[1]) };
        assert_eq!(merged, bps[0]);
        assert_eq!(unsafe { block::block_size(merged) }, 112);
    }

    fn dir_for(buf: &mut [u8]) -> FreeListDirectory {
        let mut dir = FreeListDirectory::new();
        dir.set_base(buf.as_mut_ptr());
        dir
    }
}
