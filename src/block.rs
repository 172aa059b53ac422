//! # Block Layout Module
//!
//! Pure, side-effect-free-except-for-the-pointed-at-memory functions that
//! encode and decode the boundary tags described in the crate's top-level
//! docs. Nothing here talks to the heap provider or the free-list
//! directory — it only knows how to read and write the bytes of a single
//! block given a payload pointer (`bp`).
//!
//! ## Layout
//!
//! ```text
//!   block base (b)                                   block base + size
//!        │                                                    │
//!        ▼                                                    ▼
//!   ┌─────────┬──────────────────────────────────────┬─────────┐
//!   │ Header  │             Payload                  │ Footer  │
//!   │  (W)    │  (pred/succ links when free)          │  (W)    │
//!   └─────────┴──────────────────────────────────────┴─────────┘
//!             ▲
//!             └── bp (what callers see)
//! ```
//!
//! `size` always includes the header and footer. The header and footer are
//! each one word (`WSIZE` bytes) wide and encode `size | alloc_bit`, which
//! keeps `size` a multiple of 8 since bit 0 is reserved for the alloc flag.
//!
//! The free-list link words (pred/succ) are also `WSIZE`-wide — not full
//! pointer width — and hold an [`Offset`] relative to a fixed base address
//! rather than an absolute pointer. This is what lets the minimum block
//! stay at 16 bytes (header + pred + succ + footer, 4 words of 4 bytes
//! each), where a pair of raw `*mut u8` would need 16 bytes on their own
//! and blow the budget on a 64-bit target.

/// Width of a header/footer/link word, in bytes.
pub const WSIZE: usize = 4;
/// Double-word size; also the alignment boundary for block sizes.
pub const DSIZE: usize = 2 * WSIZE;
/// Required alignment of every payload pointer handed to a client.
pub const ALIGNMENT: usize = DSIZE;
/// Default heap growth increment, in bytes (one typical page).
pub const CHUNKSIZE: usize = 1 << 12;
/// Number of segregated size classes.
pub const LISTLIMIT: usize = 20;
/// Smallest legal block size: header + pred + succ + footer.
pub const MIN_BLOCK_SIZE: usize = 4 * WSIZE;

/// An offset in bytes from a fixed base address, used to store free-list
/// links inside `WSIZE`-wide words instead of full-width pointers.
///
/// `0` is reserved to mean "no link" — safe because offset 0 always lands
/// on the prologue block, which is permanently allocated and therefore
/// never appears in a free list.
pub type Offset = u32;

/// Packs a block size and allocation bit into a boundary-tag word.
#[inline]
pub const fn pack(size: usize, alloc: bool) -> u32 {
    debug_assert!(size & (ALIGNMENT - 1) == 0);
    (size as u32) | (alloc as u32)
}

/// Extracts the size encoded in a boundary-tag word.
#[inline]
pub const fn size_of_word(word: u32) -> usize {
    (word & !0x7) as usize
}

/// Extracts the allocation bit encoded in a boundary-tag word.
#[inline]
pub const fn alloc_of_word(word: u32) -> bool {
    (word & 0x1) != 0
}

#[inline]
unsafe fn read_word(p: *const u8) -> u32 {
    unsafe { (p as *const u32).read() }
}

#[inline]
unsafe fn write_word(p: *mut u8, value: u32) {
    unsafe { (p as *mut u32).write(value) };
}

/// Address of `bp`'s header word.
///
/// # Safety
///
/// `bp` must be a live block's payload pointer.
#[inline]
pub unsafe fn hdr_ptr(bp: *mut u8) -> *mut u8 {
    unsafe { bp.sub(WSIZE) }
}

/// Reads `bp`'s header word.
///
/// # Safety
///
/// `bp` must be a live block's payload pointer.
#[inline]
pub unsafe fn header(bp: *mut u8) -> u32 {
    unsafe { read_word(hdr_ptr(bp)) }
}

/// Total size of the block addressed by `bp` (header + payload + footer).
///
/// # Safety
///
/// `bp` must be a live block's payload pointer.
#[inline]
pub unsafe fn block_size(bp: *mut u8) -> usize {
    size_of_word(unsafe { header(bp) })
}

/// Whether the block addressed by `bp` is currently allocated.
///
/// # Safety
///
/// `bp` must be a live block's payload pointer.
#[inline]
pub unsafe fn is_alloc(bp: *mut u8) -> bool {
    alloc_of_word(unsafe { header(bp) })
}

/// Address of `bp`'s footer word, per its *current* header size.
///
/// # Safety
///
/// `bp` must be a live block's payload pointer with a valid header.
#[inline]
pub unsafe fn ftr_ptr(bp: *mut u8) -> *mut u8 {
    unsafe { bp.add(block_size(bp) - DSIZE) }
}

/// Writes matching header and footer words for a block of `size` bytes
/// starting at `bp`, recomputing the footer address from `size` (not from
/// whatever header may currently be there — this is what lets callers lay
/// out a brand new block before its header exists).
///
/// # Safety
///
/// `bp .. bp + size - WSIZE` must be writable and within the heap.
pub unsafe fn set_block(bp: *mut u8, size: usize, alloc: bool) {
    let tag = pack(size, alloc);
    unsafe {
        write_word(hdr_ptr(bp), tag);
        write_word(bp.add(size - DSIZE), tag);
    }
}

/// Payload pointer of the block physically following `bp`.
///
/// At the epilogue this returns the epilogue's own address (size 0,
/// allocated), which is what stops a coalescing walk from running past
/// the end of the heap.
///
/// # Safety
///
/// `bp` must be a live block's payload pointer.
#[inline]
pub unsafe fn next_bp(bp: *mut u8) -> *mut u8 {
    unsafe { bp.add(block_size(bp)) }
}

/// Payload pointer of the block physically preceding `bp`, read via the
/// boundary-tag invariant that every block — allocated or free — carries a
/// footer.
///
/// # Safety
///
/// `bp` must not be the heap's first real block (a previous footer must
/// exist there), and that footer must be valid.
#[inline]
pub unsafe fn prev_bp(bp: *mut u8) -> *mut u8 {
    let prev_size = size_of_word(unsafe { read_word(bp.sub(DSIZE)) });
    unsafe { bp.sub(prev_size) }
}

/// Whether the block immediately preceding `bp` is allocated, read
/// straight from its footer without computing its address.
///
/// # Safety
///
/// Same preconditions as [`prev_bp`].
#[inline]
pub unsafe fn prev_alloc(bp: *mut u8) -> bool {
    alloc_of_word(unsafe { read_word(bp.sub(DSIZE)) })
}

/// Whether the block immediately following `bp` is allocated.
///
/// # Safety
///
/// Same preconditions as [`next_bp`].
#[inline]
pub unsafe fn next_alloc(bp: *mut u8) -> bool {
    unsafe { is_alloc(next_bp(bp)) }
}

/// Computes the block size a `size`-byte client request needs, including
/// header/footer overhead, rounded up to [`ALIGNMENT`] and floored at
/// [`MIN_BLOCK_SIZE`] so the block can always host free-list links once
/// freed (the open question flagged in the allocator's design notes).
#[inline]
pub fn align_request(size: usize) -> usize {
    let with_overhead = size + DSIZE;
    let aligned = (with_overhead + (ALIGNMENT - 1)) & !(ALIGNMENT - 1);
    aligned.max(MIN_BLOCK_SIZE)
}

/// Reads the pred-link offset stored in a free block's payload.
///
/// # Safety
///
/// `bp` must address a free block (its payload is link storage, not
/// client data).
#[inline]
pub unsafe fn pred_offset(bp: *mut u8) -> Offset {
    unsafe { read_word(bp) }
}

/// Writes the pred-link offset stored in a free block's payload.
///
/// # Safety
///
/// See [`pred_offset`].
#[inline]
pub unsafe fn set_pred_offset(bp: *mut u8, offset: Offset) {
    unsafe { write_word(bp, offset) };
}

/// Reads the succ-link offset stored in a free block's payload.
///
/// # Safety
///
/// See [`pred_offset`].
#[inline]
pub unsafe fn succ_offset(bp: *mut u8) -> Offset {
    unsafe { read_word(bp.add(WSIZE)) }
}

/// Writes the succ-link offset stored in a free block's payload.
///
/// # Safety
///
/// See [`pred_offset`].
#[inline]
pub unsafe fn set_succ_offset(bp: *mut u8, offset: Offset) {
    unsafe { write_word(bp.add(WSIZE), offset) };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_roundtrips_size_and_alloc_bit() {
        for size in [16usize, 24, 4096, 1 << 19] {
            for alloc in [true, false] {
                let word = pack(size, alloc);
                assert_eq!(size_of_word(word), size);
                assert_eq!(alloc_of_word(word), alloc);
            }
        }
    }

    #[test]
    fn align_request_rounds_up_and_floors_at_minimum() {
        assert_eq!(align_request(0), MIN_BLOCK_SIZE);
        assert_eq!(align_request(1), MIN_BLOCK_SIZE);
        assert_eq!(align_request(8), MIN_BLOCK_SIZE);
        assert_eq!(align_request(9), 24);
        assert_eq!(align_request(100), 112);
    }

    #[test]
    fn set_block_writes_matching_header_and_footer() {
        let mut buf = [0u8; 64];
        let bp = unsafe { buf.as_mut_ptr().add(WSIZE) };
        unsafe {
            set_block(bp, 32, true);
            assert_eq!(block_size(bp), 32);
            assert!(is_alloc(bp));
            let ftr = ftr_ptr(bp);
            assert_eq!((ftr as *const u32).read(), (hdr_ptr(bp) as *const u32).read());
        }
    }
}
