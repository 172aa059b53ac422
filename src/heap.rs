//! # Heap Provider
//!
//! The allocator's one external dependency: a monotone, `sbrk`-like byte
//! region that only ever grows. Everything above this module treats the
//! heap as an opaque, growable span; this module is the only place that
//! talks to the operating system.
//!
//! Modeled directly on the teacher crate's own use of `libc::sbrk` — the
//! only difference is that growth failures are reported as `None` instead
//! of a raw sentinel pointer, and the low bound is latched on first use so
//! `heap_lo`/`heap_hi` match the contract in the crate's external
//! interfaces section.

use libc::{c_void, intptr_t, sbrk};

/// Wraps `sbrk(2)` as the allocator's heap provider.
///
/// # Thread Safety
///
/// `sbrk` manipulates process-wide state; this type is not `Sync` and is
/// not meant to be shared across threads, matching the single-threaded
/// cooperative model the rest of the crate assumes.
#[derive(Debug, Default)]
pub struct HeapProvider {
    lo: Option<*mut u8>,
    hi: *mut u8,
}

impl HeapProvider {
    /// Creates a provider that has not yet extended the heap.
    pub const fn new() -> Self {
        Self {
            lo: None,
            hi: std::ptr::null_mut(),
        }
    }

    /// Inclusive lower bound of the region this provider has handed out,
    /// or null if [`extend`](Self::extend) has never succeeded.
    pub fn heap_lo(&self) -> *mut u8 {
        self.lo.unwrap_or(std::ptr::null_mut())
    }

    /// Inclusive upper bound of the region this provider has handed out
    /// (the address of the last byte, not one-past-the-end).
    pub fn heap_hi(&self) -> *mut u8 {
        self.hi
    }

    /// Extends the break by exactly `n_bytes`, returning the address of
    /// the first new byte, or `None` if the operating system refused.
    ///
    /// `n_bytes` must not exceed `isize::MAX`; this is the provider's
    /// contract, not something clients are expected to juggle (callers in
    /// this crate always request bounded, alignment-rounded amounts).
    pub fn extend(&mut self, n_bytes: usize) -> Option<*mut u8> {
        if n_bytes == 0 {
            return Some(self.hi);
        }
        let base = unsafe { sbrk(n_bytes as intptr_t) };
        if base == usize::MAX as *mut c_void {
            log::warn!("heap provider refused to extend by {n_bytes} bytes");
            return None;
        }
        let base = base as *mut u8;
        if self.lo.is_none() {
            self.lo = Some(base);
        }
        self.hi = unsafe { base.add(n_bytes - 1) };
        Some(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extend_tracks_lo_and_hi() {
        let mut heap = HeapProvider::new();
        assert!(heap.heap_lo().is_null());

        let first = heap.extend(64).expect("sbrk should succeed in tests");
        assert_eq!(heap.heap_lo(), first);
        assert_eq!(heap.heap_hi(), unsafe { first.add(63) });

        let second = heap.extend(32).expect("sbrk should succeed in tests");
        assert_eq!(second, unsafe { first.add(64) });
        assert_eq!(heap.heap_lo(), first, "lo is latched on first extend");
        assert_eq!(heap.heap_hi(), unsafe { second.add(31) });
    }
}
