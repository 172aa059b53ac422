//! # Error Handling
//!
//! The only runtime error this allocator can produce from valid client use
//! is the heap provider refusing to grow. [`AllocError::InvariantViolation`]
//! exists purely for the optional debug-mode structural checker
//! ([`Allocator::check_invariants`](crate::allocator::Allocator::check_invariants));
//! it is never returned from `allocate`/`free`/`reallocate` themselves.

use thiserror::Error;

/// Recoverable and debug-only error conditions for the allocator.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AllocError {
    /// The heap provider refused to extend the break.
    #[error("heap provider refused to extend the heap")]
    HeapExhausted,

    /// A structural invariant (alignment, boundary tags, free-list
    /// ordering, ...) did not hold. Only produced by
    /// [`Allocator::check_invariants`](crate::allocator::Allocator::check_invariants);
    /// indicates an allocator bug, never a client misuse.
    #[error("allocator invariant violated: {0}")]
    InvariantViolation(String),
}
