//! # rallocator - A Segregated Free-List Memory Allocator
//!
//! This crate provides a general-purpose dynamic memory allocator over a
//! contiguous, growable heap obtained from the operating system via
//! `sbrk(2)`. It services three operations — `allocate`, `free`,
//! `reallocate` — backed by a **segregated collection of doubly-linked
//! free lists indexed by size class**, with boundary-tag coalescing over
//! a block-tagged heap.
//!
//! ## Overview
//!
//! ```text
//!   Segregated Free Lists:
//!
//!   class 0  [1,2)     ──► (empty)
//!   class 1  [2,4)     ──► (empty)
//!   ...
//!   class 6  [64,128)  ──► [80B free] ⇄ [96B free] ⇄ [112B free]
//!   ...
//!   class 19 [2^19,∞)  ──► [4096B free]
//!
//!   Each list is sorted ascending by block size, so the first block a
//!   forward scan finds in a class is the best fit within that class.
//! ```
//!
//! Every payload pointer handed back to a client is 8-byte aligned. Free
//! blocks carry their size-ordered list links *inside their own payload*
//! (dead space that only exists while the block is free), which is why
//! the minimum block size is 16 bytes rather than just "header + footer".
//!
//! ## Crate Structure
//!
//! ```text
//!   rallocator
//!   ├── align      - General-purpose machine-word alignment macro
//!   ├── block      - Boundary-tag layout: pack/unpack, next/prev navigation
//!   ├── heap       - sbrk-backed heap provider
//!   ├── freelist   - Segregated, size-sorted free-list directory
//!   ├── placement  - find_fit / place / grow
//!   ├── coalesce   - Four-case adjacent-free-block merging
//!   ├── error      - AllocError
//!   └── allocator  - Allocator: the public facade (init/allocate/free/reallocate)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rallocator::Allocator;
//!
//! fn main() {
//!     let mut allocator = Allocator::new();
//!     allocator.init().expect("heap provider should have room");
//!
//!     let p = allocator.allocate(100);
//!     assert!(!p.is_null());
//!
//!     unsafe { (p as *mut u64).write(42) };
//!
//!     allocator.free(p);
//! }
//! ```
//!
//! [`GlobalAllocator`] wraps an `Allocator` behind a `Mutex` and implements
//! [`std::alloc::GlobalAlloc`], so it can be installed with
//! `#[global_allocator]` in a binary that wants every `Box`, `Vec`, and
//! friends routed through this heap instead of the system allocator.
//! `Allocator` itself is `!Sync` (it assumes single-threaded cooperative
//! access, see "Limitations" below) and does not implement `GlobalAlloc`
//! directly — a `#[global_allocator]` static must be `Sync`.
//!
//! ## How It Works
//!
//! Every block carries a header and footer boundary tag encoding its size
//! and allocation bit:
//!
//! ```text
//!   Single Block:
//!   ┌─────────┬──────────────────────────────────────┬─────────┐
//!   │ Header  │ Payload (pred/succ links when free)   │ Footer  │
//!   │  (4B)   │                                       │  (4B)   │
//!   └─────────┴──────────────────────────────────────┴─────────┘
//! ```
//!
//! Footers on *allocated* blocks too (not just free ones) are what let the
//! allocator walk backward to a block's predecessor without a separate
//! size table — this is the boundary-tag technique the whole crate is
//! built around.
//!
//! ## Features
//!
//! - Segregated free lists (20 size classes) sorted for best-fit-per-class
//! - Boundary-tag coalescing (all four neighbor-state cases)
//! - In-place `reallocate` growth into a free successor before falling
//!   back to allocate-copy-free
//! - Optional debug-mode structural invariant checker
//! - `Mutex`-guarded [`GlobalAllocator`] wrapper for `#[global_allocator]` use
//!
//! ## Limitations
//!
//! - **Single-threaded only**: no synchronization primitives; `Allocator`
//!   is not `Sync`
//! - **Never shrinks**: the backing heap region is never returned to the OS
//! - **Unix-only**: requires `libc` and `sbrk` (POSIX systems)
//!
//! ## Safety
//!
//! This crate is inherently unsafe as it deals with raw memory management.
//! Pointer-level functions in `block`, `freelist`, `coalesce`, and
//! `placement` document their preconditions individually; `Allocator`'s
//! public methods are safe to call (the unsafety is fully contained), but
//! passing it a pointer it did not itself return is undefined, matching
//! any `malloc`-family contract.

pub mod align;
mod allocator;
mod block;
mod coalesce;
mod error;
mod freelist;
mod heap;
mod placement;

pub use allocator::{Allocator, GlobalAllocator};
pub use error::AllocError;
