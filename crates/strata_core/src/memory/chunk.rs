//! # Chunk
//!
//! One fixed-size, cache-aligned block of raw component memory plus a
//! free-slot allocator.
//!
//! ## Memory Layout
//!
//! ```text
//! base (64-byte aligned)                                     base + 16 KiB
//! |  column A: [a0 a1 a2 ...]  pad |  column B: [b0 b1 ...]  pad |  ...  |
//! ```
//!
//! The chunk itself knows nothing about columns. It hands out slot indices
//! and byte ranges; the owning `ChunkList` maps `(component, slot)` to bytes.
//!
//! ## Slot Policy
//!
//! Free slots live in a min-heap, so `allocate` always returns the lowest
//! free index. Defragmentation relies on this to pack entities toward the
//! front of a chunk list.

// This module owns the only raw allocation in the crate. Every pointer
// access is bounds-checked against CHUNK_SIZE.
#![allow(unsafe_code)]

use std::alloc::{alloc_zeroed, dealloc, handle_alloc_error, Layout};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt;
use std::ops::Range;
use std::ptr::NonNull;

/// Size of every chunk in bytes.
pub const CHUNK_SIZE: usize = 16 * 1024;

/// Alignment of every chunk and every column within it.
pub const COLUMN_ALIGN: usize = 64;

/// Index of a slot within a chunk.
pub type SlotIndex = u32;

/// A 16 KiB block of component memory with a lowest-first slot allocator.
///
/// The chunk never runs constructors or destructors; the bytes are zeroed on
/// creation and afterwards only written by the owner.
pub struct Chunk {
    /// Block base, `CHUNK_SIZE` bytes aligned to `COLUMN_ALIGN`.
    base: NonNull<u8>,
    /// Maximum number of live slots.
    capacity: SlotIndex,
    /// Free slot indices, smallest on top.
    free: BinaryHeap<Reverse<SlotIndex>>,
}

impl Chunk {
    /// Allocates a zeroed block with `capacity` free slots.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: SlotIndex) -> Self {
        assert!(capacity > 0, "Chunk capacity must be greater than zero");

        let layout = Self::layout();
        // SAFETY: layout has non-zero size
        let ptr = unsafe { alloc_zeroed(layout) };
        let Some(base) = NonNull::new(ptr) else {
            handle_alloc_error(layout);
        };

        Self {
            base,
            capacity,
            free: (0..capacity).map(Reverse).collect(),
        }
    }

    #[inline]
    fn layout() -> Layout {
        Layout::from_size_align(CHUNK_SIZE, COLUMN_ALIGN).expect("Invalid chunk layout")
    }

    /// Returns the block base address.
    #[inline]
    #[must_use]
    pub fn base(&self) -> NonNull<u8> {
        self.base
    }

    /// Maximum number of slots.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> SlotIndex {
        self.capacity
    }

    /// Number of slots in use.
    #[inline]
    #[must_use]
    pub fn used_count(&self) -> usize {
        self.capacity as usize - self.free.len()
    }

    /// Number of free slots.
    #[inline]
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Checks if every slot is taken.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.free.is_empty()
    }

    /// Checks if no slot is taken.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.free.len() == self.capacity as usize
    }

    /// The slot the next `allocate` would return.
    #[inline]
    #[must_use]
    pub fn lowest_free_slot(&self) -> Option<SlotIndex> {
        self.free.peek().map(|Reverse(slot)| *slot)
    }

    /// Takes the lowest free slot, or `None` if the chunk is full.
    #[inline]
    pub fn allocate(&mut self) -> Option<SlotIndex> {
        self.free.pop().map(|Reverse(slot)| slot)
    }

    /// Returns a slot to the free heap.
    pub fn deallocate(&mut self, slot: SlotIndex) {
        debug_assert!(slot < self.capacity, "Slot {slot} out of bounds");
        debug_assert!(
            !self.free.iter().any(|Reverse(s)| *s == slot),
            "Slot {slot} freed twice"
        );
        self.free.push(Reverse(slot));
    }

    /// Views `range` of the block.
    ///
    /// # Panics
    ///
    /// Panics if `range` reaches past the block.
    #[inline]
    #[must_use]
    pub fn bytes(&self, range: Range<usize>) -> &[u8] {
        &self.as_slice()[range]
    }

    /// Mutably views `range` of the block.
    ///
    /// # Panics
    ///
    /// Panics if `range` reaches past the block.
    #[inline]
    pub fn bytes_mut(&mut self, range: Range<usize>) -> &mut [u8] {
        &mut self.as_mut_slice()[range]
    }

    /// Copies the bytes in `src` to the block offset `dst`.
    #[inline]
    pub fn copy_within(&mut self, src: Range<usize>, dst: usize) {
        self.as_mut_slice().copy_within(src, dst);
    }

    #[inline]
    fn as_slice(&self) -> &[u8] {
        // SAFETY: base points to CHUNK_SIZE initialized (zeroed) bytes owned
        // by this chunk; the shared borrow of self prevents mutation.
        unsafe { std::slice::from_raw_parts(self.base.as_ptr(), CHUNK_SIZE) }
    }

    #[inline]
    fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: as above, and the exclusive borrow of self makes this the
        // only live view.
        unsafe { std::slice::from_raw_parts_mut(self.base.as_ptr(), CHUNK_SIZE) }
    }
}

impl Drop for Chunk {
    fn drop(&mut self) {
        // SAFETY: base was allocated in `new` with this exact layout
        unsafe {
            dealloc(self.base.as_ptr(), Self::layout());
        }
    }
}

impl fmt::Debug for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chunk")
            .field("capacity", &self.capacity)
            .field("used", &self.used_count())
            .finish_non_exhaustive()
    }
}

// SAFETY: Chunk owns its block exclusively; no aliasing pointers escape
// except through borrows of the chunk itself.
unsafe impl Send for Chunk {}
// SAFETY: shared access only yields shared byte slices
unsafe impl Sync for Chunk {}
