//! # Chunk List
//!
//! All storage for one archetype: a growable list of [`Chunk`]s sharing a
//! single columnar (struct-of-arrays) layout.
//!
//! ## Layout
//!
//! ```text
//! stride   = Σ component sizes
//! capacity = (CHUNK_SIZE - (n - 1) * 63) / stride
//!
//! | Position[0..capacity] | pad to 64 | Velocity[0..capacity] | pad to 64 | ...
//! ```
//!
//! Each column starts on a 64-byte boundary. The `(n - 1) * 63` term reserves
//! the worst-case padding between columns, so the last column always ends
//! inside the chunk.
//!
//! ## Stable Chunk Indices
//!
//! Reclaiming an empty chunk leaves a hole instead of shifting later chunks
//! down, so every outstanding [`Allocation`] stays valid. Holes are refilled
//! before the list grows.

use std::ops::Range;
use std::ptr::NonNull;

use super::chunk::{Chunk, SlotIndex, CHUNK_SIZE, COLUMN_ALIGN};
use crate::ecs::{ComponentId, ComponentInfo};
use crate::error::{ArchiveError, ArchiveResult};

/// Location of one entity's row inside a [`ChunkList`].
///
/// Ordered by chunk first, then slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Allocation {
    /// Index of the chunk within the list.
    pub chunk: usize,
    /// Slot within that chunk.
    pub slot: SlotIndex,
}

impl Allocation {
    /// Creates an allocation.
    #[inline]
    #[must_use]
    pub const fn new(chunk: usize, slot: SlotIndex) -> Self {
        Self { chunk, slot }
    }
}

/// Byte range of one component column within a chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColumnRange {
    /// Column start, relative to the chunk base. Multiple of 64.
    pub offset: usize,
    /// Size of one element.
    pub size: usize,
}

impl ColumnRange {
    /// Bytes of the element stored at `slot`.
    #[inline]
    #[must_use]
    pub fn slot_range(self, slot: SlotIndex) -> Range<usize> {
        let start = self.offset + slot as usize * self.size;
        start..start + self.size
    }
}

/// Rounds `value` up to the next multiple of `align` (a power of two).
#[inline]
const fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) & !(align - 1)
}

/// Storage for exactly one archetype.
#[derive(Debug)]
pub struct ChunkList {
    /// Column per component, sorted by ID.
    columns: Vec<(ComponentId, ColumnRange)>,
    /// Rows per chunk.
    capacity: SlotIndex,
    /// `None` marks a reclaimed chunk.
    chunks: Vec<Option<Chunk>>,
    /// Number of live allocations.
    len: usize,
}

impl ChunkList {
    /// Rows per chunk for columns of the given element sizes.
    ///
    /// Columns of zero-sized components take no room, so an archetype made
    /// only of them gets `CHUNK_SIZE` rows.
    #[must_use]
    pub fn capacity_for(sizes: &[usize]) -> usize {
        let stride: usize = sizes.iter().sum();
        if stride == 0 {
            return CHUNK_SIZE;
        }
        let padding = sizes.len().saturating_sub(1) * (COLUMN_ALIGN - 1);
        CHUNK_SIZE.saturating_sub(padding) / stride
    }

    /// Computes the layout for an archetype. `infos` gives the column order.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::ArchetypeTooLarge`] if not even one row fits.
    pub fn new(infos: &[ComponentInfo]) -> ArchiveResult<Self> {
        let sizes: Vec<usize> = infos.iter().map(|info| info.size).collect();
        let capacity = Self::capacity_for(&sizes);
        if capacity == 0 {
            return Err(ArchiveError::ArchetypeTooLarge {
                components: sizes.len(),
                stride: sizes.iter().sum(),
            });
        }

        let mut columns = Vec::with_capacity(infos.len());
        let mut end = 0;
        for info in infos {
            let offset = align_up(end, COLUMN_ALIGN);
            columns.push((info.id, ColumnRange { offset, size: info.size }));
            end = offset + info.size * capacity;
        }
        debug_assert!(end <= CHUNK_SIZE, "Columns overflow the chunk ({end} bytes)");
        columns.sort_unstable_by_key(|(id, _)| *id);

        Ok(Self {
            columns,
            capacity: SlotIndex::try_from(capacity).unwrap_or(SlotIndex::MAX),
            chunks: Vec::new(),
            len: 0,
        })
    }

    /// Rows per chunk.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity as usize
    }

    /// Number of live allocations.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Checks if nothing is allocated.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of chunks currently holding memory.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks.iter().filter(|chunk| chunk.is_some()).count()
    }

    /// Bytes of chunk memory held by this list.
    #[must_use]
    pub fn reserved_bytes(&self) -> usize {
        self.chunk_count() * CHUNK_SIZE
    }

    /// Iterates over `(component, column)` pairs, sorted by component ID.
    pub fn columns(&self) -> impl Iterator<Item = (ComponentId, ColumnRange)> + '_ {
        self.columns.iter().copied()
    }

    /// Column of `id`, if it is part of this archetype.
    #[inline]
    #[must_use]
    pub fn column(&self, id: ComponentId) -> Option<ColumnRange> {
        self.columns
            .binary_search_by_key(&id, |(column_id, _)| *column_id)
            .ok()
            .map(|index| self.columns[index].1)
    }

    /// Checks whether `id` is part of this archetype.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: ComponentId) -> bool {
        self.column(id).is_some()
    }

    #[inline]
    fn chunk(&self, index: usize) -> Option<&Chunk> {
        self.chunks.get(index)?.as_ref()
    }

    #[inline]
    fn chunk_mut(&mut self, index: usize) -> Option<&mut Chunk> {
        self.chunks.get_mut(index)?.as_mut()
    }

    /// Lowest chunk index with room for one more row (a reclaimed hole
    /// counts), or one past the end if every chunk is full.
    #[must_use]
    pub fn free_chunk_index(&self) -> usize {
        self.chunks
            .iter()
            .position(|chunk| chunk.as_ref().map_or(true, |chunk| !chunk.is_full()))
            .unwrap_or(self.chunks.len())
    }

    /// The allocation the next [`create`](Self::create) would return.
    #[must_use]
    pub fn next_allocation(&self) -> Allocation {
        let chunk = self.free_chunk_index();
        let slot = self
            .chunk(chunk)
            .and_then(Chunk::lowest_free_slot)
            .unwrap_or(0);
        Allocation::new(chunk, slot)
    }

    /// Reserves a row. Does not initialize any component bytes.
    pub fn create(&mut self) -> Allocation {
        let index = self.free_chunk_index();
        if index == self.chunks.len() {
            self.chunks.push(None);
        }

        let capacity = self.capacity;
        let chunk = self.chunks[index].get_or_insert_with(|| {
            tracing::debug!("allocating chunk {} ({} rows)", index, capacity);
            Chunk::new(capacity)
        });
        let Some(slot) = chunk.allocate() else {
            unreachable!("free_chunk_index returned full chunk {index}");
        };

        self.len += 1;
        Allocation::new(index, slot)
    }

    /// Releases a row. Does not touch the component bytes.
    pub fn destroy(&mut self, allocation: Allocation) {
        if let Some(chunk) = self.chunk_mut(allocation.chunk) {
            chunk.deallocate(allocation.slot);
            self.len -= 1;
        } else {
            debug_assert!(false, "Destroying {allocation:?} in a missing chunk");
        }
    }

    /// Address of `id`'s value for `allocation`.
    ///
    /// The address is invalidated by the next structural change to this list
    /// (create, destroy, migration, shrink).
    #[must_use]
    pub fn address_of(&self, allocation: Allocation, id: ComponentId) -> Option<NonNull<u8>> {
        if allocation.slot >= self.capacity {
            return None;
        }
        let column = self.column(id)?;
        let chunk = self.chunk(allocation.chunk)?;
        let offset = column.slot_range(allocation.slot).start;
        NonNull::new(chunk.base().as_ptr().wrapping_add(offset))
    }

    /// Bytes of `id`'s value for `allocation`.
    #[must_use]
    pub fn component_bytes(&self, allocation: Allocation, id: ComponentId) -> Option<&[u8]> {
        if allocation.slot >= self.capacity {
            return None;
        }
        let column = self.column(id)?;
        let chunk = self.chunk(allocation.chunk)?;
        Some(chunk.bytes(column.slot_range(allocation.slot)))
    }

    /// Mutable bytes of `id`'s value for `allocation`.
    pub fn component_bytes_mut(
        &mut self,
        allocation: Allocation,
        id: ComponentId,
    ) -> Option<&mut [u8]> {
        if allocation.slot >= self.capacity {
            return None;
        }
        let column = self.column(id)?;
        let chunk = self.chunk_mut(allocation.chunk)?;
        Some(chunk.bytes_mut(column.slot_range(allocation.slot)))
    }

    /// Frees every fully-empty chunk. Returns how many were freed.
    pub fn shrink_to_fit(&mut self) -> usize {
        let mut freed = 0;
        for slot in &mut self.chunks {
            if slot.as_ref().is_some_and(Chunk::is_empty) {
                *slot = None;
                freed += 1;
            }
        }
        while matches!(self.chunks.last(), Some(None)) {
            self.chunks.pop();
        }
        freed
    }

    /// Copies every component present in both lists from `src_alloc` to
    /// `dst_alloc`, then frees `src_alloc` in `src`.
    ///
    /// Components only in `src` are dropped on the floor; components only in
    /// `dst` are left for the caller to initialize.
    pub fn move_data(src: &mut Self, src_alloc: Allocation, dst: &mut Self, dst_alloc: Allocation) {
        if let Some(from) = src.chunk(src_alloc.chunk) {
            for &(id, src_column) in &src.columns {
                let Some(dst_column) = dst.column(id) else {
                    continue;
                };
                let bytes = from.bytes(src_column.slot_range(src_alloc.slot));
                if let Some(to) = dst.chunk_mut(dst_alloc.chunk) {
                    to.bytes_mut(dst_column.slot_range(dst_alloc.slot))
                        .copy_from_slice(bytes);
                }
            }
        } else {
            debug_assert!(false, "Moving from {src_alloc:?} in a missing chunk");
        }
        src.destroy(src_alloc);
    }

    /// Drops every chunk and allocation. The layout is kept.
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.len = 0;
    }

    /// Moves a row to another allocation of the same list and frees `from`.
    pub fn relocate(&mut self, from: Allocation, to: Allocation) {
        if from == to {
            return;
        }

        if from.chunk == to.chunk {
            if let Some(Some(chunk)) = self.chunks.get_mut(from.chunk) {
                for (_, column) in &self.columns {
                    let src = column.slot_range(from.slot);
                    let dst = column.slot_range(to.slot).start;
                    chunk.copy_within(src, dst);
                }
            }
        } else if from.chunk.max(to.chunk) < self.chunks.len() {
            let (src, dst) = if from.chunk < to.chunk {
                let (low, high) = self.chunks.split_at_mut(to.chunk);
                (&low[from.chunk], &mut high[0])
            } else {
                let (low, high) = self.chunks.split_at_mut(from.chunk);
                (&high[0], &mut low[to.chunk])
            };
            if let (Some(src), Some(dst)) = (src.as_ref(), dst.as_mut()) {
                for (_, column) in &self.columns {
                    dst.bytes_mut(column.slot_range(to.slot))
                        .copy_from_slice(src.bytes(column.slot_range(from.slot)));
                }
            }
        }

        self.destroy(from);
    }
}
