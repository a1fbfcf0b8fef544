//! # Memory Management
//!
//! Fixed-size chunk storage for archetype columns.
//!
//! ## Design Philosophy
//!
//! - Every chunk is exactly 16 KiB and 64-byte aligned
//! - Columns never straddle a chunk, so a column scan is one linear walk
//! - Slots are handed out lowest-first to keep occupancy packed
//! - Chunks are allocated lazily and reclaimed only on request

mod chunk;
mod chunk_list;

pub use chunk::{Chunk, SlotIndex, CHUNK_SIZE, COLUMN_ALIGN};
pub use chunk_list::{Allocation, ChunkList, ColumnRange};
