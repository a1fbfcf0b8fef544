//! # STRATA Core
//!
//! Archetype-based entity/component storage designed for:
//! - Entities grouped by exact component set
//! - Component columns packed into 16 KiB, 64-byte aligned chunks
//! - Byte-copy migration between archetypes on attach/detach
//!
//! ## Architecture Rules
//!
//! 1. **Plain data only** - every component is `bytemuck::Pod`
//! 2. **No global state** - the registry is built at startup and injected
//! 3. **Re-resolve, don't cache** - handles look the entity up on every access
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use bytemuck::{Pod, Zeroable};
//! use strata_core::{ComponentArchive, ComponentRegistry, EntitySequence};
//!
//! #[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
//! #[repr(C)]
//! struct Position { x: f32, y: f32, z: f32 }
//!
//! let mut registry = ComponentRegistry::new();
//! registry.register::<Position>("Position").unwrap();
//!
//! let mut archive = ComponentArchive::new(Arc::new(registry));
//! let entities = EntitySequence::new();
//! let e = entities.next_entity();
//!
//! archive.attach_with(e, Position { x: 1.0, y: 2.0, z: 3.0 });
//! assert_eq!(archive.get::<Position>(e).unwrap().z, 3.0);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod error;
pub mod memory;
pub mod sync;

pub use config::ArchiveConfig;
pub use ecs::{
    filter, Archetype, ArchetypeIndex, ArchiveStats, Component, ComponentArchive, ComponentFilter,
    ComponentHandle, ComponentId, ComponentInfo, ComponentRegistry, Entity, EntitySequence,
};
pub use error::{
    ArchiveError, ArchiveResult, ConfigError, ConfigResult, RegistryError, RegistryResult,
};
pub use memory::{Allocation, CHUNK_SIZE, COLUMN_ALIGN};
pub use sync::{LocalArchive, LocalRawRwLock, SharedArchive, SharedHandle, ThreadSafeArchive};
