//! # Entity Component System
//!
//! Archetype-based component storage.
//!
//! ## Design Philosophy
//!
//! - Entities with the same component set share one chunk list
//! - Components are plain data and move by byte copy
//! - The registry is built once and shared; there is no global state
//! - Accessors re-resolve instead of caching addresses

mod archetype;
mod archive;
mod component;
mod entity;
pub mod filter;
mod handle;

pub use archetype::{Archetype, ArchetypeIndex};
pub use archive::{ArchiveStats, ComponentArchive};
pub use component::{Component, ComponentId, ComponentInfo, ComponentRegistry};
pub use entity::{Entity, EntitySequence};
pub use filter::ComponentFilter;
pub use handle::ComponentHandle;
