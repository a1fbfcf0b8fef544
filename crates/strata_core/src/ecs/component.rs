//! # Component Registry
//!
//! Components are pure data containers with no behavior. Structural changes
//! move them with a raw byte copy, so every component type must be plain old
//! data. The [`Component`] bound enforces that at registration time.
//!
//! IDs are the 64-bit FNV-1a hash of a programmer-supplied tag, so they are
//! stable across builds and platforms.

use std::any::{type_name, TypeId};
use std::collections::hash_map::Entry;
use std::fmt;
use std::hash::Hasher;
use std::mem::{align_of, size_of};

use bytemuck::Pod;
use fnv::{FnvHashMap, FnvHasher};

use crate::error::{RegistryError, RegistryResult};
use crate::memory::{CHUNK_SIZE, COLUMN_ALIGN};

/// Marker trait for storable components.
///
/// Components must be:
/// - `Pod`: plain old data, safe to relocate with `memcpy`, no `Drop`
/// - `Default`: used when attaching without an explicit value
/// - `Send + Sync`: the archive may sit behind a shared lock
///
/// Implemented automatically for every qualifying type.
///
/// # Example
///
/// ```rust
/// use bytemuck::{Pod, Zeroable};
///
/// #[derive(Clone, Copy, Default, Pod, Zeroable)]
/// #[repr(C)]
/// struct Position {
///     x: f32,
///     y: f32,
///     z: f32,
/// }
/// ```
pub trait Component: Pod + Default + Send + Sync + 'static {}

impl<T> Component for T where T: Pod + Default + Send + Sync + 'static {}

/// Stable numeric identifier of a registered component type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ComponentId(u64);

impl ComponentId {
    /// The invalid sentinel. Never assigned to a registered type.
    pub const INVALID: Self = Self(0);

    /// Derives the ID for a tag (64-bit FNV-1a over the UTF-8 bytes).
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        let mut hasher = FnvHasher::default();
        hasher.write(tag.as_bytes());
        Self(hasher.finish())
    }

    /// Wraps a raw value.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn to_raw(self) -> u64 {
        self.0
    }

    /// Checks that this is not the invalid sentinel.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentId({:#018x})", self.0)
    }
}

/// Metadata recorded for a registered component type.
#[derive(Clone, Copy, Debug)]
pub struct ComponentInfo {
    /// Stable identifier.
    pub id: ComponentId,
    /// The registration tag.
    pub name: &'static str,
    /// Size of one value in bytes.
    pub size: usize,
    /// Alignment requirement.
    pub align: usize,
    /// Rust type behind this ID.
    pub type_id: TypeId,
    write_default: fn(&mut [u8]),
}

impl ComponentInfo {
    /// Writes the type's default value into `dst` (exactly `size` bytes).
    #[inline]
    pub fn write_default(&self, dst: &mut [u8]) {
        (self.write_default)(dst);
    }
}

fn write_default<T: Component>(dst: &mut [u8]) {
    dst.copy_from_slice(bytemuck::bytes_of(&T::default()));
}

/// Table of registered component types.
///
/// Built once at startup by the application and then shared read-only
/// (usually behind an `Arc`) with every archive that uses it.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use strata_core::{ComponentArchive, ComponentRegistry};
///
/// let mut registry = ComponentRegistry::new();
/// let health = registry.register::<u32>("Health").unwrap();
///
/// let archive = ComponentArchive::new(Arc::new(registry));
/// assert_eq!(archive.registry().info_of(health).unwrap().size, 4);
/// ```
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    infos: FnvHashMap<ComponentId, ComponentInfo>,
    by_type: FnvHashMap<TypeId, ComponentId>,
    /// Registration order, for deterministic iteration.
    order: Vec<ComponentId>,
}

impl ComponentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` under `tag`.
    ///
    /// Registering an already known type again is a no-op that returns the
    /// existing ID. A differing tag is ignored with a warning.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::IdCollision`] if the tag hashes to an ID owned by
    ///   another type
    /// - [`RegistryError::ReservedId`] if the tag hashes to zero
    /// - [`RegistryError::AlignmentTooLarge`] / [`RegistryError::TooLarge`] if
    ///   `T` cannot live in a chunk column
    pub fn register<T: Component>(&mut self, tag: &'static str) -> RegistryResult<ComponentId> {
        let type_id = TypeId::of::<T>();
        if let Some(&existing) = self.by_type.get(&type_id) {
            let existing_tag = self.infos[&existing].name;
            if existing_tag != tag {
                tracing::warn!(
                    "component {} already registered as '{}', ignoring tag '{}'",
                    type_name::<T>(),
                    existing_tag,
                    tag
                );
            }
            return Ok(existing);
        }

        let id = ComponentId::from_tag(tag);
        if !id.is_valid() {
            return Err(RegistryError::ReservedId(tag));
        }

        let (size, align) = (size_of::<T>(), align_of::<T>());
        if align > COLUMN_ALIGN {
            return Err(RegistryError::AlignmentTooLarge {
                tag,
                align,
                max: COLUMN_ALIGN,
            });
        }
        if size > CHUNK_SIZE {
            return Err(RegistryError::TooLarge {
                tag,
                size,
                max: CHUNK_SIZE,
            });
        }

        match self.infos.entry(id) {
            Entry::Occupied(slot) => Err(RegistryError::IdCollision {
                tag,
                id,
                existing: slot.get().name,
            }),
            Entry::Vacant(slot) => {
                slot.insert(ComponentInfo {
                    id,
                    name: tag,
                    size,
                    align,
                    type_id,
                    write_default: write_default::<T>,
                });
                self.by_type.insert(type_id, id);
                self.order.push(id);
                tracing::debug!("registered component '{}' as {} ({} bytes)", tag, id, size);
                Ok(id)
            }
        }
    }

    /// Looks up the info for an ID.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Unregistered`] for unknown IDs.
    pub fn info_of(&self, id: ComponentId) -> RegistryResult<&ComponentInfo> {
        self.infos.get(&id).ok_or(RegistryError::Unregistered(id))
    }

    /// Returns the ID `T` was registered under, if any.
    #[inline]
    #[must_use]
    pub fn id_of<T: Component>(&self) -> Option<ComponentId> {
        self.by_type.get(&TypeId::of::<T>()).copied()
    }

    /// Checks whether an ID is registered.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: ComponentId) -> bool {
        self.infos.contains_key(&id)
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Checks if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterates over registered types in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &ComponentInfo> {
        self.order.iter().map(move |id| &self.infos[id])
    }
}
