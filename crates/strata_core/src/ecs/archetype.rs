//! # Archetypes
//!
//! An archetype is the exact set of component types an entity carries.
//! Entities with the same archetype share one [`ChunkList`](crate::memory::ChunkList),
//! so iteration over an archetype is linear and cache-friendly.
//!
//! ```text
//! {Position, Velocity} -> ChunkList #1
//! {Velocity}           -> ChunkList #2
//! {}                   -> index 0, no storage
//! ```

use std::fmt;

use super::component::ComponentId;

/// Position of an archetype in the archive's archetype table.
pub type ArchetypeIndex = usize;

/// Signature of an archetype: which components it contains.
///
/// Uses a sorted, deduplicated vector of IDs so equal sets hash equally.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Archetype {
    /// Sorted component IDs.
    components: Vec<ComponentId>,
}

impl Archetype {
    /// Table index reserved for the empty archetype.
    pub const EMPTY_INDEX: ArchetypeIndex = 0;

    /// The archetype with no components.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            components: Vec::new(),
        }
    }

    /// Creates an archetype from any list of IDs.
    #[must_use]
    pub fn new(mut components: Vec<ComponentId>) -> Self {
        components.sort_unstable();
        components.dedup();
        Self { components }
    }

    /// Creates an archetype from a slice of IDs.
    #[must_use]
    pub fn from_ids(ids: &[ComponentId]) -> Self {
        Self::new(ids.to_vec())
    }

    /// Checks if this archetype contains `id`.
    #[inline]
    #[must_use]
    pub fn contains(&self, id: ComponentId) -> bool {
        self.components.binary_search(&id).is_ok()
    }

    /// This archetype plus `id`.
    #[must_use]
    pub fn with(&self, id: ComponentId) -> Self {
        let mut components = self.components.clone();
        if let Err(position) = components.binary_search(&id) {
            components.insert(position, id);
        }
        Self { components }
    }

    /// This archetype minus `id`.
    #[must_use]
    pub fn without(&self, id: ComponentId) -> Self {
        let mut components = self.components.clone();
        if let Ok(position) = components.binary_search(&id) {
            components.remove(position);
        }
        Self { components }
    }

    /// Checks if every component of `other` is in this archetype.
    #[must_use]
    pub fn is_superset_of(&self, other: &Self) -> bool {
        other.components.iter().all(|id| self.contains(*id))
    }

    /// Checks if the two archetypes share at least one component.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small.components.iter().any(|id| large.contains(*id))
    }

    /// Returns the number of component types.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Checks if empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Iterates over the IDs in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.components.iter().copied()
    }
}

impl FromIterator<ComponentId> for Archetype {
    fn from_iter<I: IntoIterator<Item = ComponentId>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, id) in self.components.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{:#x}", id.to_raw())?;
        }
        f.write_str("}")
    }
}
