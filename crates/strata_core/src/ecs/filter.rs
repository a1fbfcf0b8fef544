//! # Filters
//!
//! Read-only selection over a caller-supplied entity list. Only archetype
//! metadata is consulted; component memory is never touched.
//!
//! ```text
//! all(F)  : F ⊆ archetype(e)
//! any(F)  : F ∩ archetype(e) ≠ ∅
//! none(F) : F ∩ archetype(e) = ∅
//! ```

use super::archetype::Archetype;
use super::archive::ComponentArchive;
use super::component::ComponentId;
use super::entity::Entity;

/// Entities whose archetype contains every component of `set`.
#[must_use]
pub fn all(archive: &ComponentArchive, entities: &[Entity], set: &Archetype) -> Vec<Entity> {
    select_by(archive, entities, |archetype| archetype.is_superset_of(set))
}

/// Entities whose archetype contains at least one component of `set`.
///
/// `set` must not be empty.
#[must_use]
pub fn any(archive: &ComponentArchive, entities: &[Entity], set: &Archetype) -> Vec<Entity> {
    debug_assert!(!set.is_empty(), "filter::any needs a non-empty set");
    select_by(archive, entities, |archetype| archetype.intersects(set))
}

/// Entities whose archetype contains no component of `set`.
///
/// `set` must not be empty.
#[must_use]
pub fn none(archive: &ComponentArchive, entities: &[Entity], set: &Archetype) -> Vec<Entity> {
    debug_assert!(!set.is_empty(), "filter::none needs a non-empty set");
    select_by(archive, entities, |archetype| !archetype.intersects(set))
}

fn select_by<F>(archive: &ComponentArchive, entities: &[Entity], predicate: F) -> Vec<Entity>
where
    F: Fn(&Archetype) -> bool,
{
    entities
        .iter()
        .copied()
        .filter(|entity| predicate(archive.query_archetype(*entity)))
        .collect()
}

/// Combined constraint: all of `required`, at least one of `any_of`
/// (ignored when empty), none of `excluded`.
///
/// # Example
///
/// ```rust
/// use strata_core::{ComponentFilter, ComponentId, Archetype};
///
/// let pos = ComponentId::from_tag("Position");
/// let frozen = ComponentId::from_tag("Frozen");
/// let filter = ComponentFilter::new().with(pos).without(frozen);
///
/// assert!(filter.matches(&Archetype::from_ids(&[pos])));
/// assert!(!filter.matches(&Archetype::from_ids(&[pos, frozen])));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ComponentFilter {
    required: Archetype,
    any_of: Archetype,
    excluded: Archetype,
}

impl ComponentFilter {
    /// A filter matching every archetype.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires `id`.
    #[must_use]
    pub fn with(mut self, id: ComponentId) -> Self {
        self.required = self.required.with(id);
        self
    }

    /// Requires at least one of the `any_of` components, `id` among them.
    #[must_use]
    pub fn with_any(mut self, id: ComponentId) -> Self {
        self.any_of = self.any_of.with(id);
        self
    }

    /// Rejects archetypes containing `id`.
    #[must_use]
    pub fn without(mut self, id: ComponentId) -> Self {
        self.excluded = self.excluded.with(id);
        self
    }

    /// Checks an archetype against every constraint.
    #[must_use]
    pub fn matches(&self, archetype: &Archetype) -> bool {
        archetype.is_superset_of(&self.required)
            && (self.any_of.is_empty() || archetype.intersects(&self.any_of))
            && !archetype.intersects(&self.excluded)
    }

    /// The matching subset of `entities`, in input order.
    #[must_use]
    pub fn select(&self, archive: &ComponentArchive, entities: &[Entity]) -> Vec<Entity> {
        select_by(archive, entities, |archetype| self.matches(archetype))
    }
}
