//! # Component Handles
//!
//! A [`ComponentHandle`] names "the `T` of entity `e`" without holding any
//! address. Every access looks the entity up again, so a handle stays valid
//! across attach, detach, defragmentation and shrinking; it simply resolves
//! to `None` once the component is gone.

use std::fmt;
use std::marker::PhantomData;

use super::archive::ComponentArchive;
use super::component::Component;
use super::entity::Entity;

/// Re-resolving accessor for one component of one entity.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use strata_core::{ComponentArchive, ComponentRegistry, Entity};
///
/// let mut registry = ComponentRegistry::new();
/// registry.register::<u32>("Health").unwrap();
/// registry.register::<u8>("Team").unwrap();
/// let mut archive = ComponentArchive::new(Arc::new(registry));
///
/// let e = Entity::from_raw(1);
/// archive.attach_with(e, 10u32);
/// let health = archive.handle::<u32>(e);
///
/// archive.attach::<u8>(e); // moves e to another chunk list
/// assert_eq!(health.get(&archive), Some(&10));
/// ```
pub struct ComponentHandle<T> {
    entity: Entity,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Component> ComponentHandle<T> {
    /// Creates a handle for `entity`'s `T`.
    #[inline]
    #[must_use]
    pub const fn new(entity: Entity) -> Self {
        Self {
            entity,
            _marker: PhantomData,
        }
    }

    /// The entity this handle refers to.
    #[inline]
    #[must_use]
    pub const fn entity(&self) -> Entity {
        self.entity
    }

    /// Resolves the component, if still attached.
    #[inline]
    #[must_use]
    pub fn get<'a>(&self, archive: &'a ComponentArchive) -> Option<&'a T> {
        archive.get::<T>(self.entity)
    }

    /// Resolves the component mutably, if still attached.
    #[inline]
    pub fn get_mut<'a>(&self, archive: &'a mut ComponentArchive) -> Option<&'a mut T> {
        archive.get_mut::<T>(self.entity)
    }

    /// Checks whether the component is still attached.
    #[inline]
    #[must_use]
    pub fn is_attached(&self, archive: &ComponentArchive) -> bool {
        archive.contains::<T>(self.entity)
    }
}

// Manual impls: derives would demand `T: Clone` etc.
impl<T> Clone for ComponentHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ComponentHandle<T> {}

impl<T> PartialEq for ComponentHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.entity == other.entity
    }
}

impl<T> Eq for ComponentHandle<T> {}

impl<T> fmt::Debug for ComponentHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentHandle")
            .field("entity", &self.entity)
            .field("component", &std::any::type_name::<T>())
            .finish()
    }
}
