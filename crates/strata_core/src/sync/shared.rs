//! # Shared Archive
//!
//! Wraps a [`ComponentArchive`] in a reader/writer lock whose raw lock type
//! is picked per instance:
//!
//! ```text
//! ThreadSafeArchive = SharedArchive<parking_lot::RawRwLock>   blocks
//! LocalArchive      = SharedArchive<LocalRawRwLock>           panics, !Sync
//! ```
//!
//! Reads (`get`, `contains`, `query_archetype`, filters) take the shared
//! lock. Structural operations take the exclusive lock.

use std::fmt;
use std::marker::PhantomData;

use parking_lot::lock_api::{
    MappedRwLockReadGuard, MappedRwLockWriteGuard, RawRwLock, RwLock, RwLockReadGuard,
    RwLockWriteGuard,
};

use super::lock::LocalRawRwLock;
use crate::ecs::{filter, Archetype, Component, ComponentArchive, ComponentFilter, ComponentId, Entity};

/// Archive behind a lock, shared between threads.
pub type ThreadSafeArchive = SharedArchive<parking_lot::RawRwLock>;

/// Archive behind a single-threaded borrow flag.
pub type LocalArchive = SharedArchive<LocalRawRwLock>;

/// A [`ComponentArchive`] guarded by the lock `R`.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use strata_core::{ComponentArchive, ComponentRegistry, Entity, ThreadSafeArchive};
///
/// let mut registry = ComponentRegistry::new();
/// registry.register::<u32>("Health").unwrap();
/// let shared = ThreadSafeArchive::new(ComponentArchive::new(Arc::new(registry)));
///
/// let e = Entity::from_raw(1);
/// shared.attach_with(e, 3u32);
/// assert_eq!(shared.get::<u32>(e).map(|health| *health), Some(3));
/// ```
pub struct SharedArchive<R: RawRwLock = parking_lot::RawRwLock> {
    inner: RwLock<R, ComponentArchive>,
}

impl<R: RawRwLock> SharedArchive<R> {
    /// Wraps `archive`.
    #[must_use]
    pub fn new(archive: ComponentArchive) -> Self {
        Self {
            inner: RwLock::new(archive),
        }
    }

    /// Unwraps the archive.
    #[must_use]
    pub fn into_inner(self) -> ComponentArchive {
        self.inner.into_inner()
    }

    /// Takes the shared lock for a batch of reads.
    pub fn read(&self) -> RwLockReadGuard<'_, R, ComponentArchive> {
        self.inner.read()
    }

    /// Takes the exclusive lock for a batch of changes.
    pub fn write(&self) -> RwLockWriteGuard<'_, R, ComponentArchive> {
        self.inner.write()
    }

    // =========================================================================
    // Shared lock
    // =========================================================================

    /// See [`ComponentArchive::contains`].
    #[must_use]
    pub fn contains<T: Component>(&self, entity: Entity) -> bool {
        self.inner.read().contains::<T>(entity)
    }

    /// See [`ComponentArchive::contains_id`].
    #[must_use]
    pub fn contains_id(&self, entity: Entity, id: ComponentId) -> bool {
        self.inner.read().contains_id(entity, id)
    }

    /// See [`ComponentArchive::query_archetype`]. Returns a copy.
    #[must_use]
    pub fn query_archetype(&self, entity: Entity) -> Archetype {
        self.inner.read().query_archetype(entity).clone()
    }

    /// See [`ComponentArchive::is_tracked`].
    #[must_use]
    pub fn is_tracked(&self, entity: Entity) -> bool {
        self.inner.read().is_tracked(entity)
    }

    /// Reads `entity`'s `T`, holding the shared lock while the guard lives.
    pub fn get<T: Component>(&self, entity: Entity) -> Option<MappedRwLockReadGuard<'_, R, T>> {
        RwLockReadGuard::try_map(self.inner.read(), |archive| archive.get::<T>(entity)).ok()
    }

    /// Mutably borrows `entity`'s `T`, holding the exclusive lock while the
    /// guard lives.
    pub fn get_mut<T: Component>(
        &self,
        entity: Entity,
    ) -> Option<MappedRwLockWriteGuard<'_, R, T>> {
        RwLockWriteGuard::try_map(self.inner.write(), |archive| archive.get_mut::<T>(entity)).ok()
    }

    /// See [`filter::all`].
    #[must_use]
    pub fn filter_all(&self, entities: &[Entity], set: &Archetype) -> Vec<Entity> {
        filter::all(&self.inner.read(), entities, set)
    }

    /// See [`filter::any`].
    #[must_use]
    pub fn filter_any(&self, entities: &[Entity], set: &Archetype) -> Vec<Entity> {
        filter::any(&self.inner.read(), entities, set)
    }

    /// See [`filter::none`].
    #[must_use]
    pub fn filter_none(&self, entities: &[Entity], set: &Archetype) -> Vec<Entity> {
        filter::none(&self.inner.read(), entities, set)
    }

    /// See [`ComponentFilter::select`].
    #[must_use]
    pub fn select(&self, filter: &ComponentFilter, entities: &[Entity]) -> Vec<Entity> {
        filter.select(&self.inner.read(), entities)
    }

    /// A re-resolving handle bound to this archive.
    #[must_use]
    pub fn handle<T: Component>(&self, entity: Entity) -> SharedHandle<'_, R, T> {
        SharedHandle {
            archive: self,
            entity,
            _marker: PhantomData,
        }
    }

    // =========================================================================
    // Exclusive lock
    // =========================================================================

    /// See [`ComponentArchive::attach`].
    pub fn attach<T: Component>(&self, entity: Entity) -> bool {
        self.inner.write().attach::<T>(entity)
    }

    /// See [`ComponentArchive::attach_with`].
    pub fn attach_with<T: Component>(&self, entity: Entity, value: T) -> bool {
        self.inner.write().attach_with(entity, value)
    }

    /// See [`ComponentArchive::attach_id`].
    pub fn attach_id(&self, entity: Entity, id: ComponentId, run_default_ctor: bool) -> bool {
        self.inner.write().attach_id(entity, id, run_default_ctor)
    }

    /// See [`ComponentArchive::detach`].
    pub fn detach<T: Component>(&self, entity: Entity) -> bool {
        self.inner.write().detach::<T>(entity)
    }

    /// See [`ComponentArchive::detach_id`].
    pub fn detach_id(&self, entity: Entity, id: ComponentId) -> bool {
        self.inner.write().detach_id(entity, id)
    }

    /// See [`ComponentArchive::destroy`].
    pub fn destroy(&self, entity: Entity) -> bool {
        self.inner.write().destroy(entity)
    }

    /// See [`ComponentArchive::defragment`].
    pub fn defragment(&self) -> usize {
        self.inner.write().defragment()
    }

    /// See [`ComponentArchive::shrink_to_fit`].
    pub fn shrink_to_fit(&self, run_defrag_first: bool) -> usize {
        self.inner.write().shrink_to_fit(run_defrag_first)
    }

    /// See [`ComponentArchive::compact`].
    pub fn compact(&self) -> usize {
        self.inner.write().compact()
    }
}

impl<R: RawRwLock> From<ComponentArchive> for SharedArchive<R> {
    fn from(archive: ComponentArchive) -> Self {
        Self::new(archive)
    }
}

impl<R: RawRwLock> fmt::Debug for SharedArchive<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_read() {
            Some(archive) => f
                .debug_struct("SharedArchive")
                .field("entities", &archive.entity_count())
                .field("archetypes", &archive.archetype_count())
                .finish(),
            None => f.debug_struct("SharedArchive").finish_non_exhaustive(),
        }
    }
}

/// `{archive, entity}` pair that resolves `T` again on every access.
///
/// Each access takes the archive's lock for as long as the returned guard
/// lives, so a handle never observes a half-finished migration.
pub struct SharedHandle<'a, R: RawRwLock, T> {
    archive: &'a SharedArchive<R>,
    entity: Entity,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, R: RawRwLock, T: Component> SharedHandle<'a, R, T> {
    /// The entity this handle refers to.
    #[inline]
    #[must_use]
    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// Shared guard over the component, if attached.
    #[must_use]
    pub fn get(&self) -> Option<MappedRwLockReadGuard<'a, R, T>> {
        self.archive.get::<T>(self.entity)
    }

    /// Exclusive guard over the component, if attached.
    #[must_use]
    pub fn get_mut(&self) -> Option<MappedRwLockWriteGuard<'a, R, T>> {
        self.archive.get_mut::<T>(self.entity)
    }

    /// Copies the current value out.
    #[must_use]
    pub fn read(&self) -> Option<T> {
        self.get().map(|value| *value)
    }

    /// Overwrites the value. Returns `false` if the component is not attached.
    pub fn write(&self, value: T) -> bool {
        match self.get_mut() {
            Some(mut slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Checks whether the component is still attached.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.archive.contains::<T>(self.entity)
    }
}

impl<R: RawRwLock, T> Clone for SharedHandle<'_, R, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R: RawRwLock, T> Copy for SharedHandle<'_, R, T> {}

impl<R: RawRwLock, T> fmt::Debug for SharedHandle<'_, R, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedHandle")
            .field("entity", &self.entity)
            .field("component", &std::any::type_name::<T>())
            .finish()
    }
}
