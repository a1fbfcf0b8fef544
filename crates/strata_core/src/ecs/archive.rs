//! # Component Archive
//!
//! The central container: tracks which archetype every entity belongs to and
//! moves component data between chunk lists as components come and go.
//!
//! ## Structural Changes
//!
//! ```text
//! attach Velocity to e:   {Position}           -> {Position, Velocity}
//!                          copy Position bytes, default-construct Velocity
//!
//! detach Position from e: {Position, Velocity} -> {Velocity}
//!                          copy Velocity bytes, drop Position bytes
//! ```
//!
//! Migration is a plain byte copy, which is sound because every component is
//! `Pod`. Components have no destructors, so dropping bytes is free.
//!
//! ## Invalidation
//!
//! References from [`get`](ComponentArchive::get) borrow the archive, so the
//! borrow checker already forbids holding one across a structural change.
//! Raw addresses from [`address_of`](ComponentArchive::address_of) carry no
//! such guarantee: they are invalidated by the next attach, detach, destroy,
//! defragment or shrink on any entity sharing the same chunk list.

use std::any::type_name;
use std::cmp::Reverse;
use std::ptr::NonNull;
use std::sync::Arc;

use fnv::FnvHashMap;

use super::archetype::{Archetype, ArchetypeIndex};
use super::component::{Component, ComponentId, ComponentRegistry};
use super::entity::Entity;
use super::handle::ComponentHandle;
use crate::config::ArchiveConfig;
use crate::error::{ArchiveError, ArchiveResult, RegistryResult};
use crate::memory::{Allocation, ChunkList};

static EMPTY_ARCHETYPE: Archetype = Archetype::empty();

/// Where an entity's data lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct EntityRecord {
    archetype: ArchetypeIndex,
    allocation: Allocation,
}

/// Storage statistics, for diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArchiveStats {
    /// Tracked entities.
    pub entities: usize,
    /// Known archetypes, including the empty one.
    pub archetypes: usize,
    /// Chunks currently holding memory.
    pub chunks: usize,
    /// Bytes held by those chunks.
    pub reserved_bytes: usize,
    /// Occupied rows across all chunks.
    pub used_slots: usize,
    /// Total rows across all chunks.
    pub total_slots: usize,
}

impl ArchiveStats {
    /// Fraction of chunk rows in use (1.0 when nothing is allocated).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn occupancy(&self) -> f32 {
        if self.total_slots == 0 {
            1.0
        } else {
            self.used_slots as f32 / self.total_slots as f32
        }
    }
}

/// Archetype-based component storage.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use strata_core::{ComponentArchive, ComponentRegistry, Entity};
///
/// let mut registry = ComponentRegistry::new();
/// registry.register::<u32>("Health").unwrap();
/// let mut archive = ComponentArchive::new(Arc::new(registry));
///
/// let e = Entity::from_raw(1);
/// assert!(archive.attach_with(e, 100u32));
/// assert!(!archive.attach::<u32>(e));
/// assert_eq!(archive.get::<u32>(e), Some(&100));
/// ```
#[derive(Debug)]
pub struct ComponentArchive {
    registry: Arc<ComponentRegistry>,
    config: ArchiveConfig,
    /// Index 0 is always the empty archetype.
    archetypes: Vec<Archetype>,
    lookup: FnvHashMap<Archetype, ArchetypeIndex>,
    /// Parallel to `archetypes`; `None` for the empty archetype.
    storages: Vec<Option<ChunkList>>,
    records: FnvHashMap<Entity, EntityRecord>,
}

impl ComponentArchive {
    /// Creates an archive with default configuration.
    #[must_use]
    pub fn new(registry: Arc<ComponentRegistry>) -> Self {
        Self::with_config(registry, ArchiveConfig::default())
    }

    /// Creates an archive with explicit configuration.
    #[must_use]
    pub fn with_config(registry: Arc<ComponentRegistry>, config: ArchiveConfig) -> Self {
        let mut archetypes = Vec::with_capacity(config.expected_archetypes);
        let mut storages = Vec::with_capacity(config.expected_archetypes);
        let mut lookup = FnvHashMap::default();
        lookup.reserve(config.expected_archetypes);
        let mut records = FnvHashMap::default();
        records.reserve(config.expected_entities);

        archetypes.push(Archetype::empty());
        storages.push(None);
        lookup.insert(Archetype::empty(), Archetype::EMPTY_INDEX);

        Self {
            registry,
            config,
            archetypes,
            lookup,
            storages,
            records,
        }
    }

    /// The registry this archive resolves component IDs against.
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.registry
    }

    /// The configuration in effect.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Checks whether `entity` has a `T`.
    #[must_use]
    pub fn contains<T: Component>(&self, entity: Entity) -> bool {
        self.registry
            .id_of::<T>()
            .is_some_and(|id| self.contains_id(entity, id))
    }

    /// Checks whether `entity` has the component `id`.
    #[must_use]
    pub fn contains_id(&self, entity: Entity, id: ComponentId) -> bool {
        self.query_archetype(entity).contains(id)
    }

    /// The components `entity` carries. Empty for untracked entities.
    #[must_use]
    pub fn query_archetype(&self, entity: Entity) -> &Archetype {
        self.records
            .get(&entity)
            .and_then(|record| self.archetypes.get(record.archetype))
            .unwrap_or(&EMPTY_ARCHETYPE)
    }

    /// Checks whether the archive holds any data for `entity`.
    ///
    /// Detaching the last component untracks an entity, exactly like
    /// [`destroy`](Self::destroy).
    #[inline]
    #[must_use]
    pub fn is_tracked(&self, entity: Entity) -> bool {
        self.records.contains_key(&entity)
    }

    /// Iterates over all tracked entities, in no particular order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.records.keys().copied()
    }

    /// Number of tracked entities.
    #[inline]
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.records.len()
    }

    /// Number of known archetypes, including the empty one.
    #[inline]
    #[must_use]
    pub fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }

    /// Iterates over known archetypes in creation order.
    pub fn archetypes(&self) -> impl Iterator<Item = &Archetype> {
        self.archetypes.iter()
    }

    /// Collects storage statistics.
    #[must_use]
    pub fn stats(&self) -> ArchiveStats {
        let mut stats = ArchiveStats {
            entities: self.records.len(),
            archetypes: self.archetypes.len(),
            ..ArchiveStats::default()
        };
        for list in self.storages.iter().flatten() {
            let chunks = list.chunk_count();
            stats.chunks += chunks;
            stats.reserved_bytes += list.reserved_bytes();
            stats.used_slots += list.len();
            stats.total_slots += chunks * list.capacity();
        }
        stats
    }

    // =========================================================================
    // Attach
    // =========================================================================

    /// Attaches a default-constructed `T`.
    ///
    /// Returns `false` if `entity` already has a `T`, leaving it unchanged.
    pub fn attach<T: Component>(&mut self, entity: Entity) -> bool {
        match self.typed_id::<T>() {
            Ok(id) => self.attach_id(entity, id, true),
            Err(err) => {
                report("attach", entity, &err);
                false
            }
        }
    }

    /// Attaches `value`.
    ///
    /// Returns `false` if `entity` already has a `T`; the existing value is
    /// kept and `value` is discarded.
    pub fn attach_with<T: Component>(&mut self, entity: Entity, value: T) -> bool {
        let result = self.typed_id::<T>().and_then(|id| {
            let added = self.try_attach_id(entity, id, false)?;
            if added {
                if let Some(bytes) = self.get_id_mut(entity, id) {
                    bytes.copy_from_slice(bytemuck::bytes_of(&value));
                }
            }
            Ok(added)
        });
        unwrap_or_report("attach", entity, result)
    }

    /// Attaches the component `id`.
    ///
    /// With `run_default_ctor` unset the new bytes are left as found: zero in
    /// a fresh chunk, or whatever a previous occupant of the slot left behind.
    pub fn attach_id(&mut self, entity: Entity, id: ComponentId, run_default_ctor: bool) -> bool {
        let result = self.try_attach_id(entity, id, run_default_ctor);
        unwrap_or_report("attach", entity, result)
    }

    /// [`attach_id`](Self::attach_id), reporting programmer errors as `Err`
    /// instead of logging them.
    ///
    /// # Errors
    ///
    /// - [`ArchiveError::InvalidEntity`] for the invalid sentinel
    /// - [`ArchiveError::Registry`] if `id` is not registered
    /// - [`ArchiveError::ArchetypeTooLarge`] if the new archetype cannot fit
    ///   one row in a chunk
    /// - [`ArchiveError::CorruptRecord`] if internal bookkeeping is broken
    pub fn try_attach_id(
        &mut self,
        entity: Entity,
        id: ComponentId,
        run_default_ctor: bool,
    ) -> ArchiveResult<bool> {
        if !entity.is_valid() {
            return Err(ArchiveError::InvalidEntity);
        }
        let info = *self.registry.info_of(id)?;

        let old = self.records.get(&entity).copied();
        let old_index = old.map_or(Archetype::EMPTY_INDEX, |record| record.archetype);
        let old_archetype = self.archetype_at(entity, old_index)?;
        if old_archetype.contains(id) {
            return Ok(false);
        }

        let new_archetype = old_archetype.with(id);
        let new_index = self.find_or_create(new_archetype)?;
        let allocation = self.migrate(
            entity,
            old_index,
            old.map(|record| record.allocation),
            new_index,
        )?;
        self.records.insert(
            entity,
            EntityRecord {
                archetype: new_index,
                allocation,
            },
        );

        if run_default_ctor {
            if let Some(bytes) = self
                .storage_mut(new_index)
                .and_then(|list| list.component_bytes_mut(allocation, id))
            {
                info.write_default(bytes);
            }
        }
        Ok(true)
    }

    // =========================================================================
    // Detach / Destroy
    // =========================================================================

    /// Detaches `T`. Returns whether a component was removed.
    pub fn detach<T: Component>(&mut self, entity: Entity) -> bool {
        match self.registry.id_of::<T>() {
            Some(id) => self.detach_id(entity, id),
            None => false,
        }
    }

    /// Detaches the component `id`. Absent components are a silent no-op.
    ///
    /// Detaching the last component erases the entity's record.
    pub fn detach_id(&mut self, entity: Entity, id: ComponentId) -> bool {
        let result = self.try_detach_id(entity, id);
        unwrap_or_report("detach", entity, result)
    }

    fn try_detach_id(&mut self, entity: Entity, id: ComponentId) -> ArchiveResult<bool> {
        let Some(record) = self.records.get(&entity).copied() else {
            return Ok(false);
        };
        let old_archetype = self.archetype_at(entity, record.archetype)?;
        if !old_archetype.contains(id) {
            return Ok(false);
        }

        let new_archetype = old_archetype.without(id);
        if new_archetype.is_empty() {
            self.storage_mut(record.archetype)
                .ok_or(ArchiveError::CorruptRecord {
                    entity,
                    archetype: record.archetype,
                })?
                .destroy(record.allocation);
            self.records.remove(&entity);
            return Ok(true);
        }

        let new_index = self.find_or_create(new_archetype)?;
        let allocation = self.migrate(
            entity,
            record.archetype,
            Some(record.allocation),
            new_index,
        )?;
        self.records.insert(
            entity,
            EntityRecord {
                archetype: new_index,
                allocation,
            },
        );
        Ok(true)
    }

    /// Releases all storage for `entity` and forgets it.
    ///
    /// Returns `false` if the entity was not tracked.
    pub fn destroy(&mut self, entity: Entity) -> bool {
        let Some(record) = self.records.remove(&entity) else {
            return false;
        };
        match self.storage_mut(record.archetype) {
            Some(list) => {
                list.destroy(record.allocation);
                true
            }
            None => {
                let err = ArchiveError::CorruptRecord {
                    entity,
                    archetype: record.archetype,
                };
                report("destroy", entity, &err);
                false
            }
        }
    }

    /// Forgets every entity and frees every chunk. Archetypes are kept.
    pub fn clear(&mut self) {
        self.records.clear();
        for list in self.storages.iter_mut().flatten() {
            list.clear();
        }
    }

    // =========================================================================
    // Access
    // =========================================================================

    /// Reads `entity`'s `T`.
    #[must_use]
    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        let id = self.registry.id_of::<T>()?;
        self.get_id(entity, id).map(bytemuck::from_bytes)
    }

    /// Mutably borrows `entity`'s `T`.
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        let id = self.registry.id_of::<T>()?;
        self.get_id_mut(entity, id).map(bytemuck::from_bytes_mut)
    }

    /// Raw bytes of `entity`'s component `id`.
    #[must_use]
    pub fn get_id(&self, entity: Entity, id: ComponentId) -> Option<&[u8]> {
        let record = self.records.get(&entity)?;
        self.storage(record.archetype)?
            .component_bytes(record.allocation, id)
    }

    /// Mutable raw bytes of `entity`'s component `id`.
    pub fn get_id_mut(&mut self, entity: Entity, id: ComponentId) -> Option<&mut [u8]> {
        let record = *self.records.get(&entity)?;
        self.storage_mut(record.archetype)?
            .component_bytes_mut(record.allocation, id)
    }

    /// Raw address of `entity`'s component `id`.
    ///
    /// The address is invalidated by the next structural change to any entity
    /// sharing the same archetype.
    #[must_use]
    pub fn address_of(&self, entity: Entity, id: ComponentId) -> Option<NonNull<u8>> {
        let record = self.records.get(&entity)?;
        self.storage(record.archetype)?
            .address_of(record.allocation, id)
    }

    /// A re-resolving accessor for `entity`'s `T`.
    #[must_use]
    pub fn handle<T: Component>(&self, entity: Entity) -> ComponentHandle<T> {
        ComponentHandle::new(entity)
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Moves entities toward the lowest free rows of their chunk lists.
    ///
    /// Entities are visited from the highest allocation down; each one moves
    /// only if its list's next free row sits strictly before it. Values are
    /// never changed. Returns the number of entities moved.
    pub fn defragment(&mut self) -> usize {
        let mut order: Vec<(Entity, EntityRecord)> =
            self.records.iter().map(|(e, r)| (*e, *r)).collect();
        order.sort_unstable_by_key(|(entity, record)| {
            (record.archetype, Reverse(record.allocation), *entity)
        });

        let mut moved = 0;
        for (entity, record) in order {
            let Some(list) = self
                .storages
                .get_mut(record.archetype)
                .and_then(Option::as_mut)
            else {
                continue;
            };
            if list.next_allocation() >= record.allocation {
                continue;
            }
            let target = list.create();
            list.relocate(record.allocation, target);
            if let Some(entry) = self.records.get_mut(&entity) {
                entry.allocation = target;
            }
            moved += 1;
        }

        tracing::debug!("defragment relocated {} entities", moved);
        moved
    }

    /// Frees every fully-empty chunk, optionally defragmenting first.
    /// Returns the number of chunks freed.
    pub fn shrink_to_fit(&mut self, run_defrag_first: bool) -> usize {
        if run_defrag_first {
            self.defragment();
        }
        let freed: usize = self
            .storages
            .iter_mut()
            .flatten()
            .map(ChunkList::shrink_to_fit)
            .sum();
        tracing::info!("shrink_to_fit reclaimed {} chunks", freed);
        freed
    }

    /// [`shrink_to_fit`](Self::shrink_to_fit) using the configured
    /// `defragment_before_shrink`.
    pub fn compact(&mut self) -> usize {
        self.shrink_to_fit(self.config.defragment_before_shrink)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn typed_id<T: Component>(&self) -> ArchiveResult<ComponentId> {
        self.registry
            .id_of::<T>()
            .ok_or(ArchiveError::UnregisteredType(type_name::<T>()))
    }

    fn archetype_at(&self, entity: Entity, index: ArchetypeIndex) -> ArchiveResult<&Archetype> {
        self.archetypes.get(index).ok_or(ArchiveError::CorruptRecord {
            entity,
            archetype: index,
        })
    }

    #[inline]
    fn storage(&self, index: ArchetypeIndex) -> Option<&ChunkList> {
        self.storages.get(index)?.as_ref()
    }

    #[inline]
    fn storage_mut(&mut self, index: ArchetypeIndex) -> Option<&mut ChunkList> {
        self.storages.get_mut(index)?.as_mut()
    }

    /// Two distinct chunk lists, mutably.
    fn storage_pair(
        &mut self,
        a: ArchetypeIndex,
        b: ArchetypeIndex,
    ) -> Option<(&mut ChunkList, &mut ChunkList)> {
        if a == b || a.max(b) >= self.storages.len() {
            return None;
        }
        let (first, second) = if a < b {
            let (low, high) = self.storages.split_at_mut(b);
            (&mut low[a], &mut high[0])
        } else {
            let (low, high) = self.storages.split_at_mut(a);
            (&mut high[0], &mut low[b])
        };
        Some((first.as_mut()?, second.as_mut()?))
    }

    fn find_or_create(&mut self, archetype: Archetype) -> ArchiveResult<ArchetypeIndex> {
        if let Some(&index) = self.lookup.get(&archetype) {
            return Ok(index);
        }

        let infos = archetype
            .iter()
            .map(|id| self.registry.info_of(id).copied())
            .collect::<RegistryResult<Vec<_>>>()?;
        let list = ChunkList::new(&infos)?;

        let index = self.archetypes.len();
        tracing::debug!(
            "created archetype {} {} ({} rows per chunk)",
            index,
            archetype,
            list.capacity()
        );
        self.lookup.insert(archetype.clone(), index);
        self.archetypes.push(archetype);
        self.storages.push(Some(list));
        Ok(index)
    }

    /// Allocates a row in `new_index` and moves the shared components there
    /// from `old` (if any), freeing the old row.
    fn migrate(
        &mut self,
        entity: Entity,
        old_index: ArchetypeIndex,
        old: Option<Allocation>,
        new_index: ArchetypeIndex,
    ) -> ArchiveResult<Allocation> {
        let corrupt = |archetype| ArchiveError::CorruptRecord { entity, archetype };

        let Some(src_alloc) = old else {
            return Ok(self.storage_mut(new_index).ok_or(corrupt(new_index))?.create());
        };

        let (src, dst) = self
            .storage_pair(old_index, new_index)
            .ok_or(corrupt(old_index))?;
        let dst_alloc = dst.create();
        ChunkList::move_data(src, src_alloc, dst, dst_alloc);
        tracing::trace!(
            "{} migrated archetype {} -> {} ({:?})",
            entity,
            old_index,
            new_index,
            dst_alloc
        );
        Ok(dst_alloc)
    }
}

fn report(operation: &'static str, entity: Entity, err: &ArchiveError) {
    tracing::error!("{} on {} failed: {}", operation, entity, err);
    debug_assert!(false, "{operation} on {entity} failed: {err}");
}

fn unwrap_or_report(operation: &'static str, entity: Entity, result: ArchiveResult<bool>) -> bool {
    result.unwrap_or_else(|err| {
        report(operation, entity, &err);
        false
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytemuck::{Pod, Zeroable};
    use crate::memory::CHUNK_SIZE;

    #[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct Position {
        x: f32,
        y: f32,
        z: f32,
    }

    #[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct Velocity {
        x: f32,
        y: f32,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct Big([u64; 32]);

    impl Default for Big {
        fn default() -> Self {
            Self([7; 32])
        }
    }

    fn archive() -> ComponentArchive {
        let mut registry = ComponentRegistry::new();
        registry.register::<Position>("Position").unwrap();
        registry.register::<Velocity>("Velocity").unwrap();
        registry.register::<Big>("Big").unwrap();
        ComponentArchive::new(Arc::new(registry))
    }

    fn ids(archive: &ComponentArchive) -> (ComponentId, ComponentId) {
        let registry = archive.registry();
        (
            registry.id_of::<Position>().unwrap(),
            registry.id_of::<Velocity>().unwrap(),
        )
    }

    #[test]
    fn test_position_velocity_scenario() {
        let mut archive = archive();
        let (pos, vel) = ids(&archive);
        let e1 = Entity::from_raw(1);

        assert!(archive.attach_with(e1, Position { x: 1.0, y: 2.0, z: 3.0 }));
        assert_eq!(
            archive.get::<Position>(e1),
            Some(&Position { x: 1.0, y: 2.0, z: 3.0 })
        );

        assert!(archive.attach_with(e1, Velocity { x: 4.0, y: 5.0 }));
        assert_eq!(*archive.query_archetype(e1), Archetype::from_ids(&[pos, vel]));
        assert_eq!(
            archive.get::<Position>(e1),
            Some(&Position { x: 1.0, y: 2.0, z: 3.0 })
        );

        assert!(archive.detach::<Position>(e1));
        assert_eq!(*archive.query_archetype(e1), Archetype::from_ids(&[vel]));
        assert_eq!(archive.get::<Velocity>(e1), Some(&Velocity { x: 4.0, y: 5.0 }));
        assert!(archive.get::<Position>(e1).is_none());

        assert!(archive.destroy(e1));
        assert!(!archive.contains::<Velocity>(e1));
        assert!(archive.query_archetype(e1).is_empty());
        assert!(!archive.is_tracked(e1));
    }

    #[test]
    fn test_attach_twice_keeps_value() {
        let mut archive = archive();
        let e = Entity::from_raw(1);

        assert!(archive.attach_with(e, Velocity { x: 1.0, y: 1.0 }));
        assert!(!archive.attach_with(e, Velocity { x: 9.0, y: 9.0 }));
        assert!(!archive.attach::<Velocity>(e));
        assert_eq!(archive.get::<Velocity>(e), Some(&Velocity { x: 1.0, y: 1.0 }));
    }

    #[test]
    fn test_attach_runs_default() {
        let mut archive = archive();
        let e = Entity::from_raw(3);
        assert!(archive.attach::<Big>(e));
        assert_eq!(archive.get::<Big>(e), Some(&Big([7; 32])));
    }

    #[test]
    fn test_detach_absent_is_noop() {
        let mut archive = archive();
        let e = Entity::from_raw(1);

        assert!(!archive.detach::<Position>(e));
        archive.attach_with(e, Velocity { x: 2.0, y: 3.0 });
        assert!(!archive.detach::<Position>(e));
        assert_eq!(archive.get::<Velocity>(e), Some(&Velocity { x: 2.0, y: 3.0 }));
    }

    #[test]
    fn test_detach_last_component_untracks() {
        let mut archive = archive();
        let e = Entity::from_raw(1);

        archive.attach::<Position>(e);
        assert!(archive.is_tracked(e));
        assert!(archive.detach::<Position>(e));
        assert!(!archive.is_tracked(e));
        assert!(archive.query_archetype(e).is_empty());
        assert_eq!(archive.entity_count(), 0);
        assert_eq!(archive.stats().used_slots, 0);
    }

    #[test]
    fn test_get_mut_writes_through() {
        let mut archive = archive();
        let e = Entity::from_raw(1);
        archive.attach::<Position>(e);

        archive.get_mut::<Position>(e).unwrap().y = 5.0;
        archive.attach::<Velocity>(e);
        assert_eq!(archive.get::<Position>(e).unwrap().y, 5.0);
    }

    #[test]
    fn test_archetypes_are_shared() {
        let mut archive = archive();
        for raw in 0..10 {
            let e = Entity::from_raw(raw);
            archive.attach::<Position>(e);
            archive.attach::<Velocity>(e);
        }
        // {}, {P}, {P, V}
        assert_eq!(archive.archetype_count(), 3);
        assert_eq!(archive.entity_count(), 10);
        // the {P} chunk emptied out but is only freed on shrink
        assert_eq!(archive.stats().chunks, 2);
        assert_eq!(archive.shrink_to_fit(false), 1);
        assert_eq!(archive.stats().chunks, 1);
    }

    #[test]
    fn test_unregistered_attach_is_error() {
        let mut archive = archive();
        let id = ComponentId::from_tag("Missing");
        let err = archive
            .try_attach_id(Entity::from_raw(1), id, true)
            .unwrap_err();
        assert!(matches!(err, ArchiveError::Registry(_)));
        assert!(!archive.is_tracked(Entity::from_raw(1)));
    }

    #[test]
    fn test_invalid_entity_is_error() {
        let mut archive = archive();
        let (pos, _) = ids(&archive);
        assert_eq!(
            archive.try_attach_id(Entity::INVALID, pos, true),
            Err(ArchiveError::InvalidEntity)
        );
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "failed")]
    fn test_unregistered_typed_attach_asserts() {
        let mut archive = archive();
        archive.attach::<u64>(Entity::from_raw(1));
    }

    #[test]
    fn test_defragment_packs_and_preserves() {
        let mut archive = archive();
        let entities: Vec<_> = (0..130).map(Entity::from_raw).collect();
        for (i, e) in entities.iter().enumerate() {
            archive.attach_with(*e, Big([i as u64; 32]));
        }
        assert_eq!(archive.stats().chunks, 3);

        for e in &entities[..100] {
            archive.destroy(*e);
        }
        assert_eq!(archive.defragment(), 30);
        assert_eq!(archive.defragment(), 0);

        for (i, e) in entities.iter().enumerate().skip(100) {
            assert_eq!(archive.get::<Big>(*e), Some(&Big([i as u64; 32])));
        }
        assert_eq!(archive.shrink_to_fit(false), 2);
        assert_eq!(archive.stats().chunks, 1);
    }

    #[test]
    fn test_compact_uses_config() {
        let mut registry = ComponentRegistry::new();
        registry.register::<Big>("Big").unwrap();
        let config = ArchiveConfig {
            defragment_before_shrink: false,
            ..ArchiveConfig::default()
        };
        let mut archive = ComponentArchive::with_config(Arc::new(registry), config);

        let entities: Vec<_> = (0..65).map(Entity::from_raw).collect();
        for e in &entities {
            archive.attach::<Big>(*e);
        }
        archive.destroy(entities[0]);
        // entity 64 alone in chunk 1 stays put without defragmentation
        assert_eq!(archive.compact(), 0);
        assert_eq!(archive.shrink_to_fit(true), 1);
    }

    #[test]
    fn test_stats_count_reserved_chunks() {
        let mut archive = archive();
        for raw in 0..65 {
            archive.attach::<Big>(Entity::from_raw(raw));
        }
        archive.attach::<Position>(Entity::from_raw(100));

        let stats = archive.stats();
        assert_eq!(stats.chunks, 3);
        assert_eq!(stats.reserved_bytes, 3 * CHUNK_SIZE);
        assert_eq!(stats.used_slots, 66);
    }

    #[test]
    fn test_clear_forgets_everything() {
        let mut archive = archive();
        let e = Entity::from_raw(1);
        archive.attach::<Position>(e);
        archive.clear();

        assert!(!archive.is_tracked(e));
        assert_eq!(archive.stats().chunks, 0);
        assert!(archive.attach::<Position>(e));
    }

    #[test]
    fn test_address_matches_get() {
        let mut archive = archive();
        let (pos, _) = ids(&archive);
        let e = Entity::from_raw(1);
        archive.attach::<Position>(e);

        let address = archive.address_of(e, pos).unwrap();
        let reference = archive.get::<Position>(e).unwrap();
        assert_eq!(address.as_ptr() as *const Position, reference as *const Position);
        assert_eq!(address.as_ptr() as usize % 64, 0);
    }
}
