//! Property tests: the archive against a plain `HashMap` model.

use std::collections::HashMap;
use std::sync::Arc;

use proptest::prelude::*;
use strata_core::memory::ChunkList;
use strata_core::{
    filter, Archetype, ComponentArchive, ComponentId, ComponentRegistry, Entity, CHUNK_SIZE,
    COLUMN_ALIGN,
};

type Small = u32;
type Medium = [u64; 4];
type Large = [u64; 32];

const KINDS: usize = 3;

#[derive(Clone, Copy, Debug)]
enum Op {
    Attach { entity: u64, kind: usize, value: u32 },
    Detach { entity: u64, kind: usize },
    Destroy { entity: u64 },
}

fn op(max_entity: u64) -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..max_entity, 0..KINDS, any::<u32>())
            .prop_map(|(entity, kind, value)| Op::Attach { entity, kind, value }),
        2 => (0..max_entity, 0..KINDS).prop_map(|(entity, kind)| Op::Detach { entity, kind }),
        1 => (0..max_entity).prop_map(|entity| Op::Destroy { entity }),
    ]
}

struct Harness {
    archive: ComponentArchive,
    ids: [ComponentId; KINDS],
    model: HashMap<u64, [Option<u32>; KINDS]>,
}

impl Harness {
    fn new() -> Self {
        let mut registry = ComponentRegistry::new();
        let ids = [
            registry.register::<Small>("Small").unwrap(),
            registry.register::<Medium>("Medium").unwrap(),
            registry.register::<Large>("Large").unwrap(),
        ];
        Self {
            archive: ComponentArchive::new(Arc::new(registry)),
            ids,
            model: HashMap::new(),
        }
    }

    fn attach(&mut self, entity: Entity, kind: usize, value: u32) -> bool {
        match kind {
            0 => self.archive.attach_with::<Small>(entity, value),
            1 => self.archive.attach_with::<Medium>(entity, [u64::from(value); 4]),
            _ => self.archive.attach_with::<Large>(entity, [u64::from(value); 32]),
        }
    }

    fn read(&self, entity: Entity, kind: usize) -> Option<u32> {
        match kind {
            0 => self.archive.get::<Small>(entity).copied(),
            1 => self.archive.get::<Medium>(entity).map(|v| v[3] as u32),
            _ => self.archive.get::<Large>(entity).map(|v| v[31] as u32),
        }
    }

    fn apply(&mut self, op: Op) {
        match op {
            Op::Attach { entity, kind, value } => {
                let slot = self.model.entry(entity).or_default();
                let expected = slot[kind].is_none();
                if expected {
                    slot[kind] = Some(value);
                }
                assert_eq!(self.attach(Entity::from_raw(entity), kind, value), expected);
            }
            Op::Detach { entity, kind } => {
                let removed = self
                    .model
                    .get_mut(&entity)
                    .is_some_and(|slot| slot[kind].take().is_some());
                if self.model.get(&entity).is_some_and(|slot| slot.iter().all(Option::is_none)) {
                    self.model.remove(&entity);
                }
                assert_eq!(
                    self.archive.detach_id(Entity::from_raw(entity), self.ids[kind]),
                    removed
                );
            }
            Op::Destroy { entity } => {
                let tracked = self
                    .model
                    .remove(&entity)
                    .is_some_and(|slot| slot.iter().any(Option::is_some));
                assert_eq!(self.archive.destroy(Entity::from_raw(entity)), tracked);
            }
        }
    }

    fn check(&self, max_entity: u64) -> Result<(), TestCaseError> {
        for raw in 0..max_entity {
            let entity = Entity::from_raw(raw);
            let slots = self.model.get(&raw).copied().unwrap_or_default();

            let expected: Archetype = (0..KINDS)
                .filter(|kind| slots[*kind].is_some())
                .map(|kind| self.ids[kind])
                .collect();
            prop_assert_eq!(self.archive.query_archetype(entity), &expected);
            prop_assert_eq!(self.archive.is_tracked(entity), !expected.is_empty());

            for kind in 0..KINDS {
                prop_assert_eq!(self.read(entity, kind), slots[kind]);
            }
        }
        prop_assert_eq!(self.archive.entity_count(), self.model.len());
        Ok(())
    }
}

proptest! {
    #[test]
    fn archive_matches_model(ops in prop::collection::vec(op(64), 1..300)) {
        let mut harness = Harness::new();
        for op in ops {
            harness.apply(op);
        }
        harness.check(64)?;
    }

    #[test]
    fn defragment_and_shrink_preserve_values(
        ops in prop::collection::vec(op(200), 1..600),
    ) {
        let mut harness = Harness::new();
        for op in ops {
            harness.apply(op);
        }
        let stats = harness.archive.stats();

        harness.archive.defragment();
        harness.check(200)?;
        prop_assert_eq!(harness.archive.defragment(), 0);

        harness.archive.shrink_to_fit(false);
        harness.check(200)?;
        prop_assert!(harness.archive.stats().chunks <= stats.chunks);
    }

    #[test]
    fn attach_twice_keeps_first_value(first in any::<u32>(), second in any::<u32>()) {
        let mut harness = Harness::new();
        let e = Entity::from_raw(1);
        prop_assert!(harness.attach(e, 1, first));
        prop_assert!(!harness.attach(e, 1, second));
        prop_assert_eq!(harness.read(e, 1), Some(first));
    }

    #[test]
    fn destroy_is_terminal(kinds in prop::collection::vec(0..KINDS, 1..6)) {
        let mut harness = Harness::new();
        let e = Entity::from_raw(9);
        for kind in kinds {
            harness.attach(e, kind, 1);
        }
        prop_assert!(harness.archive.destroy(e));
        for id in harness.ids {
            prop_assert!(!harness.archive.contains_id(e, id));
        }
        prop_assert!(harness.archive.query_archetype(e).is_empty());
        prop_assert!(!harness.archive.destroy(e));
    }

    #[test]
    fn filters_match_naive_reference(
        ops in prop::collection::vec(op(32), 1..120),
        mask in 1usize..(1 << KINDS),
    ) {
        let mut harness = Harness::new();
        for op in ops {
            harness.apply(op);
        }
        let set: Archetype = (0..KINDS)
            .filter(|kind| mask & (1 << kind) != 0)
            .map(|kind| harness.ids[kind])
            .collect();
        let entities: Vec<_> = (0..32).map(Entity::from_raw).collect();

        let has = |raw: u64, kind: usize| {
            harness.model.get(&raw).is_some_and(|slot| slot[kind].is_some())
        };
        let in_set = |kind: usize| mask & (1 << kind) != 0;
        let naive = |keep: &dyn Fn(u64) -> bool| -> Vec<Entity> {
            (0..32).filter(|raw| keep(*raw)).map(Entity::from_raw).collect()
        };

        prop_assert_eq!(
            filter::all(&harness.archive, &entities, &set),
            naive(&|raw: u64| (0..KINDS).filter(|k| in_set(*k)).all(|k| has(raw, k)))
        );
        prop_assert_eq!(
            filter::any(&harness.archive, &entities, &set),
            naive(&|raw: u64| (0..KINDS).filter(|k| in_set(*k)).any(|k| has(raw, k)))
        );
        prop_assert_eq!(
            filter::none(&harness.archive, &entities, &set),
            naive(&|raw: u64| !(0..KINDS).filter(|k| in_set(*k)).any(|k| has(raw, k)))
        );
    }

    #[test]
    fn chunk_capacity_bound(size in 1usize..=CHUNK_SIZE) {
        let capacity = ChunkList::capacity_for(&[size]);
        prop_assert!(capacity >= 1);
        prop_assert!(capacity * size <= CHUNK_SIZE);
    }

    #[test]
    fn multi_column_layout_fits(sizes in prop::collection::vec(1usize..512, 1..8)) {
        let capacity = ChunkList::capacity_for(&sizes);
        prop_assume!(capacity > 0);

        let mut end: usize = 0;
        for size in &sizes {
            let offset = end.div_ceil(COLUMN_ALIGN) * COLUMN_ALIGN;
            end = offset + size * capacity;
        }
        prop_assert!(end <= CHUNK_SIZE);
    }
}
