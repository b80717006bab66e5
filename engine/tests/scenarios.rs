use std::collections::{BTreeSet, HashMap};

use rand::{Rng, SeedableRng, seq::SliceRandom};
use rand_chacha::ChaCha8Rng;
use strata::ecs::{
    Config, Entities, Entity,
    archetype,
    component::{Descriptor, Id, Registry, RegistryBuilder, Spec},
};
use strata_macros::Component;

#[derive(Component, Debug, Default, Clone, Copy, PartialEq)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Component, Debug, Default, Clone, Copy, PartialEq)]
struct Velocity {
    dx: f32,
    dy: f32,
}

#[derive(Component, Debug, Default, Clone, Copy, PartialEq)]
struct Health(u32);

#[derive(Component, Debug, Default, Clone, Copy, PartialEq)]
struct Target;

#[derive(Component, Debug, Default, Clone, PartialEq)]
struct Name(String);

struct World {
    entities: Entities,
    position: Id,
    velocity: Id,
    health: Id,
    target: Id,
    name: Id,
}

fn world() -> World {
    world_with(Config::default())
}

fn world_with(config: Config) -> World {
    let mut builder = RegistryBuilder::new();
    let position = builder.register::<Position>();
    let velocity = builder.register::<Velocity>();
    let health = builder.register::<Health>();
    let target = builder.register::<Target>();
    let name = builder.register::<Name>();
    World {
        entities: Entities::new(builder.build().unwrap(), config),
        position,
        velocity,
        health,
        target,
        name,
    }
}

/// Every archetype's row count equals the number of records pointing at it, and every record
/// names the entity stored in its row.
fn assert_dense(entities: &Entities) {
    let mut per_archetype: HashMap<archetype::Id, usize> = HashMap::new();
    for entity in entities.iter_entities() {
        let record = entities.record(entity).unwrap();
        assert_eq!(record.id, entity);
        let archetype = &entities.archetypes()[record.archetype];
        assert!(record.row < archetype.len(), "{entity} row {} past end", record.row);
        assert_eq!(archetype.storage().entity_at(record.row), Some(entity));
        *per_archetype.entry(record.archetype).or_default() += 1;
    }
    for archetype in entities.archetypes().iter() {
        assert_eq!(
            archetype.len(),
            per_archetype.get(&archetype.id()).copied().unwrap_or(0),
            "{} row count",
            archetype.id()
        );
    }
}

#[test]
fn create_places_entity_in_sorted_archetype() {
    // Given
    let mut w = world();

    // When
    let e = w.entities.create_entity(&[w.velocity, w.position]).unwrap();

    // Then
    let components = w.entities.get_entity_components(e).unwrap();
    assert_eq!(components.ids(), &[w.position, w.velocity]);
    assert!(w.position < w.velocity);
    let record = w.entities.record(e).unwrap();
    assert_eq!(w.entities.archetypes()[record.archetype].storage().len(), 1);
}

#[test]
fn add_component_keeps_existing_values() {
    // Given
    let mut w = world();
    let e = w.entities.create_entity(&[w.position, w.velocity]).unwrap();
    *w.entities.get_mut::<Position>(e, w.position).unwrap().unwrap() = Position { x: 1.0, y: 2.0 };
    *w.entities.get_mut::<Velocity>(e, w.velocity).unwrap().unwrap() = Velocity { dx: 3.0, dy: 4.0 };

    // When
    assert!(w.entities.add_component(e, w.health).unwrap());

    // Then
    assert_eq!(
        w.entities.get_entity_components(e).unwrap(),
        &Spec::new([w.position, w.velocity, w.health])
    );
    assert_eq!(
        w.entities.get::<Position>(e, w.position).unwrap(),
        Some(&Position { x: 1.0, y: 2.0 })
    );
    assert_eq!(
        w.entities.get::<Velocity>(e, w.velocity).unwrap(),
        Some(&Velocity { dx: 3.0, dy: 4.0 })
    );
}

#[test]
fn transitions_reuse_archetypes() {
    // Given
    let mut w = world();
    let e = w.entities.create_entity(&[w.position, w.velocity]).unwrap();
    w.entities.add_component(e, w.health).unwrap();
    let pvh = w.entities.record(e).unwrap().archetype;

    // When
    w.entities.remove_component(e, w.velocity).unwrap();

    // Then
    assert_eq!(
        w.entities.get_entity_components(e).unwrap(),
        &Spec::new([w.position, w.health])
    );

    // When - a fresh entity takes the same path
    let archetypes = w.entities.archetypes().len();
    let hits = w.entities.archetypes().edge_hits();
    let fresh = w.entities.create_entity(&[w.position, w.velocity]).unwrap();
    w.entities.add_component(fresh, w.health).unwrap();

    // Then
    assert_eq!(w.entities.record(fresh).unwrap().archetype, pvh);
    assert_eq!(w.entities.archetypes().len(), archetypes);
    assert_eq!(w.entities.archetypes().edge_hits(), hits + 1);

    // When - re-adding velocity to the first entity walks the cached remove edge backwards
    w.entities.add_component(e, w.velocity).unwrap();

    // Then
    assert_eq!(w.entities.record(e).unwrap().archetype, pvh);
    assert_dense(&w.entities);
}

#[test]
fn independent_adds_resolve_to_same_archetype() {
    // Given
    let mut w = world();
    let e1 = w.entities.create_entity(&[w.position]).unwrap();
    let e2 = w.entities.create_entity(&[w.position]).unwrap();

    // When
    w.entities.add_component(e1, w.target).unwrap();
    w.entities.add_component(e2, w.target).unwrap();

    // Then
    assert_eq!(
        w.entities.record(e1).unwrap().archetype,
        w.entities.record(e2).unwrap().archetype
    );
    assert_eq!(w.entities.archetypes().len(), 2);
}

#[test]
fn deleted_handles_are_invalidated() {
    // Given
    let mut w = world();
    let e = w.entities.create_entity(&[w.position, w.velocity]).unwrap();

    // When
    assert!(w.entities.delete_entity(e));
    let reused = w.entities.create_entity(&[w.position]).unwrap();

    // Then
    assert!(!w.entities.is_entity_alive(e));
    assert!(w.entities.is_entity_alive(reused));
    assert_eq!(reused.index(), e.index());
    assert_eq!(reused.generation(), e.generation().next());
    assert_ne!(reused, e);
    assert!(!w.entities.delete_entity(e));
    assert!(!w.entities.add_component(e, w.health).unwrap());
    assert_eq!(w.entities.get::<Position>(e, w.position).unwrap(), None);
}

#[test]
fn query_picks_up_archetypes_created_later() {
    // Given
    let mut w = world();
    let positioned = w.entities.create_query(&[w.position], &[]).unwrap();
    let first = w.entities.create_entity(&[w.position]).unwrap();

    // When
    let later = w.entities.create_entity(&[w.position, w.health]).unwrap();

    // Then
    let record = w.entities.record(later).unwrap();
    let data = w.entities.queries().get(positioned.id()).unwrap();
    assert!(data.contains(record.archetype));
    let mut seen: Vec<Entity> = w
        .entities
        .query(&positioned)
        .flat_map(|view| view.entities().to_vec())
        .collect();
    seen.sort();
    assert_eq!(seen, vec![first, later]);
}

#[test]
fn singleton_fails_with_two_holders() {
    // Given
    let mut w = world();
    w.entities.create_entity(&[w.target]).unwrap();
    w.entities.create_entity(&[w.target]).unwrap();

    // When
    let single = w.entities.singleton::<Target>(w.target).unwrap();

    // Then
    assert!(single.is_none());
    let query = w.entities.create_query(&[w.target], &[]).unwrap();
    assert_eq!(w.entities.get_singleton_entity(&query), None);
}

#[test]
fn owned_components_survive_transitions() {
    // Given
    let mut w = world();
    let e = w.entities.create_entity(&[w.position]).unwrap();
    w.entities.insert(e, w.name, Name("player".to_string())).unwrap();
    for filler in 0..10 {
        let other = w.entities.create_entity(&[w.position]).unwrap();
        w.entities.insert(other, w.name, Name(format!("npc{filler}"))).unwrap();
    }

    // When
    w.entities.add_component(e, w.velocity).unwrap();
    w.entities.remove_component(e, w.position).unwrap();
    let copy = w.entities.duplicate_entity(e).unwrap();
    w.entities.delete_entity(e);

    // Then
    assert_eq!(
        w.entities.get::<Name>(copy, w.name).unwrap(),
        Some(&Name("player".to_string()))
    );
    assert_dense(&w.entities);
}

#[test]
fn plain_components_round_trip_bytes() {
    // Given
    let registry = Registry::register_all([
        Descriptor::plain("transform", 48, 16),
        Descriptor::plain("flags", 1, 1),
    ])
    .unwrap();
    let transform = registry.find_by_name("transform").unwrap();
    let flags = registry.find_by_name("flags").unwrap();
    let mut entities = Entities::new(registry, Config::default().with_chunk_size(256));
    let e = entities.create_entity(&[flags, transform]).unwrap();
    let bytes: Vec<u8> = (0..48).collect();
    entities.component_bytes_mut(e, transform).unwrap().copy_from_slice(&bytes);

    // When
    entities.remove_component(e, flags).unwrap();
    entities.add_component(e, flags).unwrap();

    // Then
    assert_eq!(entities.component_bytes(e, transform), Some(&bytes[..]));
    assert_eq!(entities.component_bytes(e, flags), Some(&[0u8][..]));
    assert!(entities.get::<u8>(e, flags).is_err());
}

#[test]
fn chunks_are_pooled_and_reused() {
    // Given
    let mut w = world_with(Config::default().with_chunk_size(64));
    let entities: Vec<_> = (0..40)
        .map(|_| w.entities.create_entity(&[w.position, w.velocity]).unwrap())
        .collect();
    let allocated = w.entities.pool().allocated();

    // When
    for e in &entities {
        w.entities.delete_entity(*e);
    }
    for _ in 0..40 {
        w.entities.create_entity(&[w.position, w.velocity]).unwrap();
    }

    // Then
    assert!(allocated > 1);
    assert_eq!(w.entities.pool().allocated(), allocated);
    assert_dense(&w.entities);
}

/// Random interleavings of structural changes keep records, storage and queries consistent.
#[test]
fn random_operations_keep_store_consistent() {
    let mut w = world();
    let mut rng = ChaCha8Rng::seed_from_u64(0x5747_4154);
    let components = [w.position, w.velocity, w.health, w.target, w.name];
    let queries: Vec<_> = [
        (vec![w.position], vec![]),
        (vec![w.position, w.velocity], vec![w.target]),
        (vec![], vec![w.name]),
        (vec![w.health, w.target], vec![]),
    ]
    .into_iter()
    .map(|(with, without)| w.entities.create_query(&with, &without).unwrap())
    .collect();

    let mut model: HashMap<Entity, (BTreeSet<Id>, u32)> = HashMap::new();
    let mut live: Vec<Entity> = Vec::new();

    for step in 0..2_000u32 {
        match rng.gen_range(0..10) {
            0..=2 => {
                let picked: Vec<Id> = components
                    .iter()
                    .copied()
                    .filter(|_| rng.gen_bool(0.4))
                    .collect();
                let e = w.entities.create_entity(&picked).unwrap();
                let mut set: BTreeSet<Id> = picked.into_iter().collect();
                w.entities.insert(e, w.health, Health(step)).unwrap();
                if !set.insert(w.health) {
                    *w.entities.get_mut::<Health>(e, w.health).unwrap().unwrap() = Health(step);
                }
                model.insert(e, (set, step));
                live.push(e);
            }
            3 if !live.is_empty() => {
                let e = live.swap_remove(rng.gen_range(0..live.len()));
                assert!(w.entities.delete_entity(e));
                model.remove(&e);
            }
            4..=6 if !live.is_empty() => {
                let e = *live.choose(&mut rng).unwrap();
                let c = *components.choose(&mut rng).unwrap();
                let (set, value) = model.get_mut(&e).unwrap();
                let added = set.insert(c);
                assert_eq!(w.entities.add_component(e, c).unwrap(), added);
                if added && c == w.health {
                    *value = 0;
                }
            }
            7..=9 if !live.is_empty() => {
                let e = *live.choose(&mut rng).unwrap();
                let c = *components.choose(&mut rng).unwrap();
                let (set, _) = model.get_mut(&e).unwrap();
                assert_eq!(w.entities.remove_component(e, c).unwrap(), set.remove(&c));
            }
            _ => {}
        }

        if step % 100 == 0 {
            assert_dense(&w.entities);
        }
    }

    // Components and values match the model
    assert_eq!(w.entities.entity_count(), model.len());
    for (entity, (set, value)) in &model {
        let spec: Spec = set.iter().copied().collect();
        assert_eq!(w.entities.get_entity_components(*entity), Some(&spec));
        if set.contains(&w.health) {
            assert_eq!(w.entities.get::<Health>(*entity, w.health).unwrap(), Some(&Health(*value)));
        }
    }

    // Every query matches exactly the archetypes satisfying its filter
    for query in &queries {
        let data = w.entities.queries().get(query.id()).unwrap();
        for archetype in w.entities.archetypes().iter() {
            let expected = archetype.components().contains_all(query.with())
                && !archetype.components().contains_any(query.without());
            assert_eq!(data.contains(archetype.id()), expected, "{}", archetype.id());
        }
    }
    assert_dense(&w.entities);
}
