//! Pre-populated stores for benchmarks.

use rand::{SeedableRng, seq::SliceRandom};
use rand_chacha::ChaCha8Rng;
use strata::ecs::{Config, Entities, Entity, component};

use crate::components::{Ids, registry};

/// Fixed seed so runs are comparable.
pub const SEED: u64 = 0x5EED;

/// A fresh store over the benchmark registry.
pub fn store(config: Config) -> (Entities, Ids) {
    let (registry, ids) = registry();
    (Entities::new(registry, config), ids)
}

/// A store holding `count` entities, each created with the components `pick` selects.
pub fn populated(
    count: usize,
    pick: impl Fn(&Ids) -> Vec<component::Id>,
) -> (Entities, Ids, Vec<Entity>) {
    let (mut entities, ids) = store(Config::default());
    let components = pick(&ids);
    let created = (0..count)
        .map(|_| create(&mut entities, &components))
        .collect();
    (entities, ids, created)
}

/// Create one entity, panicking on an unregistered component.
pub fn create(entities: &mut Entities, components: &[component::Id]) -> Entity {
    match entities.create_entity(components) {
        Ok(entity) => entity,
        Err(err) => panic!("benchmark entity rejected: {err}"),
    }
}

/// `entities` in a seeded random order.
pub fn shuffled(mut entities: Vec<Entity>) -> Vec<Entity> {
    let mut rng = ChaCha8Rng::seed_from_u64(SEED);
    entities.shuffle(&mut rng);
    entities
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn populated_store_has_every_entity() {
        let (entities, ids, created) = populated(100, |ids| vec![ids.position, ids.velocity]);
        assert_eq!(entities.entity_count(), 100);
        assert!(created.iter().all(|e| entities.has_component(*e, ids.velocity)));
    }

    #[test]
    fn shuffle_is_deterministic() {
        let (_, _, created) = populated(64, |ids| vec![ids.position]);
        assert_eq!(shuffled(created.clone()), shuffled(created.clone()));
        assert_ne!(shuffled(created.clone()), created);
    }
}
