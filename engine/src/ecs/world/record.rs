use crate::ecs::{archetype, entity::Entity};

/// Where a live entity's row is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record {
    /// The entity handle.
    pub id: Entity,
    /// The archetype holding the entity.
    pub archetype: archetype::Id,
    /// The entity's row in that archetype's storage.
    pub row: usize,
    /// The record's own slot in the dense record list.
    pub registry_index: usize,
}

/// Dense list of records with a sparse index from entity index to slot.
#[derive(Debug, Default)]
pub(crate) struct Records {
    dense: Vec<Record>,
    sparse: Vec<Option<usize>>,
}

impl Records {
    /// The slot of a live entity. Stale handles resolve to `None`.
    #[inline]
    pub fn slot(&self, entity: Entity) -> Option<usize> {
        let slot = (*self.sparse.get(entity.index())?)?;
        (self.dense[slot].id == entity).then_some(slot)
    }

    #[inline]
    pub fn get(&self, entity: Entity) -> Option<&Record> {
        self.slot(entity).map(|slot| &self.dense[slot])
    }

    #[inline]
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut Record> {
        let slot = self.slot(entity)?;
        Some(&mut self.dense[slot])
    }

    pub fn insert(&mut self, entity: Entity, archetype: archetype::Id, row: usize) {
        let slot = self.dense.len();
        self.dense.push(Record {
            id: entity,
            archetype,
            row,
            registry_index: slot,
        });
        if entity.index() >= self.sparse.len() {
            self.sparse.resize(entity.index() + 1, None);
        }
        self.sparse[entity.index()] = Some(slot);
    }

    /// Remove a record, keeping the dense list packed.
    pub fn remove(&mut self, entity: Entity) -> Option<Record> {
        let slot = self.slot(entity)?;
        let removed = self.dense.swap_remove(slot);
        self.sparse[entity.index()] = None;
        if let Some(moved) = self.dense.get_mut(slot) {
            moved.registry_index = slot;
            self.sparse[moved.id.index()] = Some(slot);
        }
        Some(removed)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.dense.iter()
    }
}
