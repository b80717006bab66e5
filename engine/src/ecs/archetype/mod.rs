//! Archetypes and the graph connecting them.
//!
//! An [`Archetype`] is one unique, sorted set of components. It fixes the row layout used by its
//! [`ChunkedStorage`]: components are packed in ascending id order, each at an offset aligned to
//! the component's alignment, and the row is padded to the largest alignment in it.
//!
//! ```text
//!  components: [Position(8, align 4), Health(4, align 4), Velocity(8, align 4)]
//!  offsets:    [0,                    8,                  12]
//!  row_size:   20
//! ```
//!
//! Archetypes are created lazily by the [`Graph`] and never destroyed. Each keeps an edge per
//! component it has been transitioned across, so that adding or removing that component again
//! resolves the neighbor without hashing a component set.

use std::{collections::HashMap, fmt};

mod graph;

pub use graph::{Graph, Listener};

use crate::ecs::{
    component::{self, Registry},
    error::Result,
    storage::ChunkedStorage,
};

/// A unique identifier for an Archetype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(u32);

impl Id {
    /// Create a new Id with the given unique identifier.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Id(id)
    }

    /// Get the unique identifier of the Id.
    #[inline]
    pub fn id(&self) -> u32 {
        self.0
    }

    /// Get the index of the Id as a usize to be used in collections.
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "archetype#{}", self.0)
    }
}

/// Which way a transition crosses a component edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Gain the component.
    Add,
    /// Lose the component.
    Remove,
}

impl Direction {
    /// The opposite direction.
    #[inline]
    pub fn reverse(&self) -> Self {
        match self {
            Direction::Add => Direction::Remove,
            Direction::Remove => Direction::Add,
        }
    }
}

/// Cached neighbors of an archetype across one component.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    /// The archetype reached by adding the component.
    pub add: Option<Id>,
    /// The archetype reached by removing the component.
    pub remove: Option<Id>,
}

impl Edge {
    /// The cached target in the given direction.
    #[inline]
    pub fn get(&self, direction: Direction) -> Option<Id> {
        match direction {
            Direction::Add => self.add,
            Direction::Remove => self.remove,
        }
    }

    #[inline]
    fn set(&mut self, direction: Direction, target: Id) {
        match direction {
            Direction::Add => self.add = Some(target),
            Direction::Remove => self.remove = Some(target),
        }
    }
}

/// A unique component combination and the storage of every entity that has exactly it.
#[derive(Debug)]
pub struct Archetype {
    /// The archetype's unique identifier.
    id: Id,

    /// The components that make up this archetype, ascending.
    components: component::Spec,

    /// Byte offset of each component within a row, parallel to `components`.
    offsets: Vec<usize>,

    /// Byte size of each component, parallel to `components`.
    sizes: Vec<usize>,

    /// Bytes per row.
    row_size: usize,

    /// Transition cache keyed by masked component id.
    edges: HashMap<component::Id, Edge>,

    /// Rows of this archetype's entities.
    storage: ChunkedStorage,
}

impl Archetype {
    /// Create an archetype for `components`, computing its row layout from the registry.
    pub fn new(
        id: Id,
        components: component::Spec,
        registry: &Registry,
        chunk_size: usize,
    ) -> Result<Self> {
        let mut offsets = Vec::with_capacity(components.len());
        let mut sizes = Vec::with_capacity(components.len());
        let mut offset = 0;
        let mut max_align = 1;
        for component in components.iter() {
            let info = registry.info(component)?;
            offset = align_up(offset, info.align());
            offsets.push(offset);
            sizes.push(info.size());
            offset += info.size();
            max_align = max_align.max(info.align());
        }
        let mut row_size = align_up(offset, max_align);
        if row_size == 0 {
            // Rows of tags still need a properly aligned address.
            row_size = max_align;
        }

        Ok(Self {
            id,
            components,
            offsets,
            sizes,
            row_size,
            edges: HashMap::new(),
            storage: ChunkedStorage::new(row_size, chunk_size),
        })
    }

    /// Get the Id of this archetype.
    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    /// Get the component specification of this archetype.
    #[inline]
    pub fn components(&self) -> &component::Spec {
        &self.components
    }

    /// Byte offsets of each component, parallel to [`Archetype::components`].
    #[inline]
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Bytes per row.
    #[inline]
    pub fn row_size(&self) -> usize {
        self.row_size
    }

    /// Column index of a component.
    #[inline]
    pub fn column_of(&self, component: component::Id) -> Option<usize> {
        self.components.position(component)
    }

    /// Offset and size of a component within a row.
    #[inline]
    pub fn column(&self, component: component::Id) -> Option<(usize, usize)> {
        self.column_of(component)
            .map(|column| (self.offsets[column], self.sizes[column]))
    }

    /// Determine if this archetype has the component.
    #[inline]
    pub fn has_component(&self, component: component::Id) -> bool {
        self.components.contains(component)
    }

    /// Determines whether this archetype supports the provided component specification.
    #[inline]
    pub fn supports(&self, spec: &component::Spec) -> bool {
        self.components.is_superset_of(spec)
    }

    /// The cached edge across a component.
    #[inline]
    pub fn edge(&self, component: component::Id) -> Option<&Edge> {
        self.edges.get(&component.masked())
    }

    /// Number of cached edges.
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// The entity rows.
    #[inline]
    pub fn storage(&self) -> &ChunkedStorage {
        &self.storage
    }

    /// The entity rows, mutably.
    #[inline]
    pub fn storage_mut(&mut self) -> &mut ChunkedStorage {
        &mut self.storage
    }

    /// Number of entities in this archetype.
    #[inline]
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Returns true if no entity currently has this archetype.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    #[inline]
    fn cache_edge(&mut self, component: component::Id, direction: Direction, target: Id) {
        self.edges
            .entry(component.masked())
            .or_default()
            .set(direction, target);
    }
}

#[inline]
fn align_up(offset: usize, align: usize) -> usize {
    (offset + align - 1) & !(align - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::component::{Descriptor, Spec};

    #[test]
    fn offsets_are_running_sums() {
        // Given
        let registry = Registry::register_all([
            Descriptor::plain("a", 8, 4),
            Descriptor::plain("b", 4, 4),
            Descriptor::plain("c", 12, 4),
        ])
        .unwrap();
        let ids: Vec<_> = registry.iter().map(|i| i.id()).collect();

        // When
        let archetype = Archetype::new(Id::new(0), Spec::new(ids.clone()), &registry, 4096).unwrap();

        // Then
        assert_eq!(archetype.offsets(), &[0, 8, 12]);
        assert_eq!(archetype.row_size(), 24);
        assert_eq!(archetype.storage().row_size(), 24);
        assert_eq!(archetype.column(ids[2]), Some((12, 12)));
    }

    #[test]
    fn offsets_respect_alignment() {
        // Given
        let registry = Registry::register_all([
            Descriptor::plain("flag", 1, 1),
            Descriptor::plain("wide", 8, 8),
        ])
        .unwrap();
        let ids: Vec<_> = registry.iter().map(|i| i.id()).collect();

        // When
        let archetype = Archetype::new(Id::new(0), Spec::new(ids), &registry, 4096).unwrap();

        // Then
        assert_eq!(archetype.offsets(), &[0, 8]);
        assert_eq!(archetype.row_size(), 16);
    }

    #[test]
    fn tag_rows_are_never_empty() {
        // Given
        let registry = Registry::register_all([Descriptor::plain("tag", 0, 1)]).unwrap();
        let ids: Vec<_> = registry.iter().map(|i| i.id()).collect();

        // When
        let tags = Archetype::new(Id::new(0), Spec::new(ids), &registry, 4096).unwrap();
        let empty = Archetype::new(Id::new(1), Spec::EMPTY, &registry, 4096).unwrap();

        // Then
        assert_eq!(tags.offsets(), &[0]);
        assert_eq!(tags.row_size(), 1);
        assert_eq!(empty.row_size(), 1);
        assert!(empty.components().is_empty());
    }

    #[test]
    fn unknown_component_fails() {
        // Given
        let registry = Registry::default();

        // When
        let result = Archetype::new(
            Id::new(0),
            Spec::new(vec![component::Id::new(3, 0)]),
            &registry,
            4096,
        );

        // Then
        assert!(result.is_err());
    }

    #[test]
    fn direction_reverse() {
        assert_eq!(Direction::Add.reverse(), Direction::Remove);
        assert_eq!(Direction::Remove.reverse(), Direction::Add);
    }
}
