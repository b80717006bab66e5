//! Entity handles and their allocation.
//!
//! An [`Entity`] is a plain `{index, generation}` pair. The index names a slot; the generation
//! counts how many times that slot has been handed out before. Deleting an entity bumps the
//! generation of its slot before the index is recycled, so every handle to the deleted entity
//! stops comparing equal to whatever occupies the slot next:
//!
//! ```rust,ignore
//! let entity = allocator.create_id();   // Entity { index: 0, generation: 0 }
//! allocator.add_deleted_id(entity);
//! let reused = allocator.create_id();   // Entity { index: 0, generation: 1 }
//! assert_ne!(entity, reused);
//! ```
//!
//! The same allocator also issues component ids (see [`crate::ecs::component::Id`]).

use std::fmt;

/// The generation of an entity slot. Starts at `FIRST` and is bumped every time the slot is
/// recycled. Wrapping is accepted: after 65536 reuses of one slot a very old handle could
/// compare equal again.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u16);

impl Generation {
    /// The first generation of a slot.
    pub const FIRST: Self = Self(0);

    /// Construct a generation from a raw value.
    #[inline]
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Get the next generation from the current.
    #[inline]
    pub fn next(&self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    /// The raw generation value.
    #[inline]
    pub fn value(&self) -> u16 {
        self.0
    }
}

/// A generational entity handle.
///
/// Two handles are equal only if both the index and the generation match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Entity {
    /// The slot index of the entity.
    index: u32,

    /// The generation of the slot when this handle was issued.
    generation: Generation,
}

impl Entity {
    /// Construct an entity handle from its parts.
    #[inline]
    pub const fn new(index: u32, generation: Generation) -> Self {
        Self { index, generation }
    }

    /// The raw slot index.
    #[inline]
    pub fn raw_index(&self) -> u32 {
        self.index
    }

    /// Get the index of this entity if it were to live in indexable storage (e.g. Vec)
    #[inline]
    pub fn index(&self) -> usize {
        self.index as usize
    }

    /// Get the generation of this entity.
    #[inline]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Get a new entity with the same index but the next generation.
    #[inline]
    pub fn genned(&self) -> Self {
        Self::new(self.index, self.generation.next())
    }
}

/// Ordered by index first, then generation.
impl PartialOrd for Entity {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entity {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match self.index.cmp(&other.index) {
            std::cmp::Ordering::Equal => self.generation.cmp(&other.generation),
            ord => ord,
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation.0)
    }
}

/// Issues entity handles and recycles deleted ones.
///
/// Recycled handles are kept on a LIFO stack with their generation already bumped, so
/// `create_id` is a pop or an increment and nothing else.
#[derive(Default, Debug)]
pub struct Allocator {
    /// Handles of deleted entities, generation already incremented.
    recycled: Vec<Entity>,

    /// Next never-used index.
    next_index: u32,
}

impl Allocator {
    /// Construct a new allocator starting from index 0.
    #[inline]
    pub const fn new() -> Self {
        Self {
            recycled: Vec::new(),
            next_index: 0,
        }
    }

    /// Hand out an entity handle, preferring the most recently recycled one.
    pub fn create_id(&mut self) -> Entity {
        if let Some(entity) = self.recycled.pop() {
            return entity;
        }
        let entity = Entity::new(self.next_index, Generation::FIRST);
        self.next_index += 1;
        entity
    }

    /// Return a deleted handle's index for reuse under the next generation.
    #[inline]
    pub fn add_deleted_id(&mut self, entity: Entity) {
        self.recycled.push(entity.genned());
    }

    /// Number of handles waiting to be recycled.
    #[inline]
    pub fn recyclable(&self) -> usize {
        self.recycled.len()
    }

    /// The index a fresh (non-recycled) handle would get.
    #[inline]
    pub fn next_index(&self) -> u32 {
        self.next_index
    }
}

#[test]
fn allocator_uniqueness() {
    // Given
    let mut allocator = Allocator::default();

    // When
    let mut entities = Vec::new();
    for _ in 0..200 {
        entities.push(allocator.create_id());
    }

    // Then - No dupes generated
    let pre_len = entities.len();
    entities.sort();
    entities.dedup();
    assert_eq!(pre_len, entities.len());
}

#[test]
fn allocator_reuse() {
    // Given
    let mut allocator = Allocator::default();

    // When
    let mut entities = Vec::new();
    for _ in 0..10 {
        entities.push(allocator.create_id());
    }

    for e in entities.drain(..) {
        allocator.add_deleted_id(e);
    }

    let mut reused_entities = Vec::new();
    for _ in 0..10 {
        reused_entities.push(allocator.create_id());
    }

    // Then - Entities should be reused with incremented generation
    reused_entities.sort();
    for (i, e) in reused_entities.iter().enumerate() {
        assert_eq!(e.index, i as u32);
        assert_eq!(e.generation.0, 1);
    }
}

#[test]
fn allocator_recycles_most_recent_first() {
    // Given
    let mut allocator = Allocator::new();
    let e0 = allocator.create_id();
    let e1 = allocator.create_id();

    // When
    allocator.add_deleted_id(e0);
    allocator.add_deleted_id(e1);

    // Then - stack order
    assert_eq!(allocator.create_id(), e1.genned());
    assert_eq!(allocator.create_id(), e0.genned());
    assert_eq!(allocator.create_id(), Entity::new(2, Generation::FIRST));
}

#[test]
fn allocator_free_and_reuse_cycle() {
    // Given
    let mut allocator = Allocator::default();

    // When - Allocate 5 entities
    let mut entities = Vec::new();
    for _ in 0..5 {
        entities.push(allocator.create_id());
    }

    // Then - Nothing to recycle
    assert_eq!(allocator.recyclable(), 0);

    // When - Free all entities
    for e in entities.drain(..) {
        allocator.add_deleted_id(e);
    }

    // Then
    assert_eq!(allocator.recyclable(), 5);

    // When - Allocate 6 (more than recycled)
    let mut new_entities = Vec::new();
    for _ in 0..6 {
        new_entities.push(allocator.create_id());
    }

    // Then - 5 reused (gen 1) + 1 new (gen 0)
    assert_eq!(allocator.recyclable(), 0);
    let new_count = new_entities.iter().filter(|e| e.generation.0 == 0).count();
    let reused_count = new_entities.iter().filter(|e| e.generation.0 == 1).count();
    assert_eq!(new_count, 1);
    assert_eq!(reused_count, 5);
    assert_eq!(allocator.next_index(), 6);
}

#[test]
fn allocator_multiple_generations() {
    // Given
    let mut allocator = Allocator::default();
    let entity = allocator.create_id();
    let original_index = entity.index;

    // When - Free and reallocate multiple times
    allocator.add_deleted_id(entity);
    let gen1 = allocator.create_id();

    allocator.add_deleted_id(gen1);
    let gen2 = allocator.create_id();

    allocator.add_deleted_id(gen2);
    let gen3 = allocator.create_id();

    // Then - Same index, incrementing generations
    assert_eq!(gen1.index, original_index);
    assert_eq!(gen1.generation.0, 1);
    assert_eq!(gen2.generation.0, 2);
    assert_eq!(gen3.generation.0, 3);
    assert_ne!(entity, gen1);
    assert_ne!(gen1, gen3);
}

#[test]
fn generation_wraps() {
    // Given
    let last = Generation::new(u16::MAX);

    // Then
    assert_eq!(last.next(), Generation::FIRST);
}

#[test]
fn entity_ordering() {
    // Given
    let e1 = Entity::new(1, Generation::FIRST);
    let e2 = Entity::new(2, Generation::FIRST);
    let e1_gen1 = e1.genned();

    // Then - Ordered by index first, then generation
    assert!(e1 < e2);
    assert!(e1 < e1_gen1);
    assert!(e1_gen1 < e2);
}

#[test]
fn entity_equality() {
    // Given
    let e1 = Entity::new(42, Generation::FIRST);
    let e2 = Entity::new(42, Generation::FIRST);
    let e3 = Entity::new(43, Generation::FIRST);
    let e1_gen1 = e1.genned();

    // Then
    assert_eq!(e1, e2);
    assert_ne!(e1, e3);
    assert_ne!(e1, e1_gen1); // Different generation
}

#[test]
fn entity_display() {
    assert_eq!(Entity::new(7, Generation::new(3)).to_string(), "7v3");
}
