//! The [`Entities`] store: the one place entities are created, changed and destroyed.
//!
//! `Entities` coordinates every other part of the ECS core:
//!
//! ```text
//!  caller ──► Entities ──► archetype::Graph ──(new archetype)──► query::Cache
//!                │                │
//!                │                └──► Archetype ──► ChunkedStorage ──► ChunkPool
//!                │
//!                ├──► entity::Allocator   (handles, recycling)
//!                └──► Records             (handle → archetype + row)
//! ```
//!
//! Every live entity has exactly one row in the storage of the archetype matching its component
//! set. Adding or removing a component moves the row to the neighboring archetype: the shared
//! components are moved bytewise, the new one is initialized (or the removed one destroyed) and
//! the old row is swap-removed, fixing up whichever entity was moved into the hole.
//!
//! # Example
//!
//! ```ignore
//! let mut entities = Entities::new(registry, Config::default());
//!
//! let e = entities.create_entity(&[position, velocity])?;
//! entities.insert(e, health, Health(10))?;
//! assert_eq!(entities.get::<Health>(e, health)?, Some(&Health(10)));
//!
//! entities.delete_entity(e);
//! assert!(!entities.is_entity_alive(e));
//! ```

mod config;
mod record;

pub use config::{Config, InitStrategy};
pub use record::Record;

use std::{
    mem::{self, ManuallyDrop},
    ptr::{self, NonNull},
    sync::Arc,
};

use log::{debug, trace};

use crate::ecs::{
    archetype::{self, Archetype, Direction, Graph},
    component::{self, Info, Registry, Spec},
    entity::{self, Entity},
    error::Result,
    query::{self, EntityView, EntityViewMut, Query},
    storage::{Chunk, ChunkPool},
};
use record::Records;

/// How the bytes of a newly added component are produced.
#[derive(Clone, Copy)]
enum Init {
    Strategy(InitStrategy),
    Move(NonNull<u8>),
}

/// Initialize one component in place.
///
/// # Safety
///
/// `dst` must be valid and aligned for the component; for `Init::Move`, `src` must hold a live
/// value of the component which is consumed.
unsafe fn init_component(info: &Info, dst: NonNull<u8>, init: Init) {
    unsafe {
        match init {
            Init::Strategy(InitStrategy::Zero) if info.is_zeroable() => {
                dst.as_ptr().write_bytes(0, info.size())
            }
            Init::Strategy(_) => info.ops().default_construct(dst),
            Init::Move(src) => info.ops().move_construct(dst, src),
        }
    }
}

/// Run the destructor of every component in a row.
fn destroy_row(archetype: &Archetype, row: usize, registry: &Registry) {
    let base = archetype.storage().row_ptr(row);
    for (column, component) in archetype.components().iter().enumerate() {
        let info = &registry[component];
        unsafe { info.ops().destroy(base.add(archetype.offsets()[column])) };
    }
}

/// A row appended to an archetype whose components are still being constructed.
///
/// Dropping it without [`PendingRow::commit`] swap-removes the row again, so a constructor that
/// panics leaves no orphan row behind. The row is always the last one, so no other entity moves.
/// Values already constructed in the row are leaked.
struct PendingRow<'a> {
    archetype: &'a mut Archetype,
    pool: &'a mut ChunkPool,
    row: usize,

    /// Takes back the handle of an entity that never became live.
    allocator: Option<&'a mut entity::Allocator>,
}

impl<'a> PendingRow<'a> {
    fn push(archetype: &'a mut Archetype, owner: Entity, pool: &'a mut ChunkPool) -> Self {
        let row = archetype.storage_mut().add_row(owner, pool);
        Self {
            archetype,
            pool,
            row,
            allocator: None,
        }
    }

    fn releasing(mut self, allocator: &'a mut entity::Allocator) -> Self {
        self.allocator = Some(allocator);
        self
    }

    #[inline]
    fn base(&self) -> NonNull<u8> {
        self.archetype.storage().row_ptr(self.row)
    }

    /// Keep the row and return its index.
    fn commit(self) -> usize {
        let row = self.row;
        mem::forget(self);
        row
    }
}

impl Drop for PendingRow<'_> {
    fn drop(&mut self) {
        let storage = self.archetype.storage_mut();
        let owner = storage.entity_at(self.row);
        storage.remove_row(self.row, self.pool);
        if let (Some(allocator), Some(owner)) = (self.allocator.as_mut(), owner) {
            allocator.add_deleted_id(owner);
        }
        debug!("rolled back row {} of {}", self.row, self.archetype.id());
    }
}

/// The entity store.
pub struct Entities {
    /// Registered components, shareable between stores.
    registry: Arc<Registry>,

    /// Store tunables.
    config: Config,

    /// Issues entity handles.
    allocator: entity::Allocator,

    /// Every archetype and its storage.
    graph: Graph,

    /// Registered queries.
    queries: query::Cache,

    /// Free chunks shared by all archetype storage.
    pool: ChunkPool,

    /// Handle to location.
    records: Records,

    /// Entities created since the last lifecycle flush.
    created: Vec<Entity>,

    /// Entities deleted since the last lifecycle flush.
    deleted: Vec<Entity>,
}

impl Entities {
    /// Create an empty store over a component registry.
    pub fn new(registry: impl Into<Arc<Registry>>, config: Config) -> Self {
        let config = config.normalized();
        debug!(
            "creating entity store: chunk size {}, pool limit {}",
            config.chunk_size, config.pool_limit
        );
        Self {
            registry: registry.into(),
            allocator: entity::Allocator::new(),
            graph: Graph::new(config.chunk_size),
            queries: query::Cache::new(),
            pool: ChunkPool::new(config.chunk_size, config.pool_limit),
            records: Records::default(),
            created: Vec::new(),
            deleted: Vec::new(),
            config,
        }
    }

    /// The component registry.
    #[inline]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The store configuration.
    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The archetype graph.
    #[inline]
    pub fn archetypes(&self) -> &Graph {
        &self.graph
    }

    /// The query cache.
    #[inline]
    pub fn queries(&self) -> &query::Cache {
        &self.queries
    }

    /// The shared chunk pool.
    #[inline]
    pub fn pool(&self) -> &ChunkPool {
        &self.pool
    }

    /// Create an entity with the given components, initialized with the configured strategy.
    pub fn create_entity(&mut self, components: &[component::Id]) -> Result<Entity> {
        self.create_entity_with(components, self.config.init_strategy)
    }

    /// Create an entity with the given components, initialized with `strategy`. Duplicate ids
    /// are ignored.
    pub fn create_entity_with(
        &mut self,
        components: &[component::Id],
        strategy: InitStrategy,
    ) -> Result<Entity> {
        let spec = Spec::new(components.to_vec());
        for component in spec.iter() {
            self.registry.info(component)?;
        }
        let archetype_id = self
            .graph
            .find_or_create(&spec, &self.registry, &mut self.queries)?;

        let entity = self.allocator.create_id();
        let pending = PendingRow::push(&mut self.graph[archetype_id], entity, &mut self.pool)
            .releasing(&mut self.allocator);
        let base = pending.base();
        for (column, component) in pending.archetype.components().iter().enumerate() {
            let info = &self.registry[component];
            let dst = unsafe { base.add(pending.archetype.offsets()[column]) };
            unsafe { init_component(info, dst, Init::Strategy(strategy)) };
        }
        let row = pending.commit();

        self.records.insert(entity, archetype_id, row);
        if self.config.track_lifecycle {
            self.created.push(entity);
        }
        trace!("created {entity} in {archetype_id} row {row}");
        Ok(entity)
    }

    /// Delete an entity, destroying its components. Returns false for a stale handle.
    pub fn delete_entity(&mut self, entity: Entity) -> bool {
        let Some(record) = self.records.get(entity).copied() else {
            return false;
        };

        let archetype = &mut self.graph[record.archetype];
        destroy_row(archetype, record.row, &self.registry);
        let moved = archetype.storage_mut().remove_row(record.row, &mut self.pool);
        if moved.is_some() {
            self.fix_moved(record.archetype, record.row);
        }

        self.records.remove(entity);
        self.allocator.add_deleted_id(entity);
        if self.config.track_lifecycle {
            self.deleted.push(entity);
        }
        trace!("deleted {entity} from {}", record.archetype);
        true
    }

    /// Returns true if the handle refers to a live entity.
    #[inline]
    pub fn is_entity_alive(&self, entity: Entity) -> bool {
        self.records.slot(entity).is_some()
    }

    /// The location record of a live entity.
    #[inline]
    pub fn record(&self, entity: Entity) -> Option<&Record> {
        self.records.get(entity)
    }

    /// The sorted component set of a live entity.
    #[inline]
    pub fn get_entity_components(&self, entity: Entity) -> Option<&Spec> {
        let record = self.records.get(entity)?;
        Some(self.graph[record.archetype].components())
    }

    /// Returns true if the entity is alive and has the component.
    #[inline]
    pub fn has_component(&self, entity: Entity, component: component::Id) -> bool {
        self.get_entity_components(entity)
            .is_some_and(|spec| spec.contains(component))
    }

    /// Number of live entities.
    #[inline]
    pub fn entity_count(&self) -> usize {
        self.records.len()
    }

    /// Iterate every live entity.
    #[inline]
    pub fn iter_entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.records.iter().map(|r| r.id)
    }

    /// Add a component initialized with the configured strategy. Returns `Ok(false)` if the
    /// entity is not alive or already has the component.
    pub fn add_component(&mut self, entity: Entity, component: component::Id) -> Result<bool> {
        self.add_component_with(entity, component, self.config.init_strategy)
    }

    /// Add a component initialized with `strategy`.
    pub fn add_component_with(
        &mut self,
        entity: Entity,
        component: component::Id,
        strategy: InitStrategy,
    ) -> Result<bool> {
        unsafe { self.add_component_init(entity, component, Init::Strategy(strategy)) }
    }

    /// Add a component by moving its value out of `src`.
    ///
    /// # Safety
    ///
    /// `src` must point to a live, aligned value of the component's registered type. On
    /// `Ok(true)` the value has been moved into the store and must not be used or dropped by
    /// the caller; otherwise it is untouched.
    pub unsafe fn add_component_from(
        &mut self,
        entity: Entity,
        component: component::Id,
        src: NonNull<u8>,
    ) -> Result<bool> {
        unsafe { self.add_component_init(entity, component, Init::Move(src)) }
    }

    /// Add a typed component value. The value is dropped if it cannot be added.
    pub fn insert<T: 'static>(
        &mut self,
        entity: Entity,
        component: component::Id,
        value: T,
    ) -> Result<bool> {
        self.registry.info(component)?.check_type::<T>()?;
        let mut value = ManuallyDrop::new(value);
        let src = NonNull::from(&mut *value).cast::<u8>();
        let result = unsafe { self.add_component_init(entity, component, Init::Move(src)) };
        if !matches!(result, Ok(true)) {
            unsafe { ManuallyDrop::drop(&mut value) };
        }
        result
    }

    /// # Safety
    ///
    /// For `Init::Move`, see [`Entities::add_component_from`].
    unsafe fn add_component_init(
        &mut self,
        entity: Entity,
        component: component::Id,
        init: Init,
    ) -> Result<bool> {
        self.registry.info(component)?;
        let component = component.masked();
        let Some(record) = self.records.get(entity).copied() else {
            return Ok(false);
        };
        if self.graph[record.archetype].has_component(component) {
            return Ok(false);
        }

        let target = self.graph.transition(
            record.archetype,
            component,
            Direction::Add,
            &self.registry,
            &mut self.queries,
        )?;
        self.migrate(record, target, Some((component, init)));
        Ok(true)
    }

    /// Remove a component, destroying its value. Returns `Ok(false)` if the entity is not alive
    /// or does not have the component.
    pub fn remove_component(&mut self, entity: Entity, component: component::Id) -> Result<bool> {
        self.registry.info(component)?;
        let component = component.masked();
        let Some(record) = self.records.get(entity).copied() else {
            return Ok(false);
        };
        if !self.graph[record.archetype].has_component(component) {
            return Ok(false);
        }

        let target = self.graph.transition(
            record.archetype,
            component,
            Direction::Remove,
            &self.registry,
            &mut self.queries,
        )?;
        self.migrate(record, target, None);
        Ok(true)
    }

    /// Move an entity's row to `target`. Components present in both archetypes are moved
    /// bytewise, components only in the source are destroyed, and `added` (if any) is
    /// initialized in the new row.
    ///
    /// The added component is constructed before anything leaves the source row, and removed
    /// components are destroyed only after the record points at the new row. A panicking
    /// constructor or destructor therefore leaves every entity in exactly one row.
    fn migrate(
        &mut self,
        record: Record,
        target: archetype::Id,
        added: Option<(component::Id, Init)>,
    ) {
        let (src, dst) = self.graph.pair_mut(record.archetype, target);
        let pending = PendingRow::push(dst, record.id, &mut self.pool);
        let dst_base = pending.base();

        if let Some((component, init)) = added
            && let Some((offset, _)) = pending.archetype.column(component)
        {
            let info = &self.registry[component];
            unsafe { init_component(info, dst_base.add(offset), init) };
        }

        let src_base = src.storage().row_ptr(record.row);
        let mut removed = Vec::new();
        for (column, component) in src.components().iter().enumerate() {
            let src_ptr = unsafe { src_base.add(src.offsets()[column]) };
            let size = self.registry[component].size();
            let dst_ptr = match pending.archetype.column(component) {
                Some((offset, _)) => unsafe { dst_base.add(offset) },
                None => {
                    let scratch = Chunk::new(size);
                    let ptr = scratch.ptr_at(0);
                    removed.push((component, scratch));
                    ptr
                }
            };
            unsafe { ptr::copy_nonoverlapping(src_ptr.as_ptr(), dst_ptr.as_ptr(), size) };
        }
        let new_row = pending.commit();

        let moved = src.storage_mut().remove_row(record.row, &mut self.pool);
        if moved.is_some() {
            self.fix_moved(record.archetype, record.row);
        }
        if let Some(entry) = self.records.get_mut(record.id) {
            entry.archetype = target;
            entry.row = new_row;
        }
        trace!(
            "moved {} from {} to {target} row {new_row}",
            record.id, record.archetype
        );

        for (component, scratch) in removed {
            unsafe { self.registry[component].ops().destroy(scratch.ptr_at(0)) };
        }
    }

    /// Point the record of whichever entity now occupies `row` back at it.
    fn fix_moved(&mut self, archetype: archetype::Id, row: usize) {
        if let Some(moved) = self.graph[archetype].storage().entity_at(row)
            && let Some(entry) = self.records.get_mut(moved)
        {
            debug_assert_eq!(entry.archetype, archetype);
            entry.row = row;
        }
    }

    /// Create a copy of an entity, cloning every component with its copy constructor.
    pub fn duplicate_entity(&mut self, entity: Entity) -> Option<Entity> {
        let record = self.records.get(entity).copied()?;
        let copy = self.allocator.create_id();
        let pending = PendingRow::push(&mut self.graph[record.archetype], copy, &mut self.pool)
            .releasing(&mut self.allocator);
        let src_base = pending.archetype.storage().row_ptr(record.row);
        let dst_base = pending.base();
        for (column, component) in pending.archetype.components().iter().enumerate() {
            let offset = pending.archetype.offsets()[column];
            let info = &self.registry[component];
            unsafe {
                info.ops()
                    .copy_construct(dst_base.add(offset), src_base.add(offset))
            };
        }
        let row = pending.commit();

        self.records.insert(copy, record.archetype, row);
        if self.config.track_lifecycle {
            self.created.push(copy);
        }
        Some(copy)
    }

    /// Typed read access to one component of a live entity.
    ///
    /// Fails if the id is unknown or `T` is not the registered type; `Ok(None)` if the entity is
    /// not alive or lacks the component.
    pub fn get<T: 'static>(&self, entity: Entity, component: component::Id) -> Result<Option<&T>> {
        self.registry.info(component)?.check_type::<T>()?;
        Ok(self
            .component_ptr(entity, component)
            .map(|ptr| unsafe { ptr.cast::<T>().as_ref() }))
    }

    /// Typed write access to one component of a live entity.
    pub fn get_mut<T: 'static>(
        &mut self,
        entity: Entity,
        component: component::Id,
    ) -> Result<Option<&mut T>> {
        self.registry.info(component)?.check_type::<T>()?;
        Ok(self
            .component_ptr(entity, component)
            .map(|ptr| unsafe { ptr.cast::<T>().as_mut() }))
    }

    /// Raw bytes of one component of a live entity.
    ///
    /// Only zeroable components expose their bytes; typed components return `None` and are read
    /// through [`Entities::get`].
    pub fn component_bytes(&self, entity: Entity, component: component::Id) -> Option<&[u8]> {
        self.registry.info(component).ok()?.check_bytes().ok()?;
        let record = self.records.get(entity)?;
        let archetype = &self.graph[record.archetype];
        let (offset, size) = archetype.column(component)?;
        Some(&archetype.storage().row_bytes(record.row)[offset..offset + size])
    }

    /// Mutable raw bytes of one component of a live, plain (zeroable) component.
    pub fn component_bytes_mut(
        &mut self,
        entity: Entity,
        component: component::Id,
    ) -> Option<&mut [u8]> {
        self.registry.info(component).ok()?.check_bytes().ok()?;
        let record = *self.records.get(entity)?;
        let archetype = &mut self.graph[record.archetype];
        let (offset, size) = archetype.column(component)?;
        Some(&mut archetype.storage_mut().row_bytes_mut(record.row)[offset..offset + size])
    }

    fn component_ptr(&self, entity: Entity, component: component::Id) -> Option<NonNull<u8>> {
        let record = self.records.get(entity)?;
        let archetype = &self.graph[record.archetype];
        let (offset, _) = archetype.column(component)?;
        Some(unsafe { archetype.storage().row_ptr(record.row).add(offset) })
    }

    /// The single entity holding `component`, counted across every archetype.
    fn singleton_location(&self, component: component::Id) -> Option<(&Archetype, usize)> {
        let mut found = None;
        let mut count = 0;
        for (archetype_id, _) in self.queries.archetypes_with(component) {
            let archetype = &self.graph[archetype_id];
            count += archetype.len();
            if count > 1 {
                return None;
            }
            if archetype.len() == 1 {
                found = Some(archetype);
            }
        }
        found.and_then(|archetype| archetype.column(component).map(|(o, _)| (archetype, o)))
    }

    /// The bytes of `component` if exactly one live entity has it.
    ///
    /// Fails with `TypeMismatch` for components that are not zeroable; use
    /// [`Entities::singleton`] for those.
    pub fn get_singleton_component(&self, component: component::Id) -> Result<Option<&[u8]>> {
        let info = self.registry.info(component)?;
        info.check_bytes()?;
        let size = info.size();
        Ok(self
            .singleton_location(component)
            .map(|(archetype, offset)| &archetype.storage().row_bytes(0)[offset..offset + size]))
    }

    /// Typed [`Entities::get_singleton_component`].
    pub fn singleton<T: 'static>(&self, component: component::Id) -> Result<Option<&T>> {
        self.registry.info(component)?.check_type::<T>()?;
        Ok(self.singleton_location(component).map(|(archetype, offset)| unsafe {
            archetype.storage().row_ptr(0).add(offset).cast::<T>().as_ref()
        }))
    }

    /// The entity matched by `query` if the query matches exactly one live entity.
    pub fn get_singleton_entity(&self, query: &Query) -> Option<Entity> {
        let data = self.queries.get(query.id())?;
        let mut found = None;
        let mut count = 0;
        for archetype_id in data.archetypes() {
            let archetype = &self.graph[*archetype_id];
            count += archetype.len();
            if count > 1 {
                return None;
            }
            if archetype.len() == 1 {
                found = archetype.storage().entity_at(0);
            }
        }
        found
    }

    /// Register a query. Registering the same filter twice yields the same query.
    pub fn create_query(
        &mut self,
        with: &[component::Id],
        without: &[component::Id],
    ) -> Result<Query> {
        for component in with.iter().chain(without) {
            self.registry.info(*component)?;
        }
        let with = Spec::new(with.to_vec());
        let without = Spec::new(without.to_vec());
        let id = self
            .queries
            .add_query(with.clone(), without.clone(), &self.graph);
        Ok(Query::new(id, with, without))
    }

    /// One view per matched archetype that currently holds entities.
    pub fn query<'a>(&'a self, query: &Query) -> impl Iterator<Item = EntityView<'a>> + 'a {
        let archetypes = self
            .queries
            .get(query.id())
            .map_or(&[][..], |data| data.archetypes());
        archetypes
            .iter()
            .map(|id| &self.graph[*id])
            .filter(|archetype| !archetype.is_empty())
            .map(|archetype| EntityView::new(archetype, &self.registry))
    }

    /// Call `f` with a mutable view of each matched archetype that holds entities.
    pub fn query_mut(&mut self, query: &Query, mut f: impl FnMut(EntityViewMut<'_>)) {
        let Some(data) = self.queries.get(query.id()) else {
            return;
        };
        for archetype_id in data.archetypes() {
            let archetype = &mut self.graph[*archetype_id];
            if archetype.is_empty() {
                continue;
            }
            f(EntityViewMut::new(archetype, &self.registry));
        }
    }

    /// Entities created since the last flush.
    #[inline]
    pub fn created_entities(&self) -> &[Entity] {
        &self.created
    }

    /// Entities deleted since the last flush.
    #[inline]
    pub fn deleted_entities(&self) -> &[Entity] {
        &self.deleted
    }

    /// Clear the created and deleted entity lists.
    pub fn flush_lifecycle(&mut self) {
        debug!(
            "flushing lifecycle: {} created, {} deleted",
            self.created.len(),
            self.deleted.len()
        );
        self.created.clear();
        self.deleted.clear();
    }

    /// Verify that records and storage agree.
    ///
    /// # Panics
    /// Panics if any record points at a row owned by a different entity, or if row counts and
    /// record counts differ.
    pub fn verify_invariants(&self) {
        for record in self.records.iter() {
            let archetype = &self.graph[record.archetype];
            assert_eq!(
                archetype.storage().entity_at(record.row),
                Some(record.id),
                "record of {} points at the wrong row",
                record.id
            );
        }
        let rows: usize = self.graph.iter().map(|a| a.len()).sum();
        assert_eq!(rows, self.records.len(), "row count doesn't match record count");
    }
}

impl Drop for Entities {
    fn drop(&mut self) {
        for archetype in self.graph.iter_mut() {
            for row in 0..archetype.len() {
                destroy_row(archetype, row, &self.registry);
            }
            archetype.storage_mut().clear(&mut self.pool);
        }
    }
}
