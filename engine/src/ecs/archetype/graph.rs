use std::{
    collections::HashMap,
    ops::{Index, IndexMut},
};

use log::debug;

use crate::ecs::{
    archetype::{Archetype, Direction, Id},
    component::{self, Registry},
    error::{Error, Result},
};

/// Notified whenever the graph creates a new archetype.
pub trait Listener {
    /// Called once per archetype, right after it is created.
    fn on_archetype_created(&mut self, archetype: &Archetype);
}

/// A listener that ignores every notification.
impl Listener for () {
    fn on_archetype_created(&mut self, _archetype: &Archetype) {}
}

/// Owner of every archetype, keyed by id and by component set.
#[derive(Debug)]
pub struct Graph {
    /// The archetypes stored by their unique identifier
    archetypes: Vec<Archetype>,

    /// The archetypes indexed by their component specifications
    by_components: HashMap<component::Spec, Id>,

    /// Chunk size given to each new archetype's storage.
    chunk_size: usize,

    /// Transitions answered from an edge cache.
    edge_hits: usize,
}

impl Graph {
    /// Create an empty graph whose archetypes store rows in chunks of `chunk_size` bytes.
    #[inline]
    pub fn new(chunk_size: usize) -> Self {
        Self {
            archetypes: Vec::new(),
            by_components: HashMap::new(),
            chunk_size,
            edge_hits: 0,
        }
    }

    /// Get the archetype with exactly these components, creating it (and notifying `listener`)
    /// if it does not exist yet.
    pub fn find_or_create(
        &mut self,
        spec: &component::Spec,
        registry: &Registry,
        listener: &mut impl Listener,
    ) -> Result<Id> {
        if let Some(id) = self.by_components.get(spec) {
            return Ok(*id);
        }

        // Add a new archetype with the next valid index.
        let id = Id::new(self.archetypes.len() as u32);
        let archetype = Archetype::new(id, spec.clone(), registry, self.chunk_size)?;
        debug!(
            "created {id} with {} components, row size {}",
            spec.len(),
            archetype.row_size()
        );
        self.by_components.insert(spec.clone(), id);
        self.archetypes.push(archetype);

        listener.on_archetype_created(&self.archetypes[id.index()]);
        Ok(id)
    }

    /// Resolve the archetype reached from `from` by adding or removing `component`.
    ///
    /// A cached edge answers immediately. Otherwise the neighbor's component set is derived,
    /// resolved through [`Graph::find_or_create`], and the edge is cached on both archetypes so
    /// the reverse transition is cached too. Adding a component `from` already has (or removing
    /// one it lacks) resolves to `from` itself and caches nothing.
    pub fn transition(
        &mut self,
        from: Id,
        component: component::Id,
        direction: Direction,
        registry: &Registry,
        listener: &mut impl Listener,
    ) -> Result<Id> {
        registry.info(component)?;
        let component = component.masked();
        let source = self.get(from).ok_or(Error::InvalidArchetype(from))?;

        if let Some(target) = source.edge(component).and_then(|e| e.get(direction)) {
            self.edge_hits += 1;
            return Ok(target);
        }

        let spec = match direction {
            Direction::Add if source.has_component(component) => return Ok(from),
            Direction::Remove if !source.has_component(component) => return Ok(from),
            Direction::Add => source.components().with(component),
            Direction::Remove => source.components().without(component),
        };

        let to = self.find_or_create(&spec, registry, listener)?;
        self.archetypes[from.index()].cache_edge(component, direction, to);
        self.archetypes[to.index()].cache_edge(component, direction.reverse(), from);
        debug!("cached edge {from} -> {to} via {component} ({direction:?})");
        Ok(to)
    }

    /// Get an archetype by its component specification, if it exists.
    #[inline]
    pub fn find(&self, spec: &component::Spec) -> Option<Id> {
        self.by_components.get(spec).copied()
    }

    /// Get an archetype by its archetype Id.
    #[inline]
    pub fn get(&self, id: Id) -> Option<&Archetype> {
        self.archetypes.get(id.index())
    }

    /// Get a mutable archetype by its archetype Id, if it exists.
    #[inline]
    pub fn get_mut(&mut self, id: Id) -> Option<&mut Archetype> {
        self.archetypes.get_mut(id.index())
    }

    /// Mutably borrow two distinct archetypes at once.
    ///
    /// # Panics
    ///
    /// Panics if `a == b` or either id is out of range.
    pub fn pair_mut(&mut self, a: Id, b: Id) -> (&mut Archetype, &mut Archetype) {
        assert_ne!(a, b, "pair_mut requires distinct archetypes");
        if a.index() < b.index() {
            let (head, tail) = self.archetypes.split_at_mut(b.index());
            (&mut head[a.index()], &mut tail[0])
        } else {
            let (head, tail) = self.archetypes.split_at_mut(a.index());
            (&mut tail[0], &mut head[b.index()])
        }
    }

    /// Number of archetypes.
    #[inline]
    pub fn len(&self) -> usize {
        self.archetypes.len()
    }

    /// Returns true if no archetype has been created.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.archetypes.is_empty()
    }

    /// Iterate all archetypes in creation order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Archetype> {
        self.archetypes.iter()
    }

    /// Iterate all archetypes mutably.
    #[inline]
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Archetype> {
        self.archetypes.iter_mut()
    }

    /// Number of transitions answered from an edge cache.
    #[inline]
    pub fn edge_hits(&self) -> usize {
        self.edge_hits
    }

    /// Chunk size used by archetype storage.
    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

impl Index<Id> for Graph {
    type Output = Archetype;

    #[inline]
    fn index(&self, id: Id) -> &Self::Output {
        &self.archetypes[id.index()]
    }
}

impl IndexMut<Id> for Graph {
    #[inline]
    fn index_mut(&mut self, id: Id) -> &mut Self::Output {
        &mut self.archetypes[id.index()]
    }
}
