use std::collections::HashMap;

use fixedbitset::FixedBitSet;
use log::debug;

use crate::ecs::{
    archetype::{self, Archetype, Graph, Listener},
    component::{self, Spec},
    query::Id,
};

/// A registered query and the archetypes it currently matches.
///
/// `matched` always holds exactly the archetypes whose components are a superset of `with` and
/// share nothing with `without`.
#[derive(Debug, Clone)]
pub struct QueryData {
    /// Components every matched archetype must have.
    with: Spec,

    /// Components no matched archetype may have.
    without: Spec,

    /// Matched archetypes by index.
    matched: FixedBitSet,

    /// Matched archetypes in the order they were matched.
    archetypes: Vec<archetype::Id>,
}

impl QueryData {
    fn new(with: Spec, without: Spec) -> Self {
        Self {
            with,
            without,
            matched: FixedBitSet::new(),
            archetypes: Vec::new(),
        }
    }

    /// Components required by the query.
    #[inline]
    pub fn with(&self) -> &Spec {
        &self.with
    }

    /// Components excluded by the query.
    #[inline]
    pub fn without(&self) -> &Spec {
        &self.without
    }

    /// Matched archetypes, in match order.
    #[inline]
    pub fn archetypes(&self) -> &[archetype::Id] {
        &self.archetypes
    }

    /// Whether the archetype is in the matched set.
    #[inline]
    pub fn contains(&self, archetype: archetype::Id) -> bool {
        self.matched.contains(archetype.index())
    }

    /// Whether the archetype satisfies the filter.
    #[inline]
    pub fn matches(&self, archetype: &Archetype) -> bool {
        archetype.supports(&self.with) && !archetype.components().contains_any(&self.without)
    }

    fn insert(&mut self, archetype: archetype::Id) {
        self.matched.grow(archetype.index() + 1);
        if !self.matched.put(archetype.index()) {
            self.archetypes.push(archetype);
        }
    }
}

/// Every registered query, kept in sync with the archetype graph as it grows.
///
/// Two reverse indexes make the incremental update cheap: queries are indexed under each of
/// their `with` components (or on a match-all list when `with` is empty), and every component
/// maps to the archetypes holding it along with its column index there.
#[derive(Debug, Default)]
pub struct Cache {
    /// Queries by id.
    queries: Vec<QueryData>,

    /// Dedup of identical filters.
    by_filter: HashMap<(Spec, Spec), Id>,

    /// Queries indexed under each required component.
    by_component: HashMap<component::Id, Vec<Id>>,

    /// Queries with no required component, checked against every new archetype.
    match_all: Vec<Id>,

    /// Component -> {archetype -> column index}.
    columns: HashMap<component::Id, HashMap<archetype::Id, usize>>,
}

impl Cache {
    /// Create an empty cache.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a query and match it against every existing archetype. Registering the same
    /// filter twice returns the existing id.
    pub fn add_query(&mut self, with: Spec, without: Spec, graph: &Graph) -> Id {
        let key = (with, without);
        if let Some(id) = self.by_filter.get(&key) {
            return *id;
        }

        let id = Id::new(self.queries.len() as u32);
        let (with, without) = key.clone();
        let mut data = QueryData::new(with, without);

        // Scan only archetypes holding the rarest required component.
        let rarest = data
            .with
            .iter()
            .map(|c| self.columns.get(&c).map_or(0, |m| m.len()))
            .enumerate()
            .min_by_key(|(_, count)| *count)
            .map(|(i, _)| data.with.ids()[i]);

        match rarest {
            None => {
                for archetype in graph.iter() {
                    if data.matches(archetype) {
                        data.insert(archetype.id());
                    }
                }
                self.match_all.push(id);
            }
            Some(component) => {
                let mut candidates: Vec<_> = self
                    .columns
                    .get(&component)
                    .map(|m| m.keys().copied().collect())
                    .unwrap_or_default();
                candidates.sort();
                for candidate in candidates {
                    if let Some(archetype) = graph.get(candidate)
                        && data.matches(archetype)
                    {
                        data.insert(candidate);
                    }
                }
                for c in data.with.iter() {
                    self.by_component.entry(c).or_default().push(id);
                }
            }
        }

        debug!(
            "registered query {} ({} with, {} without) matching {} archetypes",
            id.index(),
            data.with.len(),
            data.without.len(),
            data.archetypes.len()
        );
        self.by_filter.insert(key, id);
        self.queries.push(data);
        id
    }

    /// Index a new archetype and add it to every query it satisfies.
    pub fn on_archetype_created(&mut self, archetype: &Archetype) {
        let archetype_id = archetype.id();
        for (column, component) in archetype.components().iter().enumerate() {
            self.columns
                .entry(component)
                .or_default()
                .insert(archetype_id, column);
        }

        let mut visited = FixedBitSet::with_capacity(self.queries.len());
        let indexed = archetype
            .components()
            .iter()
            .filter_map(|c| self.by_component.get(&c))
            .flatten();
        for id in indexed.chain(self.match_all.iter()) {
            if visited.put(id.index()) {
                continue;
            }
            let data = &mut self.queries[id.index()];
            if data.matches(archetype) {
                data.insert(archetype_id);
            }
        }
    }

    /// Get a query's data.
    #[inline]
    pub fn get(&self, id: Id) -> Option<&QueryData> {
        self.queries.get(id.index())
    }

    /// Archetypes holding `component`, with the component's column index in each.
    #[inline]
    pub fn archetypes_with(
        &self,
        component: component::Id,
    ) -> impl Iterator<Item = (archetype::Id, usize)> + '_ {
        self.columns
            .get(&component.masked())
            .into_iter()
            .flat_map(|m| m.iter().map(|(a, c)| (*a, *c)))
    }

    /// Number of registered queries.
    #[inline]
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    /// Returns true if no queries are registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Iterate all queries in id order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (Id, &QueryData)> {
        self.queries
            .iter()
            .enumerate()
            .map(|(i, d)| (Id::new(i as u32), d))
    }
}

impl Listener for Cache {
    fn on_archetype_created(&mut self, archetype: &Archetype) {
        Cache::on_archetype_created(self, archetype);
    }
}
