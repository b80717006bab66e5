use crate::ecs::component::Id;

/// A specification for a set of components (an archetype's layout or a query filter).
///
/// This is a sorted, deduplicated vector of masked component ids, usable as a hash key to identify
/// unique component combinations and searchable by binary search.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct Spec {
    ids: Vec<Id>,
}

impl Spec {
    /// An empty component specification.
    pub const EMPTY: Self = Spec { ids: Vec::new() };

    /// Construct a new Spec from the given component IDs. Filter flags are stripped.
    #[inline]
    pub fn new(ids: impl Into<Vec<Id>>) -> Self {
        let mut ids = ids.into();
        for id in ids.iter_mut() {
            *id = id.masked();
        }
        ids.sort();
        ids.dedup();
        ids.shrink_to_fit();

        Self { ids }
    }

    /// Get the component IDs in this specification.
    #[inline]
    pub fn ids(&self) -> &[Id] {
        &self.ids
    }

    /// Iterate the component IDs in ascending order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = Id> + '_ {
        self.ids.iter().copied()
    }

    /// Position of the given component in the sorted sequence (its column index).
    #[inline]
    pub fn position(&self, id: Id) -> Option<usize> {
        self.ids.binary_search(&id.masked()).ok()
    }

    /// Determine if this specification contains the given component ID.
    #[inline]
    pub fn contains(&self, id: Id) -> bool {
        self.position(id).is_some()
    }

    /// Determine if this specification contains all component IDs in the other specification.
    #[inline]
    pub fn contains_all(&self, other: &Spec) -> bool {
        self.is_superset_of(other)
    }

    /// Determine if this specification contains any component IDs in the other specification.
    #[inline]
    pub fn contains_any(&self, other: &Spec) -> bool {
        other.ids.iter().any(|id| self.contains(*id))
    }

    /// Superset test as a single merge walk over both sorted sequences: the cursor into `other`
    /// advances only on an equal element, and the test succeeds once that cursor reaches the end.
    pub fn is_superset_of(&self, other: &Spec) -> bool {
        if other.ids.len() > self.ids.len() {
            return false;
        }
        let mut cursor = 0;
        for id in &self.ids {
            if cursor == other.ids.len() {
                break;
            }
            if *id == other.ids[cursor] {
                cursor += 1;
            }
        }
        cursor == other.ids.len()
    }

    /// A new spec with `id` inserted at its sorted position.
    pub fn with(&self, id: Id) -> Self {
        let id = id.masked();
        match self.ids.binary_search(&id) {
            Ok(_) => self.clone(),
            Err(at) => {
                let mut ids = Vec::with_capacity(self.ids.len() + 1);
                ids.extend_from_slice(&self.ids[..at]);
                ids.push(id);
                ids.extend_from_slice(&self.ids[at..]);
                Self { ids }
            }
        }
    }

    /// A new spec with `id` removed, order preserved.
    pub fn without(&self, id: Id) -> Self {
        let mut ids = self.ids.clone();
        if let Ok(at) = ids.binary_search(&id.masked()) {
            ids.remove(at);
        }
        Self { ids }
    }

    /// Create a new spec that is the union with the other spec.
    #[inline]
    pub fn union(&self, other: &Spec) -> Self {
        let mut ids = Vec::with_capacity(self.ids.len() + other.ids.len());
        ids.extend_from_slice(&self.ids);
        ids.extend_from_slice(&other.ids);
        Self::new(ids)
    }

    /// Get the components in self that are not in other (set difference).
    #[inline]
    pub fn difference(&self, other: &Spec) -> Self {
        let ids: Vec<_> = self
            .ids
            .iter()
            .copied()
            .filter(|id| !other.contains(*id))
            .collect();
        Self { ids } // Already sorted
    }

    /// Returns true if this spec is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Returns the number of component IDs in this spec.
    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }
}

impl From<Vec<Id>> for Spec {
    #[inline]
    fn from(value: Vec<Id>) -> Self {
        Spec::new(value)
    }
}

impl From<&[Id]> for Spec {
    #[inline]
    fn from(value: &[Id]) -> Self {
        Spec::new(value.to_vec())
    }
}

impl<const N: usize> From<[Id; N]> for Spec {
    #[inline]
    fn from(value: [Id; N]) -> Self {
        Spec::new(value.to_vec())
    }
}

impl FromIterator<Id> for Spec {
    fn from_iter<I: IntoIterator<Item = Id>>(iter: I) -> Self {
        Spec::new(iter.into_iter().collect::<Vec<_>>())
    }
}

#[cfg(test)]
mod tests {
    use std::hash::{DefaultHasher, Hash, Hasher};

    use crate::ecs::component::{Filter, Id, Spec};

    fn ids() -> (Id, Id, Id, Id) {
        (Id::new(0, 0), Id::new(1, 0), Id::new(2, 0), Id::new(3, 0))
    }

    #[test]
    fn component_id_order() {
        // Given
        let (id1, id2, id3, _) = ids();

        // When
        let spec1 = Spec::new(vec![id2, id1, id3]);
        let spec2 = Spec::new(vec![id1, id2, id3]);

        // Then
        assert_eq!(spec1, spec2);
        let mut hasher1 = DefaultHasher::new();
        spec1.hash(&mut hasher1);
        let mut hasher2 = DefaultHasher::new();
        spec2.hash(&mut hasher2);
        assert_eq!(hasher1.finish(), hasher2.finish());
    }

    #[test]
    fn component_id_dedupe() {
        // Given
        let (id1, id2, id3, _) = ids();

        // When
        let spec = Spec::new(vec![id2, id1, id3, id2, id1]);

        // Then
        assert_eq!(spec.ids(), &[id1, id2, id3]);
    }

    #[test]
    fn filter_flags_are_masked() {
        // Given
        let (id1, id2, _, _) = ids();

        // When
        let spec = Spec::new(vec![id2.with_filter(Filter::Without), id1]);

        // Then
        assert_eq!(spec.ids(), &[id1, id2]);
        assert!(spec.contains(id2.with_filter(Filter::Without)));
    }

    #[test]
    fn contains() {
        // Given
        let (id1, id2, id3, _) = ids();
        let spec = Spec::new(vec![id2, id1]);

        // Then
        assert!(spec.contains(id1));
        assert!(spec.contains(id2));
        assert!(!spec.contains(id3));
        assert_eq!(spec.position(id2), Some(1));
    }

    #[test]
    fn superset_merge() {
        // Given
        let (id1, id2, id3, id4) = ids();
        let spec1 = Spec::new(vec![id1, id2, id3]);
        let spec2 = Spec::new(vec![id1, id3]);
        let spec3 = Spec::new(vec![id1, id4]);

        // Then
        assert!(spec1.is_superset_of(&spec2));
        assert!(spec1.is_superset_of(&spec1));
        assert!(spec1.is_superset_of(&Spec::EMPTY));
        assert!(!spec1.is_superset_of(&spec3));
        assert!(!spec2.is_superset_of(&spec1));
        assert!(spec1.contains_all(&spec2));
        assert!(spec1.contains_any(&spec3));
        assert!(!spec2.contains_any(&Spec::new(vec![id4])));
    }

    #[test]
    fn with_inserts_sorted() {
        // Given
        let (id1, id2, id3, _) = ids();
        let spec = Spec::new(vec![id1, id3]);

        // When
        let added = spec.with(id2);

        // Then
        assert_eq!(added.ids(), &[id1, id2, id3]);
        assert_eq!(added.with(id2), added);
        // Original unchanged
        assert_eq!(spec.len(), 2);
    }

    #[test]
    fn without_removes() {
        // Given
        let (id1, id2, id3, id4) = ids();
        let spec = Spec::new(vec![id1, id2, id3]);

        // When
        let removed = spec.without(id2);

        // Then
        assert_eq!(removed.ids(), &[id1, id3]);
        assert_eq!(removed.without(id4), removed);
    }

    #[test]
    fn union_and_difference() {
        // Given
        let (id1, id2, id3, id4) = ids();
        let spec1 = Spec::new(vec![id1, id2, id3]);
        let spec2 = Spec::new(vec![id2, id4]);

        // When
        let union = spec1.union(&spec2);
        let diff = spec1.difference(&spec2);

        // Then
        assert_eq!(union.ids(), &[id1, id2, id3, id4]);
        assert_eq!(diff.ids(), &[id1, id3]);
    }

    #[test]
    fn is_empty_and_len() {
        // Given
        let (id1, _, _, _) = ids();

        // Then
        assert!(Spec::EMPTY.is_empty());
        assert_eq!(Spec::EMPTY.len(), 0);

        let spec = Spec::from([id1]);
        assert!(!spec.is_empty());
        assert_eq!(spec.len(), 1);
    }
}
