use std::{
    marker::PhantomData,
    ops::{Index, IndexMut},
};

use crate::ecs::{
    archetype::{self, Archetype},
    component::{self, Registry, Spec},
    entity::Entity,
    error::{Error, Result},
    storage::ChunkedStorage,
};

/// Resolve a typed column of an archetype: the component must be registered as `T` and be part
/// of the archetype. Returns the column's byte offset.
fn column_offset<T: 'static>(
    archetype: &Archetype,
    registry: &Registry,
    component: component::Id,
) -> Result<usize> {
    registry.info(component)?.check_type::<T>()?;
    archetype
        .column(component)
        .map(|(offset, _)| offset)
        .ok_or(Error::ComponentNotInArchetype {
            component,
            archetype: archetype.id(),
        })
}

/// Read access to the entities of one archetype.
#[derive(Clone, Copy)]
pub struct EntityView<'a> {
    archetype: &'a Archetype,
    registry: &'a Registry,
}

impl<'a> EntityView<'a> {
    pub(crate) fn new(archetype: &'a Archetype, registry: &'a Registry) -> Self {
        Self {
            archetype,
            registry,
        }
    }

    /// The archetype being viewed.
    #[inline]
    pub fn archetype_id(&self) -> archetype::Id {
        self.archetype.id()
    }

    /// The archetype's components.
    #[inline]
    pub fn components(&self) -> &'a Spec {
        self.archetype.components()
    }

    /// Number of entity rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.archetype.len()
    }

    /// Returns true if there are no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.archetype.is_empty()
    }

    /// The stable handle of the entity in `row`.
    #[inline]
    pub fn get_entity(&self, row: usize) -> Option<Entity> {
        self.archetype.storage().entity_at(row)
    }

    /// Handles of every row in row order.
    #[inline]
    pub fn entities(&self) -> &'a [Entity] {
        self.archetype.storage().entities()
    }

    /// Typed column of component `component`.
    pub fn view<T: 'static>(&self, component: component::Id) -> Result<ComponentView<'a, T>> {
        let offset = column_offset::<T>(self.archetype, self.registry, component)?;
        Ok(ComponentView {
            storage: self.archetype.storage(),
            offset,
            _marker: PhantomData,
        })
    }

    /// Raw bytes of one component in one row. `None` unless the component is zeroable.
    pub fn bytes(&self, row: usize, component: component::Id) -> Option<&'a [u8]> {
        self.registry.info(component).ok()?.check_bytes().ok()?;
        let (offset, size) = self.archetype.column(component)?;
        if row >= self.len() {
            return None;
        }
        Some(&self.archetype.storage().row_bytes(row)[offset..offset + size])
    }
}

/// Read/write access to the entities of one archetype.
pub struct EntityViewMut<'a> {
    archetype: &'a mut Archetype,
    registry: &'a Registry,
}

impl<'a> EntityViewMut<'a> {
    pub(crate) fn new(archetype: &'a mut Archetype, registry: &'a Registry) -> Self {
        Self {
            archetype,
            registry,
        }
    }

    /// The archetype being viewed.
    #[inline]
    pub fn archetype_id(&self) -> archetype::Id {
        self.archetype.id()
    }

    /// The archetype's components.
    #[inline]
    pub fn components(&self) -> &Spec {
        self.archetype.components()
    }

    /// Number of entity rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.archetype.len()
    }

    /// Returns true if there are no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.archetype.is_empty()
    }

    /// The stable handle of the entity in `row`.
    #[inline]
    pub fn get_entity(&self, row: usize) -> Option<Entity> {
        self.archetype.storage().entity_at(row)
    }

    /// Handles of every row in row order.
    #[inline]
    pub fn entities(&self) -> &[Entity] {
        self.archetype.storage().entities()
    }

    /// Read-only typed column.
    pub fn view<T: 'static>(&self, component: component::Id) -> Result<ComponentView<'_, T>> {
        let offset = column_offset::<T>(self.archetype, self.registry, component)?;
        Ok(ComponentView {
            storage: self.archetype.storage(),
            offset,
            _marker: PhantomData,
        })
    }

    /// Mutable typed column.
    pub fn view_mut<T: 'static>(
        &mut self,
        component: component::Id,
    ) -> Result<ComponentViewMut<'_, T>> {
        let offset = column_offset::<T>(self.archetype, self.registry, component)?;
        Ok(ComponentViewMut {
            storage: self.archetype.storage_mut(),
            offset,
            _marker: PhantomData,
        })
    }

    /// Two mutable typed columns at once. Fails with [`Error::AliasedView`] if both ids name the
    /// same component.
    pub fn views_mut2<A: 'static, B: 'static>(
        &mut self,
        a: component::Id,
        b: component::Id,
    ) -> Result<(ComponentViewMut<'_, A>, ComponentViewMut<'_, B>)> {
        if a.masked() == b.masked() {
            return Err(Error::AliasedView(a.masked()));
        }
        let offset_a = column_offset::<A>(self.archetype, self.registry, a)?;
        let offset_b = column_offset::<B>(self.archetype, self.registry, b)?;
        let storage: &ChunkedStorage = self.archetype.storage_mut();
        Ok((
            ComponentViewMut {
                storage,
                offset: offset_a,
                _marker: PhantomData,
            },
            ComponentViewMut {
                storage,
                offset: offset_b,
                _marker: PhantomData,
            },
        ))
    }
}

/// A typed, read-only column. Index it by row.
pub struct ComponentView<'a, T> {
    storage: &'a ChunkedStorage,
    offset: usize,
    _marker: PhantomData<&'a T>,
}

impl<'a, T> ComponentView<'a, T> {
    /// Number of rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Returns true if there are no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// The value in `row`.
    #[inline]
    pub fn get(&self, row: usize) -> Option<&'a T> {
        if row >= self.storage.len() {
            return None;
        }
        // Safety - the column was type checked against T and the row is in bounds.
        Some(unsafe { self.storage.row_ptr(row).add(self.offset).cast::<T>().as_ref() })
    }

    /// Iterate values in row order.
    pub fn iter(&self) -> impl Iterator<Item = &'a T> + '_ {
        (0..self.len()).filter_map(|row| self.get(row))
    }
}

impl<T> Index<usize> for ComponentView<'_, T> {
    type Output = T;

    fn index(&self, row: usize) -> &Self::Output {
        match self.get(row) {
            Some(value) => value,
            None => panic!("row {row} out of bounds ({} rows)", self.len()),
        }
    }
}

/// A typed, mutable column. Index it by row.
pub struct ComponentViewMut<'a, T> {
    storage: &'a ChunkedStorage,
    offset: usize,
    _marker: PhantomData<&'a mut T>,
}

impl<T> ComponentViewMut<'_, T> {
    /// Number of rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Returns true if there are no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// The value in `row`.
    #[inline]
    pub fn get(&self, row: usize) -> Option<&T> {
        if row >= self.storage.len() {
            return None;
        }
        Some(unsafe { self.storage.row_ptr(row).add(self.offset).cast::<T>().as_ref() })
    }

    /// The value in `row`, mutably.
    #[inline]
    pub fn get_mut(&mut self, row: usize) -> Option<&mut T> {
        if row >= self.storage.len() {
            return None;
        }
        // Safety - this view holds the only access to its column for its lifetime.
        Some(unsafe { self.storage.row_ptr(row).add(self.offset).cast::<T>().as_mut() })
    }

    /// Apply `f` to every value in row order.
    pub fn for_each(&mut self, mut f: impl FnMut(&mut T)) {
        for row in 0..self.len() {
            if let Some(value) = self.get_mut(row) {
                f(value);
            }
        }
    }
}

impl<T> Index<usize> for ComponentViewMut<'_, T> {
    type Output = T;

    fn index(&self, row: usize) -> &Self::Output {
        match self.get(row) {
            Some(value) => value,
            None => panic!("row {row} out of bounds ({} rows)", self.len()),
        }
    }
}

impl<T> IndexMut<usize> for ComponentViewMut<'_, T> {
    fn index_mut(&mut self, row: usize) -> &mut Self::Output {
        let len = self.len();
        match self.get_mut(row) {
            Some(value) => value,
            None => panic!("row {row} out of bounds ({len} rows)"),
        }
    }
}
