//! Component registration and metadata.
//!
//! Components are plain data types attached to entities. The core never sees their concrete types
//! after registration: everything it needs is captured once in an [`Info`] record (name, size,
//! alignment and the four type-erased [`ComponentOps`] operations) and looked up by [`Id`].
//!
//! ## Architecture
//!
//! - [`Component`]: the trait typed components implement (usually via `#[derive(Component)]`)
//! - [`Id`]: a generational identifier for a registered component, with an optional filter flag
//! - [`Descriptor`]: the inbound registration contract, one per component type
//! - [`RegistryBuilder`]: collects descriptors in a caller-controlled order, then builds a [`Registry`]
//! - [`Info`]: the per-component metadata kept by the registry
//! - [`Spec`]: a sorted, deduplicated set of component ids
//!
//! ## Usage
//!
//! ```ignore
//! use strata::ecs::component::{Component, RegistryBuilder};
//!
//! #[derive(Component, Default, Clone)]
//! struct Position { x: f32, y: f32 }
//!
//! let mut builder = RegistryBuilder::new();
//! let position = builder.register::<Position>();
//! let registry = builder.build()?;
//! assert_eq!(registry.find_by_name("Position"), Some(position));
//! ```

use std::fmt;

mod info;
mod ops;
mod registry;
mod spec;

pub use info::{Descriptor, Info};
pub use ops::{ComponentOps, PlainOps, TypedOps};
pub use registry::{Registry, RegistryBuilder};
pub use spec::Spec;

use crate::ecs::entity::Entity;

/// Direction of a component inside a query filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filter {
    /// The component must be present.
    With,
    /// The component must be absent.
    Without,
}

/// A component identifier.
///
/// Allocated the same way entity handles are, so it carries an index and a generation. The top
/// bit of the index is reserved for the [`Filter`] flag used when ids are embedded in query
/// filters; [`Id::masked`] strips it for identity comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id {
    index: u32,
    generation: u16,
}

impl Id {
    /// Bit of `index` holding the filter flag.
    pub const FILTER_BIT: u32 = 1 << 31;

    /// Construct a component id from raw parts.
    #[inline]
    pub const fn new(index: u32, generation: u16) -> Self {
        Self { index, generation }
    }

    /// Get the index of this component if it were to live in indexable storage (e.g. Vec).
    /// The filter flag is ignored.
    #[inline]
    pub fn index(&self) -> usize {
        (self.index & !Self::FILTER_BIT) as usize
    }

    /// The generation the id was issued with.
    #[inline]
    pub fn generation(&self) -> u16 {
        self.generation
    }

    /// The id with the filter flag cleared.
    #[inline]
    pub fn masked(&self) -> Self {
        Self::new(self.index & !Self::FILTER_BIT, self.generation)
    }

    /// The id flagged with the given filter direction.
    #[inline]
    pub fn with_filter(&self, filter: Filter) -> Self {
        match filter {
            Filter::With => self.masked(),
            Filter::Without => Self::new(self.index | Self::FILTER_BIT, self.generation),
        }
    }

    /// Read the filter flag.
    #[inline]
    pub fn filter(&self) -> Filter {
        if self.index & Self::FILTER_BIT == 0 {
            Filter::With
        } else {
            Filter::Without
        }
    }
}

impl From<Entity> for Id {
    #[inline]
    fn from(entity: Entity) -> Self {
        Self::new(entity.raw_index(), entity.generation().value())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.filter() {
            Filter::With => write!(f, "component#{}v{}", self.index(), self.generation),
            Filter::Without => write!(f, "!component#{}v{}", self.index(), self.generation),
        }
    }
}

/// A typed component.
///
/// `NAME` is the registration name used by [`Registry::find_by_name`]. The derive macro defaults it
/// to the type's identifier; `#[component(name = "...")]` overrides it.
pub trait Component: 'static + Sized {
    /// The registration name of the component.
    const NAME: &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::entity::Generation;

    #[test]
    fn filter_flag_round_trip() {
        // Given
        let id = Id::new(5, 2);

        // When
        let without = id.with_filter(Filter::Without);

        // Then
        assert_eq!(id.filter(), Filter::With);
        assert_eq!(without.filter(), Filter::Without);
        assert_ne!(id, without);
        assert_eq!(without.masked(), id);
        assert_eq!(without.index(), 5);
        assert_eq!(without.with_filter(Filter::With), id);
    }

    #[test]
    fn from_entity_keeps_parts() {
        // Given
        let entity = Entity::new(9, Generation::new(4));

        // When
        let id = Id::from(entity);

        // Then
        assert_eq!(id.index(), 9);
        assert_eq!(id.generation(), 4);
    }

    #[test]
    fn display_marks_without() {
        let id = Id::new(3, 0);
        assert_eq!(id.to_string(), "component#3v0");
        assert_eq!(id.with_filter(Filter::Without).to_string(), "!component#3v0");
    }
}
