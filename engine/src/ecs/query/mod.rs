//! Cached queries over archetypes, and the views they hand out.
//!
//! A query is a filter: components every matched entity must have (`with`) and components it
//! must not have (`without`). Its result is a set of archetypes, not entities. The [`Cache`]
//! computes that set once when the query is registered and then keeps it current as the
//! archetype graph grows, without ever rescanning the whole graph.
//!
//! Iterating a query yields one [`EntityView`] per matched, non-empty archetype. A view walks the
//! archetype's rows and hands out typed columns:
//!
//! ```rust,ignore
//! let moving = entities.create_query(&[position, velocity], &[frozen])?;
//! for view in entities.query(&moving) {
//!     let positions = view.view::<Position>(position)?;
//!     for row in 0..view.len() {
//!         println!("{:?} at {:?}", view.get_entity(row), positions[row]);
//!     }
//! }
//!
//! entities.query_mut(&moving, |mut view| {
//!     if let Ok((mut pos, vel)) = view.views_mut2::<Position, Velocity>(position, velocity) {
//!         for row in 0..pos.len() {
//!             pos[row].x += vel[row].dx;
//!         }
//!     }
//! });
//! ```
//!
//! Structural changes (create, delete, add or remove a component) cannot happen while a view is
//! alive; the borrow checker enforces it. Defer them through a
//! [`CommandBuffer`](crate::ecs::command::CommandBuffer).

mod cache;
mod view;

pub use cache::{Cache, QueryData};
pub use view::{ComponentView, ComponentViewMut, EntityView, EntityViewMut};

use crate::ecs::component::{Filter, Spec};

/// A unique identifier for a registered query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(u32);

impl Id {
    /// Create a new Id with the given unique identifier.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Id(id)
    }

    /// Get the index of the Id as a usize to be used in collections.
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Handle to a registered query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Query {
    id: Id,
    with: Spec,
    without: Spec,
}

impl Query {
    pub(crate) fn new(id: Id, with: Spec, without: Spec) -> Self {
        Self { id, with, without }
    }

    /// The query's id in its cache.
    #[inline]
    pub fn id(&self) -> Id {
        self.id
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

    /// All filter ids, with `without` components carrying the [`Filter::Without`] flag.
    pub fn filter_ids(&self) -> impl Iterator<Item = crate::ecs::component::Id> + '_ {
        self.with.iter().chain(
            self.without
                .iter()
                .map(|id| id.with_filter(Filter::Without)),
        )
    }
}
