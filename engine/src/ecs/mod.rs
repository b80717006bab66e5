//! The entity/component store.
//!
//! Layers, leaves first:
//!
//! - [`entity`]: generational handle allocation and recycling.
//! - [`component`]: component ids, type-erased construction ops and the registry.
//! - [`storage`]: fixed-size chunks and the per-archetype packed row storage.
//! - [`archetype`]: the archetype graph and its cached add/remove edges.
//! - [`query`]: the query cache and the views handed out for iteration.
//! - [`world`]: the [`Entities`] facade orchestrating all of the above.
//! - [`command`]: deferred structural changes applied between iteration passes.

pub mod archetype;
pub mod command;
pub mod component;
pub mod entity;
pub mod error;
pub mod query;
pub mod storage;
pub mod world;

pub use component::Component;
pub use entity::Entity;
pub use error::{Error, Result};
pub use world::{Config, Entities, InitStrategy};
