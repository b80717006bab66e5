//! Strata: an archetype-based entity/component store.
//!
//! Entities are generational handles. Each distinct set of components an entity carries is an
//! archetype, and every archetype keeps its entities as densely packed, fixed-size rows inside
//! fixed-size memory chunks. Cached queries track which archetypes satisfy a component filter
//! and are kept current as new archetypes appear.
//!
//! The entry point is [`ecs::Entities`].
//!
//! ```rust,ignore
//! use strata::ecs::{Config, Entities, component::RegistryBuilder};
//! use strata_macros::Component;
//!
//! #[derive(Component, Default, Clone)]
//! struct Position { x: f32, y: f32 }
//!
//! let mut builder = RegistryBuilder::new();
//! let position = builder.register::<Position>();
//! let mut entities = Entities::new(builder.build()?, Config::default());
//! let entity = entities.create_entity(&[position])?;
//! ```

extern crate self as strata;

pub mod core;
pub mod ecs;
