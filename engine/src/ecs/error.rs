//! Errors reported at the public boundary of the store.
//!
//! Only caller mistakes that can be detected cheaply surface here: unknown ids, mismatched types
//! and malformed registrations. Ordinary data conditions (a stale entity handle, a component that
//! is already present, a singleton with zero or many matches) are `bool`/`Option` results on the
//! operations themselves.

use thiserror::Error;

use crate::ecs::{archetype, component};

/// Errors that can occur while registering components or addressing stored data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The component id was never issued by the registry.
    #[error("invalid component id: {0}")]
    InvalidComponent(component::Id),

    /// The archetype id does not refer to a known archetype.
    #[error("invalid archetype id: {0}")]
    InvalidArchetype(archetype::Id),

    /// Two descriptors were registered under the same name.
    #[error("duplicate component name: {0}")]
    DuplicateComponentName(String),

    /// The component layout cannot be placed inside a chunk.
    #[error("component {name} requires alignment {align}, chunks support at most {max}")]
    UnsupportedAlignment {
        /// The component's registered name.
        name: String,
        /// The requested alignment.
        align: usize,
        /// The largest supported alignment.
        max: usize,
    },

    /// A typed access used a Rust type that does not match the registered layout.
    #[error("component {component} is registered as {expected}, not {actual}")]
    TypeMismatch {
        /// The component being accessed.
        component: component::Id,
        /// The registered component name.
        expected: String,
        /// The Rust type the caller asked for.
        actual: &'static str,
    },

    /// A view asked for a column the archetype does not have.
    #[error("component {component} is not part of archetype {archetype}")]
    ComponentNotInArchetype {
        /// The requested component.
        component: component::Id,
        /// The archetype being viewed.
        archetype: archetype::Id,
    },

    /// The same column was requested twice for simultaneous mutable access.
    #[error("component {0} requested twice in one mutable view")]
    AliasedView(component::Id),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, Error>;
