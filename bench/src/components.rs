//! Common component types used across benchmarks.
//!
//! These components are representative of real game components in terms of size and access
//! patterns.

use strata::ecs::component::{self, Registry, RegistryBuilder};
use strata_macros::Component;

// =============================================================================
// Transform Components
// =============================================================================

/// 3D position component (12 bytes).
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// 3D velocity component (12 bytes).
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct Velocity {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Rotation as euler angles (12 bytes).
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct Rotation {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// 4x4 transformation matrix (64 bytes).
#[derive(Component, Clone, Copy, Debug)]
pub struct Transform {
    pub matrix: [[f32; 4]; 4],
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            matrix: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }
}

/// Health component for damageable entities.
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

// =============================================================================
// Fragmentation Components
// =============================================================================

/// Shared data component for fragmentation tests.
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct Data {
    pub value: f64,
}

// Marker components for creating many archetypes
macro_rules! define_marker_components {
    ($($name:ident),*) => {
        $(
            #[derive(Component, Clone, Copy, Debug, Default)]
            pub struct $name;
        )*

        /// Register every marker, in declaration order.
        fn register_markers(builder: &mut RegistryBuilder) -> Vec<component::Id> {
            vec![$(builder.register::<$name>()),*]
        }
    };
}

define_marker_components!(
    MarkerA, MarkerB, MarkerC, MarkerD, MarkerE, MarkerF, MarkerG, MarkerH, MarkerI, MarkerJ,
    MarkerK, MarkerL, MarkerM, MarkerN, MarkerO, MarkerP, MarkerQ, MarkerR, MarkerS, MarkerT,
    MarkerU, MarkerV, MarkerW, MarkerX, MarkerY, MarkerZ
);

/// Ids of every benchmark component.
#[derive(Debug, Clone)]
pub struct Ids {
    pub position: component::Id,
    pub velocity: component::Id,
    pub rotation: component::Id,
    pub transform: component::Id,
    pub health: component::Id,
    pub data: component::Id,
    pub markers: Vec<component::Id>,
}

/// Build a registry of every benchmark component.
pub fn registry() -> (Registry, Ids) {
    let mut builder = RegistryBuilder::new();
    let ids = Ids {
        position: builder.register::<Position>(),
        velocity: builder.register::<Velocity>(),
        rotation: builder.register::<Rotation>(),
        transform: builder.register::<Transform>(),
        health: builder.register::<Health>(),
        data: builder.register::<Data>(),
        markers: register_markers(&mut builder),
    };
    match builder.build() {
        Ok(registry) => (registry, ids),
        Err(err) => panic!("benchmark registry rejected: {err}"),
    }
}
