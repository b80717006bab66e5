//! Deferred structural changes.
//!
//! Creating or deleting entities and adding or removing components moves rows between
//! archetype storages, so it cannot happen while a query view is alive. Record those changes
//! in a [`CommandBuffer`] during iteration and apply them once the pass is over:
//!
//! ```text
//!  query pass ──record──► CommandBuffer ──apply──► Entities
//!                                       (between passes)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! let mut commands = CommandBuffer::new();
//! for view in entities.query(&dying) {
//!     let health = view.view::<Health>(health)?;
//!     for row in 0..view.len() {
//!         if health[row].0 == 0 {
//!             commands.delete(view.get_entity(row).unwrap());
//!         }
//!     }
//! }
//! commands.apply(&mut entities)?;
//! ```

use log::debug;

use crate::ecs::{component, entity::Entity, error::Result, world::Entities};

/// Moves a boxed value into an entity when applied.
pub type InsertFn = Box<dyn FnOnce(&mut Entities, Entity, component::Id) -> Result<bool>>;

/// A deferred structural change.
pub enum Command {
    /// Create an entity with the given components.
    Create {
        /// Components to initialize with the store's default strategy.
        components: Vec<component::Id>,
    },

    /// Delete an entity. Stale handles are ignored.
    Delete {
        /// The entity to delete.
        entity: Entity,
    },

    /// Add a default-initialized component.
    Add {
        /// The target entity.
        entity: Entity,
        /// The component to add.
        component: component::Id,
    },

    /// Add a component with a value.
    Insert {
        /// The target entity.
        entity: Entity,
        /// The component to add.
        component: component::Id,
        /// Moves the value into the store.
        value: InsertFn,
    },

    /// Remove a component.
    Remove {
        /// The target entity.
        entity: Entity,
        /// The component to remove.
        component: component::Id,
    },
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Create { components } => {
                f.debug_struct("Create").field("components", components).finish()
            }
            Command::Delete { entity } => f.debug_struct("Delete").field("entity", entity).finish(),
            Command::Add { entity, component } => f
                .debug_struct("Add")
                .field("entity", entity)
                .field("component", component)
                .finish(),
            Command::Insert {
                entity, component, ..
            } => f
                .debug_struct("Insert")
                .field("entity", entity)
                .field("component", component)
                .finish_non_exhaustive(),
            Command::Remove { entity, component } => f
                .debug_struct("Remove")
                .field("entity", entity)
                .field("component", component)
                .finish(),
        }
    }
}

/// Queue of commands applied in FIFO order.
#[derive(Debug, Default)]
pub struct CommandBuffer {
    commands: Vec<Command>,
    creates: usize,
}

impl CommandBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a command.
    pub fn push(&mut self, command: Command) {
        if matches!(command, Command::Create { .. }) {
            self.creates += 1;
        }
        self.commands.push(command);
    }

    /// Queue an entity creation. Returns the position of the new entity in the list returned by
    /// [`CommandBuffer::apply`].
    pub fn create(&mut self, components: &[component::Id]) -> usize {
        let slot = self.creates;
        self.push(Command::Create {
            components: components.to_vec(),
        });
        slot
    }

    /// Queue an entity deletion.
    pub fn delete(&mut self, entity: Entity) {
        self.push(Command::Delete { entity });
    }

    /// Queue adding a default-initialized component.
    pub fn add(&mut self, entity: Entity, component: component::Id) {
        self.push(Command::Add { entity, component });
    }

    /// Queue adding a component with a value. The value is dropped if it cannot be added.
    pub fn insert<T: 'static>(&mut self, entity: Entity, component: component::Id, value: T) {
        self.push(Command::Insert {
            entity,
            component,
            value: Box::new(
                move |entities: &mut Entities, entity: Entity, component: component::Id| {
                    entities.insert(entity, component, value)
                },
            ),
        });
    }

    /// Queue removing a component.
    pub fn remove(&mut self, entity: Entity, component: component::Id) {
        self.push(Command::Remove { entity, component });
    }

    /// Number of queued commands.
    #[inline]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns true if nothing is queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Drop every queued command.
    pub fn clear(&mut self) {
        self.commands.clear();
        self.creates = 0;
    }

    /// Apply every queued command in order and empty the buffer. Returns the created entities in
    /// creation order.
    ///
    /// Stops at the first command that fails (an unknown component id or a type mismatch); the
    /// commands after it are discarded.
    pub fn apply(&mut self, entities: &mut Entities) -> Result<Vec<Entity>> {
        let commands = std::mem::take(&mut self.commands);
        self.creates = 0;
        debug!("applying {} commands", commands.len());

        let mut created = Vec::new();
        for command in commands {
            match command {
                Command::Create { components } => {
                    created.push(entities.create_entity(&components)?);
                }
                Command::Delete { entity } => {
                    entities.delete_entity(entity);
                }
                Command::Add { entity, component } => {
                    entities.add_component(entity, component)?;
                }
                Command::Insert {
                    entity,
                    component,
                    value,
                } => {
                    value(entities, entity, component)?;
                }
                Command::Remove { entity, component } => {
                    entities.remove_component(entity, component)?;
                }
            }
        }
        Ok(created)
    }
}
