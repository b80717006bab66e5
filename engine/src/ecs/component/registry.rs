use std::{any::TypeId, collections::HashMap, ops::Index};

use log::{debug, warn};

use crate::ecs::{
    component::{Component, Descriptor, Id, Info},
    entity::Allocator,
    error::{Error, Result},
    storage::CHUNK_ALIGN,
};

/// Collects component descriptors in a caller-controlled order and builds a [`Registry`].
///
/// Ids are handed out as descriptors are added, so they are deterministic for a given
/// registration order. Validation happens once in [`RegistryBuilder::build`].
#[derive(Default)]
pub struct RegistryBuilder {
    /// Issues component ids, the same way entity handles are issued.
    allocator: Allocator,

    /// Pending registrations in id order.
    pending: Vec<(Id, Descriptor)>,

    /// Typed registrations, for idempotent `register::<T>()`.
    types: HashMap<TypeId, Id>,
}

impl RegistryBuilder {
    /// Create an empty builder.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the typed component `T` and get its id. Registering the same type twice returns
    /// the same id.
    pub fn register<T: Component + Default + Clone>(&mut self) -> Id {
        if let Some(id) = self.types.get(&TypeId::of::<T>()) {
            return *id;
        }
        self.register_descriptor(Descriptor::of::<T>())
    }

    /// Register a component from its descriptor and get its id.
    pub fn register_descriptor(&mut self, descriptor: Descriptor) -> Id {
        let id = Id::from(self.allocator.create_id());
        if let Some(type_id) = descriptor.type_id {
            self.types.insert(type_id, id);
        }
        self.pending.push((id, descriptor));
        id
    }

    /// Number of components registered so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns true if nothing has been registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Validate every registration and freeze them into a registry.
    ///
    /// Fails on a duplicate name, or on an alignment that is not a power of two or exceeds the
    /// chunk alignment.
    pub fn build(self) -> Result<Registry> {
        let mut infos = Vec::with_capacity(self.pending.len());
        let mut by_name = HashMap::with_capacity(self.pending.len());

        for (id, descriptor) in self.pending {
            if !descriptor.align.is_power_of_two() || descriptor.align > CHUNK_ALIGN {
                warn!(
                    "rejecting component {}: alignment {}",
                    descriptor.name, descriptor.align
                );
                return Err(Error::UnsupportedAlignment {
                    name: descriptor.name,
                    align: descriptor.align,
                    max: CHUNK_ALIGN,
                });
            }
            if by_name.contains_key(&descriptor.name) {
                warn!("rejecting duplicate component name {}", descriptor.name);
                return Err(Error::DuplicateComponentName(descriptor.name));
            }
            debug_assert_eq!(id.index(), infos.len());

            debug!(
                "registered component {} as {id} ({} bytes, align {})",
                descriptor.name, descriptor.size, descriptor.align
            );
            by_name.insert(descriptor.name.clone(), id);
            infos.push(Info::new(id, descriptor));
        }

        Ok(Registry {
            infos,
            by_name,
            by_type: self.types,
        })
    }
}

/// The frozen set of registered components.
///
/// Ids are dense, so lookup by id is a bounds-checked vector index plus a generation check.
#[derive(Debug, Default)]
pub struct Registry {
    /// Component info indexed by `Id::index`.
    infos: Vec<Info>,

    /// Registration name to id.
    by_name: HashMap<String, Id>,

    /// Rust type to id for typed registrations.
    by_type: HashMap<TypeId, Id>,
}

impl Registry {
    /// Register every descriptor in iteration order and build the registry in one step.
    pub fn register_all(descriptors: impl IntoIterator<Item = Descriptor>) -> Result<Self> {
        let mut builder = RegistryBuilder::new();
        for descriptor in descriptors {
            builder.register_descriptor(descriptor);
        }
        builder.build()
    }

    /// Get the info of a registered component.
    #[inline]
    pub fn info(&self, id: Id) -> Result<&Info> {
        let id = id.masked();
        self.infos
            .get(id.index())
            .filter(|info| info.id() == id)
            .ok_or(Error::InvalidComponent(id))
    }

    /// Returns true if `id` was issued by this registry.
    #[inline]
    pub fn contains(&self, id: Id) -> bool {
        self.info(id).is_ok()
    }

    /// Find a component by its registration name.
    #[inline]
    pub fn find_by_name(&self, name: &str) -> Option<Id> {
        self.by_name.get(name).copied()
    }

    /// Get the id the typed component `T` was registered under.
    #[inline]
    pub fn id_of<T: Component>(&self) -> Option<Id> {
        self.by_type.get(&TypeId::of::<T>()).copied()
    }

    /// Number of registered components.
    #[inline]
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    /// Returns true if no components are registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    /// Iterate all component infos in id order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Info> {
        self.infos.iter()
    }
}

/// Panics if the id is unknown.
impl Index<Id> for Registry {
    type Output = Info;

    fn index(&self, id: Id) -> &Self::Output {
        match self.info(id) {
            Ok(info) => info,
            Err(err) => panic!("{err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_macros::Component;

    #[derive(Component, Debug, Default, Clone)]
    struct Position {
        _x: f32,
        _y: f32,
    }

    #[derive(Component, Debug, Default, Clone)]
    struct Velocity {
        _x: f32,
        _y: f32,
    }

    #[derive(Component, Debug, Default, Clone)]
    #[component(name = "hp")]
    struct Health(u32);

    #[test]
    fn component_registration() {
        // Given
        let mut builder = RegistryBuilder::new();

        // When
        let pos_id = builder.register::<Position>();
        let vel_id = builder.register::<Velocity>();

        // Then
        assert_ne!(pos_id, vel_id);
        assert_eq!(builder.len(), 2);

        // Then - Registering the same type again should result in the same id
        assert_eq!(builder.register::<Position>(), pos_id);
        assert_eq!(builder.len(), 2);
    }

    #[test]
    fn ids_follow_registration_order() {
        // Given
        let mut builder = RegistryBuilder::new();

        // When
        let vel_id = builder.register::<Velocity>();
        let pos_id = builder.register::<Position>();
        let registry = builder.build().unwrap();

        // Then
        assert_eq!(vel_id.index(), 0);
        assert_eq!(pos_id.index(), 1);
        assert_eq!(registry.iter().map(|i| i.id()).collect::<Vec<_>>(), vec![vel_id, pos_id]);
    }

    #[test]
    fn lookup_by_id_name_and_type() {
        // Given
        let mut builder = RegistryBuilder::new();
        let pos_id = builder.register::<Position>();
        let health_id = builder.register::<Health>();
        let registry = builder.build().unwrap();

        // When
        let info = registry.info(pos_id).unwrap();

        // Then
        assert_eq!(info.id(), pos_id);
        assert_eq!(info.name(), "Position");
        assert_eq!(info.size(), std::mem::size_of::<Position>());
        assert_eq!(registry.find_by_name("hp"), Some(health_id));
        assert_eq!(registry.find_by_name("Health"), None);
        assert_eq!(registry.id_of::<Health>(), Some(health_id));
        assert_eq!(registry.id_of::<Velocity>(), None);
        assert!(info.check_type::<Position>().is_ok());
        assert!(info.check_type::<Velocity>().is_err());
    }

    #[test]
    fn byte_access_only_for_zeroable_components() {
        // Given
        let mut builder = RegistryBuilder::new();
        let pos_id = builder.register::<Position>();
        let blob_id = builder.register_descriptor(Descriptor::plain("blob", 4, 4));
        let registry = builder.build().unwrap();

        // Then
        assert!(registry[blob_id].check_bytes().is_ok());
        assert!(matches!(
            registry[pos_id].check_bytes(),
            Err(Error::TypeMismatch { actual: "[u8]", .. })
        ));
    }

    #[test]
    fn unknown_id_is_invalid() {
        // Given
        let registry = Registry::register_all([Descriptor::plain("blob", 8, 8)]).unwrap();

        // When
        let result = registry.info(Id::new(5, 0));
        let stale = registry.info(Id::new(0, 1));

        // Then
        assert_eq!(result.unwrap_err(), Error::InvalidComponent(Id::new(5, 0)));
        assert!(stale.is_err());
        assert!(registry.contains(Id::new(0, 0)));
    }

    #[test]
    fn duplicate_name_rejected() {
        // Given
        let descriptors = [Descriptor::plain("a", 4, 4), Descriptor::plain("a", 8, 8)];

        // When
        let result = Registry::register_all(descriptors);

        // Then
        assert_eq!(
            result.unwrap_err(),
            Error::DuplicateComponentName("a".to_string())
        );
    }

    #[test]
    fn oversized_alignment_rejected() {
        // Given
        let descriptors = [Descriptor::plain("wide", 128, 128)];

        // When
        let result = Registry::register_all(descriptors);

        // Then
        assert!(matches!(
            result,
            Err(Error::UnsupportedAlignment { align: 128, max: 64, .. })
        ));
    }

    #[test]
    fn serialization_payload_is_carried() {
        // Given
        let descriptor = Descriptor::plain("tagged", 0, 1).with_serialization(Box::new("yaml"));

        // When
        let registry = Registry::register_all([descriptor]).unwrap();
        let id = registry.find_by_name("tagged").unwrap();

        // Then
        let payload = registry[id].serialization().unwrap();
        assert_eq!(payload.downcast_ref::<&str>(), Some(&"yaml"));
        assert!(registry[id].is_zero_sized());
    }
}
