use std::{
    alloc::Layout,
    any::{Any, TypeId},
    fmt,
};

use crate::ecs::{
    component::{Component, ComponentOps, Id, PlainOps, TypedOps},
    error::{Error, Result},
};

/// Everything a component type supplies once at registration.
///
/// Built either from a Rust type with [`Descriptor::of`] or from a raw layout with
/// [`Descriptor::plain`] / [`Descriptor::custom`] for components whose concrete type lives outside
/// this crate. The optional serialization payload is owned by whoever provides it; the store only
/// carries it along.
pub struct Descriptor {
    pub(crate) name: String,
    pub(crate) size: usize,
    pub(crate) align: usize,
    pub(crate) ops: Box<dyn ComponentOps>,
    pub(crate) type_id: Option<TypeId>,
    pub(crate) type_name: Option<&'static str>,
    pub(crate) zeroable: bool,
    pub(crate) serialization: Option<Box<dyn Any>>,
}

impl Descriptor {
    /// Descriptor for the typed component `T`.
    pub fn of<T: Component + Default + Clone>() -> Self {
        let layout = Layout::new::<T>();
        Self {
            name: T::NAME.to_string(),
            size: layout.size(),
            align: layout.align(),
            ops: Box::new(TypedOps::<T>::new()),
            type_id: Some(TypeId::of::<T>()),
            type_name: Some(std::any::type_name::<T>()),
            zeroable: false,
            serialization: None,
        }
    }

    /// Descriptor for a component that is plain bytes: zero-initialized, no destructor, copied
    /// bytewise. Typed access to such a component is rejected; use the byte accessors instead.
    pub fn plain(name: impl Into<String>, size: usize, align: usize) -> Self {
        Self {
            name: name.into(),
            size,
            align,
            ops: Box::new(PlainOps::new(size)),
            type_id: None,
            type_name: None,
            zeroable: true,
            serialization: None,
        }
    }

    /// Descriptor with caller-supplied operations.
    ///
    /// # Safety
    ///
    /// `ops` must be sound for any properly aligned region of `size` bytes laid out as described
    /// in [`ComponentOps`].
    pub unsafe fn custom(
        name: impl Into<String>,
        size: usize,
        align: usize,
        ops: Box<dyn ComponentOps>,
    ) -> Self {
        Self {
            name: name.into(),
            size,
            align,
            ops,
            type_id: None,
            type_name: None,
            zeroable: false,
            serialization: None,
        }
    }

    /// Declare that all-zero bytes are a valid value of this component, so the `Zero`
    /// initialization strategy may skip its default constructor. Zeroable components are also
    /// reachable through the raw byte accessors.
    ///
    /// # Safety
    ///
    /// The all-zero bit pattern must be a valid, droppable value of the component, and the
    /// component must have no padding: every byte of every value it can hold is initialized.
    pub unsafe fn assume_zeroable(mut self) -> Self {
        self.zeroable = true;
        self
    }

    /// Attach an externally owned serialization descriptor.
    pub fn with_serialization(mut self, serialization: Box<dyn Any>) -> Self {
        self.serialization = Some(serialization);
        self
    }

    /// The registration name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Alignment in bytes.
    #[inline]
    pub fn align(&self) -> usize {
        self.align
    }

    /// The Rust type this descriptor was built from, if any.
    #[inline]
    pub fn type_id(&self) -> Option<TypeId> {
        self.type_id
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("name", &self.name)
            .field("size", &self.size)
            .field("align", &self.align)
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Registered metadata of a component.
pub struct Info {
    id: Id,
    name: String,
    size: usize,
    align: usize,
    ops: Box<dyn ComponentOps>,
    type_id: Option<TypeId>,
    type_name: Option<&'static str>,
    zeroable: bool,
    serialization: Option<Box<dyn Any>>,
}

impl Info {
    pub(crate) fn new(id: Id, descriptor: Descriptor) -> Self {
        Self {
            id,
            name: descriptor.name,
            size: descriptor.size,
            align: descriptor.align,
            ops: descriptor.ops,
            type_id: descriptor.type_id,
            type_name: descriptor.type_name,
            zeroable: descriptor.zeroable,
            serialization: descriptor.serialization,
        }
    }

    /// The component id.
    #[inline]
    pub fn id(&self) -> Id {
        self.id
    }

    /// The registration name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Alignment in bytes.
    #[inline]
    pub fn align(&self) -> usize {
        self.align
    }

    /// Check if this is a zero-sized component (a tag).
    #[inline]
    pub fn is_zero_sized(&self) -> bool {
        self.size == 0
    }

    /// Whether all-zero bytes are a valid value. Only zeroable components expose their raw
    /// bytes.
    #[inline]
    pub fn is_zeroable(&self) -> bool {
        self.zeroable
    }

    /// The type-erased lifecycle operations.
    #[inline]
    pub fn ops(&self) -> &dyn ComponentOps {
        self.ops.as_ref()
    }

    /// The Rust type the component was registered from, if any.
    #[inline]
    pub fn type_id(&self) -> Option<TypeId> {
        self.type_id
    }

    /// The serialization descriptor supplied at registration, if any.
    #[inline]
    pub fn serialization(&self) -> Option<&dyn Any> {
        self.serialization.as_deref()
    }

    /// Verify that `T` is the Rust type this component was registered from.
    pub fn check_type<T: 'static>(&self) -> Result<()> {
        if self.type_id == Some(TypeId::of::<T>()) {
            Ok(())
        } else {
            Err(Error::TypeMismatch {
                component: self.id,
                expected: self.type_name.unwrap_or(&self.name).to_string(),
                actual: std::any::type_name::<T>(),
            })
        }
    }

    /// Verify that the component may be read and written as raw bytes.
    ///
    /// Typed components can hold uninitialized padding, so only zeroable components pass.
    pub fn check_bytes(&self) -> Result<()> {
        if self.zeroable {
            Ok(())
        } else {
            Err(Error::TypeMismatch {
                component: self.id,
                expected: self.type_name.unwrap_or(&self.name).to_string(),
                actual: "[u8]",
            })
        }
    }
}

impl fmt::Debug for Info {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Info")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("size", &self.size)
            .field("align", &self.align)
            .finish_non_exhaustive()
    }
}
