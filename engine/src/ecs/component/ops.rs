use std::{marker::PhantomData, ptr::NonNull};

/// Type-erased lifecycle operations of a component.
///
/// The store only ever calls these through raw row pointers; it never learns the concrete type.
///
/// # Safety
///
/// Every pointer passed in must be valid for the component's registered size and aligned to its
/// registered alignment. `dst` of `default_construct`, `move_construct` and `copy_construct` is
/// treated as uninitialized. After `move_construct` the source bytes are logically moved-from
/// and must not be destroyed.
pub trait ComponentOps {
    /// Write a default value into `dst`.
    unsafe fn default_construct(&self, dst: NonNull<u8>);

    /// Drop the value at `dst` in place.
    unsafe fn destroy(&self, dst: NonNull<u8>);

    /// Move the value at `src` into `dst`.
    unsafe fn move_construct(&self, dst: NonNull<u8>, src: NonNull<u8>);

    /// Write a clone of the value at `src` into `dst`.
    unsafe fn copy_construct(&self, dst: NonNull<u8>, src: NonNull<u8>);
}

/// [`ComponentOps`] for a concrete Rust type.
pub struct TypedOps<T>(PhantomData<fn() -> T>);

impl<T> TypedOps<T> {
    /// Construct the operations for `T`.
    #[inline]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for TypedOps<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Default + Clone + 'static> ComponentOps for TypedOps<T> {
    #[inline]
    unsafe fn default_construct(&self, dst: NonNull<u8>) {
        unsafe { dst.cast::<T>().write(T::default()) }
    }

    #[inline]
    unsafe fn destroy(&self, dst: NonNull<u8>) {
        if std::mem::needs_drop::<T>() {
            unsafe { dst.cast::<T>().drop_in_place() }
        }
    }

    #[inline]
    unsafe fn move_construct(&self, dst: NonNull<u8>, src: NonNull<u8>) {
        unsafe { dst.cast::<T>().write(src.cast::<T>().read()) }
    }

    #[inline]
    unsafe fn copy_construct(&self, dst: NonNull<u8>, src: NonNull<u8>) {
        unsafe { dst.cast::<T>().write(src.cast::<T>().as_ref().clone()) }
    }
}

/// [`ComponentOps`] for plain bytes: zero default, no-op destroy, and byte copies for move and
/// copy.
#[derive(Debug, Clone, Copy)]
pub struct PlainOps {
    size: usize,
}

impl PlainOps {
    /// Construct plain operations over `size` bytes.
    #[inline]
    pub const fn new(size: usize) -> Self {
        Self { size }
    }
}

impl ComponentOps for PlainOps {
    unsafe fn default_construct(&self, dst: NonNull<u8>) {
        unsafe { dst.as_ptr().write_bytes(0, self.size) }
    }

    unsafe fn destroy(&self, _dst: NonNull<u8>) {}

    unsafe fn move_construct(&self, dst: NonNull<u8>, src: NonNull<u8>) {
        unsafe { std::ptr::copy_nonoverlapping(src.as_ptr(), dst.as_ptr(), self.size) }
    }

    unsafe fn copy_construct(&self, dst: NonNull<u8>, src: NonNull<u8>) {
        unsafe { std::ptr::copy_nonoverlapping(src.as_ptr(), dst.as_ptr(), self.size) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{mem::MaybeUninit, rc::Rc};

    #[test]
    fn typed_ops_lifecycle() {
        // Given
        let ops = TypedOps::<Rc<u32>>::new();
        let tracker = Rc::new(7u32);
        let mut a = MaybeUninit::new(tracker.clone());
        let mut b = MaybeUninit::<Rc<u32>>::uninit();
        let mut c = MaybeUninit::<Rc<u32>>::uninit();
        let pa = NonNull::new(a.as_mut_ptr() as *mut u8).unwrap();
        let pb = NonNull::new(b.as_mut_ptr() as *mut u8).unwrap();
        let pc = NonNull::new(c.as_mut_ptr() as *mut u8).unwrap();

        // When - Copy a into b, then move b into c
        unsafe {
            ops.copy_construct(pb, pa);
            ops.move_construct(pc, pb);
        }

        // Then - One clone exists beyond the original pair
        assert_eq!(Rc::strong_count(&tracker), 3);

        // When
        unsafe {
            ops.destroy(pa);
            ops.destroy(pc);
        }

        // Then
        assert_eq!(Rc::strong_count(&tracker), 1);
    }

    #[test]
    fn typed_ops_default() {
        // Given
        let ops = TypedOps::<(u32, f32)>::new();
        let mut slot = MaybeUninit::<(u32, f32)>::uninit();

        // When
        unsafe { ops.default_construct(NonNull::new(slot.as_mut_ptr() as *mut u8).unwrap()) };

        // Then
        assert_eq!(unsafe { slot.assume_init() }, (0, 0.0));
    }

    #[test]
    fn plain_ops_copy_bytes() {
        // Given
        let ops = PlainOps::new(4);
        let mut src = [1u8, 2, 3, 4];
        let mut dst = [9u8; 4];
        let psrc = NonNull::new(src.as_mut_ptr()).unwrap();
        let pdst = NonNull::new(dst.as_mut_ptr()).unwrap();

        // When
        unsafe { ops.copy_construct(pdst, psrc) };

        // Then
        assert_eq!(dst, [1, 2, 3, 4]);

        // When
        unsafe { ops.default_construct(pdst) };

        // Then
        assert_eq!(dst, [0; 4]);
    }
}
