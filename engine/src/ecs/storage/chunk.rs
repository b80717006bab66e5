use std::{
    alloc::{self, Layout},
    ptr::NonNull,
};

use log::trace;

/// Alignment of every chunk allocation, and therefore the largest component alignment the store
/// supports.
pub const CHUNK_ALIGN: usize = 64;

/// A fixed-size, zero-filled, 64-byte aligned block of memory.
pub struct Chunk {
    /// Start of the allocation.
    ptr: NonNull<u8>,

    /// Size of the allocation in bytes.
    size: usize,
}

impl Chunk {
    /// Allocate a zeroed chunk of `size` bytes.
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        let layout = Self::layout(size);
        let ptr = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(ptr).unwrap_or_else(|| alloc::handle_alloc_error(layout));
        Self { ptr, size }
    }

    fn layout(size: usize) -> Layout {
        Layout::from_size_align(size, CHUNK_ALIGN).expect("chunk layout overflow")
    }

    /// Size of the chunk in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Pointer to the byte at `offset`.
    #[inline]
    pub fn ptr_at(&self, offset: usize) -> NonNull<u8> {
        debug_assert!(offset <= self.size, "offset {offset} beyond chunk of {}", self.size);
        unsafe { self.ptr.add(offset) }
    }

    /// Borrow `len` bytes starting at `offset`.
    #[inline]
    pub fn bytes(&self, offset: usize, len: usize) -> &[u8] {
        assert!(offset + len <= self.size);
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr().add(offset), len) }
    }

    /// Mutably borrow `len` bytes starting at `offset`.
    #[inline]
    pub fn bytes_mut(&mut self, offset: usize, len: usize) -> &mut [u8] {
        assert!(offset + len <= self.size);
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr().add(offset), len) }
    }
}

impl Drop for Chunk {
    fn drop(&mut self) {
        unsafe { alloc::dealloc(self.ptr.as_ptr(), Self::layout(self.size)) }
    }
}

impl std::fmt::Debug for Chunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chunk").field("size", &self.size).finish()
    }
}

/// Free list of standard-size chunks shared by every archetype's storage.
///
/// At most `limit` free chunks are retained; any chunk released beyond that (or of a different
/// size) is freed.
#[derive(Debug)]
pub struct ChunkPool {
    free: Vec<Chunk>,
    chunk_size: usize,
    limit: usize,
    allocated: usize,
}

impl ChunkPool {
    /// Create an empty pool of `chunk_size` chunks retaining at most `limit` free ones.
    pub fn new(chunk_size: usize, limit: usize) -> Self {
        Self {
            free: Vec::new(),
            chunk_size,
            limit,
            allocated: 0,
        }
    }

    /// Take a chunk from the free list, or allocate a fresh one.
    pub fn acquire(&mut self) -> Chunk {
        match self.free.pop() {
            Some(chunk) => {
                trace!("reusing pooled chunk ({} left)", self.free.len());
                chunk
            }
            None => {
                self.allocated += 1;
                trace!("allocating chunk #{} of {} bytes", self.allocated, self.chunk_size);
                Chunk::new(self.chunk_size)
            }
        }
    }

    /// Return a chunk to the pool.
    pub fn release(&mut self, chunk: Chunk) {
        if chunk.size() != self.chunk_size || self.free.len() >= self.limit {
            trace!("freeing chunk of {} bytes", chunk.size());
            return;
        }
        self.free.push(chunk);
    }

    /// Size of the chunks handed out by this pool.
    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Number of free chunks currently retained.
    #[inline]
    pub fn len(&self) -> usize {
        self.free.len()
    }

    /// Returns true if no free chunks are retained.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.free.is_empty()
    }

    /// Total number of chunks this pool has ever allocated.
    #[inline]
    pub fn allocated(&self) -> usize {
        self.allocated
    }
}
