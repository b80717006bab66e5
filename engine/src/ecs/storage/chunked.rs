use std::ptr::{self, NonNull};

use crate::ecs::{
    entity::Entity,
    storage::{Chunk, ChunkPool},
};

/// Dense row storage for one archetype.
///
/// Rows are `row_size` bytes, packed `entities_per_chunk` to a chunk, and always occupy the
/// indices `[0, len)`. The owning entity of every row is kept alongside so a row can be mapped
/// back to its stable handle.
#[derive(Debug)]
pub struct ChunkedStorage {
    /// Chunks in row order.
    chunks: Vec<Chunk>,

    /// The owning entity of each row.
    entities: Vec<Entity>,

    /// Bytes of component data per row.
    row_size: usize,

    /// Distance between rows. Equals `row_size` except for empty rows, which still take a byte.
    stride: usize,

    /// Size of pooled chunks.
    chunk_size: usize,

    /// Rows per chunk.
    entities_per_chunk: usize,
}

impl ChunkedStorage {
    /// Create empty storage for rows of `row_size` bytes in chunks of `chunk_size` bytes.
    pub fn new(row_size: usize, chunk_size: usize) -> Self {
        let mut storage = Self {
            chunks: Vec::new(),
            entities: Vec::new(),
            row_size: 0,
            stride: 1,
            chunk_size,
            entities_per_chunk: chunk_size,
        };
        storage.set_row_size(row_size);
        storage
    }

    /// Change the row layout.
    ///
    /// # Panics
    ///
    /// Panics if the storage holds any rows.
    pub fn set_row_size(&mut self, row_size: usize) {
        assert!(
            self.entities.is_empty(),
            "row size changed on storage holding {} rows",
            self.entities.len()
        );
        self.row_size = row_size;
        self.stride = row_size.max(1);
        self.entities_per_chunk = (self.chunk_size / self.stride).max(1);
    }

    /// Rows too large for a pooled chunk get a dedicated chunk each.
    #[inline]
    fn is_oversized(&self) -> bool {
        self.stride > self.chunk_size
    }

    /// Append a row owned by `owner` and return its index. The row's bytes are unspecified until
    /// the caller initializes them.
    pub fn add_row(&mut self, owner: Entity, pool: &mut ChunkPool) -> usize {
        let row = self.entities.len();
        if row % self.entities_per_chunk == 0 {
            let chunk = if self.is_oversized() {
                Chunk::new(self.stride)
            } else {
                debug_assert_eq!(
                    pool.chunk_size(),
                    self.chunk_size,
                    "pool hands out chunks of a different size"
                );
                pool.acquire()
            };
            self.chunks.push(chunk);
        }
        self.entities.push(owner);
        row
    }

    /// Pointer to the start of a row.
    #[inline]
    pub(crate) fn row_ptr(&self, row: usize) -> NonNull<u8> {
        debug_assert!(row < self.entities.len(), "row {row} out of bounds");
        let chunk = &self.chunks[row / self.entities_per_chunk];
        chunk.ptr_at((row % self.entities_per_chunk) * self.stride)
    }

    /// Borrow the bytes of a row. Only sound when every component in the row has no padding.
    ///
    /// # Panics
    ///
    /// Panics if `row` is out of bounds.
    pub(crate) fn row_bytes(&self, row: usize) -> &[u8] {
        assert!(row < self.entities.len(), "row {row} out of bounds");
        let chunk = &self.chunks[row / self.entities_per_chunk];
        chunk.bytes((row % self.entities_per_chunk) * self.stride, self.row_size)
    }

    /// Mutably borrow the bytes of a row.
    ///
    /// # Panics
    ///
    /// Panics if `row` is out of bounds.
    pub(crate) fn row_bytes_mut(&mut self, row: usize) -> &mut [u8] {
        assert!(row < self.entities.len(), "row {row} out of bounds");
        let offset = (row % self.entities_per_chunk) * self.stride;
        let chunk = &mut self.chunks[row / self.entities_per_chunk];
        chunk.bytes_mut(offset, self.row_size)
    }

    /// Swap-remove a row.
    ///
    /// The values in the removed row must already be destroyed or moved out. If the row was not
    /// the last one, the last row's bytes are copied into it and the index it moved from is
    /// returned. An emptied trailing chunk goes back to the pool.
    ///
    /// # Panics
    ///
    /// Panics if `row` is out of bounds.
    pub fn remove_row(&mut self, row: usize, pool: &mut ChunkPool) -> Option<usize> {
        assert!(row < self.entities.len(), "row {row} out of bounds");
        let last = self.entities.len() - 1;

        let moved = if row != last {
            let src = self.row_ptr(last);
            let dst = self.row_ptr(row);
            unsafe { ptr::copy_nonoverlapping(src.as_ptr(), dst.as_ptr(), self.row_size) };
            self.entities.swap_remove(row);
            Some(last)
        } else {
            self.entities.pop();
            None
        };

        if self.entities.len() % self.entities_per_chunk == 0
            && let Some(chunk) = self.chunks.pop()
        {
            if !self.is_oversized() {
                pool.release(chunk);
            }
        }
        moved
    }

    /// The entity stored in `row`.
    #[inline]
    pub fn entity_at(&self, row: usize) -> Option<Entity> {
        self.entities.get(row).copied()
    }

    /// Owners of all rows in row order.
    #[inline]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Number of rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns true if the storage holds no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Number of chunks currently held.
    #[inline]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Rows per chunk.
    #[inline]
    pub fn entities_per_chunk(&self) -> usize {
        self.entities_per_chunk
    }

    /// Bytes of component data per row.
    #[inline]
    pub fn row_size(&self) -> usize {
        self.row_size
    }

    /// Return every chunk to the pool and forget all rows. Row contents must already be
    /// destroyed.
    pub fn clear(&mut self, pool: &mut ChunkPool) {
        self.entities.clear();
        let oversized = self.is_oversized();
        for chunk in self.chunks.drain(..) {
            if !oversized {
                pool.release(chunk);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::entity::Allocator;

    fn write_row(storage: &mut ChunkedStorage, row: usize, value: u8) {
        storage.row_bytes_mut(row).fill(value);
    }

    #[test]
    fn rows_fill_chunks() {
        // Given
        let mut pool = ChunkPool::new(64, 8);
        let mut allocator = Allocator::new();
        let mut storage = ChunkedStorage::new(16, 64);

        // When
        for i in 0..5 {
            let row = storage.add_row(allocator.create_id(), &mut pool);
            assert_eq!(row, i);
            write_row(&mut storage, row, i as u8);
        }

        // Then - 4 rows per chunk
        assert_eq!(storage.entities_per_chunk(), 4);
        assert_eq!(storage.chunk_count(), 2);
        assert_eq!(storage.len(), 5);
        for i in 0..5 {
            assert!(storage.row_bytes(i).iter().all(|b| *b == i as u8));
            assert_eq!(storage.entity_at(i).unwrap().index(), i);
        }
        assert_eq!(storage.entity_at(5), None);
    }

    #[test]
    fn swap_remove_reports_moved_row() {
        // Given
        let mut pool = ChunkPool::new(64, 8);
        let mut allocator = Allocator::new();
        let mut storage = ChunkedStorage::new(8, 64);
        let owners: Vec<_> = (0..3).map(|_| allocator.create_id()).collect();
        for (i, owner) in owners.iter().enumerate() {
            let row = storage.add_row(*owner, &mut pool);
            write_row(&mut storage, row, 10 + i as u8);
        }

        // When
        let moved = storage.remove_row(0, &mut pool);

        // Then - last row now lives at 0
        assert_eq!(moved, Some(2));
        assert_eq!(storage.len(), 2);
        assert!(storage.row_bytes(0).iter().all(|b| *b == 12));
        assert_eq!(storage.entity_at(0), Some(owners[2]));
        assert_eq!(storage.entity_at(1), Some(owners[1]));

        // When - removing the last row moves nothing
        let moved = storage.remove_row(1, &mut pool);

        // Then
        assert_eq!(moved, None);
        assert_eq!(storage.entities(), &[owners[2]]);
    }

    #[test]
    fn empty_trailing_chunk_returns_to_pool() {
        // Given
        let mut pool = ChunkPool::new(64, 8);
        let mut allocator = Allocator::new();
        let mut storage = ChunkedStorage::new(32, 64);
        for _ in 0..3 {
            storage.add_row(allocator.create_id(), &mut pool);
        }
        assert_eq!(storage.chunk_count(), 2);

        // When
        storage.remove_row(0, &mut pool);

        // Then
        assert_eq!(storage.chunk_count(), 1);
        assert_eq!(pool.len(), 1);

        // When - the next row reuses the pooled chunk
        storage.add_row(allocator.create_id(), &mut pool);
        storage.add_row(allocator.create_id(), &mut pool);

        // Then
        assert_eq!(pool.allocated(), 2);
        assert!(pool.is_empty());
    }

    #[test]
    fn zero_sized_rows() {
        // Given
        let mut pool = ChunkPool::new(64, 8);
        let mut allocator = Allocator::new();
        let mut storage = ChunkedStorage::new(0, 64);

        // When
        for _ in 0..100 {
            storage.add_row(allocator.create_id(), &mut pool);
        }

        // Then
        assert_eq!(storage.len(), 100);
        assert_eq!(storage.entities_per_chunk(), 64);
        assert_eq!(storage.chunk_count(), 2);
        assert!(storage.row_bytes(99).is_empty());
    }

    #[test]
    fn oversized_rows_get_dedicated_chunks() {
        // Given
        let mut pool = ChunkPool::new(64, 8);
        let mut allocator = Allocator::new();
        let mut storage = ChunkedStorage::new(100, 64);

        // When
        storage.add_row(allocator.create_id(), &mut pool);
        storage.add_row(allocator.create_id(), &mut pool);
        write_row(&mut storage, 1, 7);
        storage.remove_row(0, &mut pool);

        // Then
        assert_eq!(storage.entities_per_chunk(), 1);
        assert_eq!(storage.chunk_count(), 1);
        assert_eq!(pool.allocated(), 0);
        assert!(pool.is_empty());
        assert_eq!(storage.row_bytes(0).len(), 100);
        assert!(storage.row_bytes(0).iter().all(|b| *b == 7));
    }

    #[test]
    #[should_panic]
    fn set_row_size_on_non_empty_storage_panics() {
        // Given
        let mut pool = ChunkPool::new(64, 8);
        let mut storage = ChunkedStorage::new(4, 64);
        storage.add_row(Allocator::new().create_id(), &mut pool);

        // When
        storage.set_row_size(8);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "pool hands out chunks of a different size")]
    fn mismatched_pool_panics() {
        // Given
        let mut pool = ChunkPool::new(32, 8);
        let mut storage = ChunkedStorage::new(16, 64);

        // When
        storage.add_row(Allocator::new().create_id(), &mut pool);
    }

    #[test]
    fn oversized_rows_ignore_pool_size() {
        // Given
        let mut pool = ChunkPool::new(32, 8);
        let mut storage = ChunkedStorage::new(100, 64);

        // When
        storage.add_row(Allocator::new().create_id(), &mut pool);

        // Then
        assert_eq!(storage.chunk_count(), 1);
        assert_eq!(pool.allocated(), 0);
    }

    #[test]
    #[should_panic]
    fn row_out_of_bounds_panics() {
        let storage = ChunkedStorage::new(4, 64);
        storage.row_bytes(0);
    }

    #[test]
    fn clear_releases_chunks() {
        // Given
        let mut pool = ChunkPool::new(64, 8);
        let mut allocator = Allocator::new();
        let mut storage = ChunkedStorage::new(16, 64);
        for _ in 0..9 {
            storage.add_row(allocator.create_id(), &mut pool);
        }

        // When
        storage.clear(&mut pool);

        // Then
        assert!(storage.is_empty());
        assert_eq!(storage.chunk_count(), 0);
        assert_eq!(pool.len(), 3);
    }
}
