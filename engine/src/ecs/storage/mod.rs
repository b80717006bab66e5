//! Chunked, row-packed storage for the entities of one archetype.
//!
//! Every archetype owns a [`ChunkedStorage`]. Its entities are stored as fixed-size rows (the
//! archetype's components laid out back to back) inside fixed-size [`Chunk`]s:
//!
//! ```text
//!  ChunkedStorage (row_size = 24, chunk_size = 4096 → 170 rows per chunk)
//!  ┌──────────────────────────────┐ ┌──────────────────────────────┐
//!  │ chunk 0                      │ │ chunk 1                      │
//!  │ [row 0][row 1] ... [row 169] │ │ [row 170][row 171] ...       │
//!  └──────────────────────────────┘ └──────────────────────────────┘
//!        row r lives in chunk r / 170 at byte (r % 170) * 24
//! ```
//!
//! Rows stay dense: removing a row copies the last row into the hole and shrinks the storage by
//! one, reporting which row moved so the owner can fix up its bookkeeping. A trailing chunk that
//! becomes empty goes back to the shared [`ChunkPool`].
//!
//! This layer has no notion of component types. Constructing, moving and destroying the values
//! inside a row is the caller's job; the storage only hands out row memory and moves bytes.

mod chunk;
mod chunked;

pub use chunk::{CHUNK_ALIGN, Chunk, ChunkPool};
pub use chunked::ChunkedStorage;
