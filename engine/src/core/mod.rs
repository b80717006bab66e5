//! Host-facing plumbing that is not part of the entity store itself.

pub mod log;
