//! Document store interface and in-memory reference implementation
//!
//! The repository core treats the backing document store as an external
//! collaborator: everything above this crate talks to the [`DocumentStore`]
//! trait only. [`MemoryStore`] is the reference implementation — it executes
//! compiled stage lists against named collections, keeps named indexes with
//! partial filters, and preserves insertion order, which is what the rest of
//! the system relies on for stable pagination.

pub mod eval;
pub mod memory;
pub mod traits;

pub use memory::MemoryStore;
pub use traits::DocumentStore;
