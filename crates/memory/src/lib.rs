//! Memory-layer adapters for recall.
//!
//! The real stores (relational graph, audit log, embedding index, session
//! and project records) live outside this workspace. The pipeline only needs
//! each of them to answer `query(text)`; the adapters here do exactly that
//! over simple in-process and JSONL-file data, and the registry maps every
//! [`recall_core::MemoryLayer`] to the source that answers for it.

pub mod file_backend;
pub mod in_memory;
pub mod matching;
pub mod registry;

pub use file_backend::JsonlLayer;
pub use in_memory::InMemoryLayer;
pub use registry::LayerRegistry;
