// src/store/mod.rs
//! Persistence seam for the flat JSON documents (topics, sources, cache).
//!
//! The pipeline only sees `load()`/`save()`; whether a document lives in a
//! file or in memory is decided at wiring time.

pub mod file;
pub mod memory;

use anyhow::Result;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

/// Whole-document storage. `load` returns `Ok(None)` when nothing has been
/// stored yet; `save` replaces the document as a unit.
pub trait DocumentStore<T>: Send + Sync {
    fn load(&self) -> Result<Option<T>>;
    fn save(&self, doc: &T) -> Result<()>;
}
