// src/store/memory.rs
use anyhow::Result;
use std::sync::{PoisonError, RwLock};

use super::DocumentStore;

/// In-memory document slot for tests and ephemeral runs.
#[derive(Debug)]
pub struct MemoryStore<T> {
    slot: RwLock<Option<T>>,
}

impl<T> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }

    pub fn with(doc: T) -> Self {
        Self {
            slot: RwLock::new(Some(doc)),
        }
    }
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DocumentStore<T> for MemoryStore<T>
where
    T: Clone + Send + Sync,
{
    fn load(&self) -> Result<Option<T>> {
        let g = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        Ok(g.clone())
    }

    fn save(&self, doc: &T) -> Result<()> {
        let mut g = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        *g = Some(doc.clone());
        Ok(())
    }
}
