//! Shared-code registry
//!
//! Code blocks registered under an identifier can be injected into any test.
//! Injection runs the block against the sandbox of the closest isolated test
//! on the live test stack; the engine does the lookup and the registry only
//! stores the blocks.

use rustc_hash::FxHashMap as HashMap;

use crate::error::{Error, Result};
use crate::suite::Body;

/// Write-once mapping from identifier to code block.
#[derive(Default)]
pub struct SharedCode {
    blocks: HashMap<String, Body>,
}

impl SharedCode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `block` under `id`; an identifier can only be used once.
    pub fn register(&mut self, id: impl Into<String>, block: Body) -> Result<()> {
        let id = id.into();
        if self.blocks.contains_key(&id) {
            return Err(Error::duplicate_share(id));
        }
        self.blocks.insert(id, block);
        Ok(())
    }

    /// The block shared under `id`.
    pub fn get(&self, id: &str) -> Result<Body> {
        self.blocks
            .get(id)
            .cloned()
            .ok_or_else(|| Error::missing_share(id))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.blocks.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Identifiers in sorted order.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.blocks.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

impl std::fmt::Debug for SharedCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedCode").field("ids", &self.ids()).finish()
    }
}
