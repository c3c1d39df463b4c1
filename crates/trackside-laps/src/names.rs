//! Tag id to rider name resolution.

use std::collections::{BTreeMap, HashMap};

/// Resolves display names for tags. A miss is not an error; the engine shows
/// the raw tag id instead.
///
/// The engine calls this once per new rider while holding its rider table
/// lock, so every reader waits on it. Implementations must answer from memory
/// and must not block or perform I/O. Load slow sources ahead of time into a
/// [`NameTable`].
pub trait NameLookup: Send + Sync {
    fn display_name(&self, tag_id: &str) -> Option<String>;
}

/// In-memory name table keyed by lowercase tag id.
#[derive(Debug, Clone, Default)]
pub struct NameTable {
    names: HashMap<String, String>,
}

impl NameTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the `riders` section of the configuration.
    pub fn from_config(riders: &BTreeMap<String, String>) -> Self {
        let mut table = Self::new();
        for (tag_id, name) in riders {
            table.insert(tag_id, name.clone());
        }
        table
    }

    pub fn insert(&mut self, tag_id: &str, name: impl Into<String>) {
        self.names.insert(normalize(tag_id), name.into());
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl NameLookup for NameTable {
    fn display_name(&self, tag_id: &str) -> Option<String> {
        self.names.get(&normalize(tag_id)).cloned()
    }
}

fn normalize(tag_id: &str) -> String {
    tag_id.trim().to_ascii_lowercase()
}
