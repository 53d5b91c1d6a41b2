//! Short ID system for easier entity selection
//!
//! Session-local numeric aliases like `@1`, `@2` that map to full entity IDs.
//! They are regenerated every time part types or lots are listed, so `@N`
//! always refers to the most recent listing.

use std::collections::HashMap;
use std::fs;

use crate::core::identity::EntityId;
use crate::core::project::Project;
use crate::core::store::StoreError;

/// Index file name within `.ilt/`
const INDEX_FILE: &str = "shortids.json";

/// A mapping of short IDs (@N) to full entity IDs
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct ShortIdIndex {
    /// Maps short number to full entity ID string
    entries: HashMap<u32, String>,
    /// Maps full entity ID to short number (reverse lookup)
    #[serde(skip)]
    reverse: HashMap<String, u32>,
    /// Next available short ID
    next_id: u32,
}

impl ShortIdIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            reverse: HashMap::new(),
            next_id: 1,
        }
    }

    /// Load the index from a project, or create empty if missing or unreadable
    pub fn load(project: &Project) -> Self {
        let path = project.ilt_dir().join(INDEX_FILE);
        let Ok(content) = fs::read_to_string(&path) else {
            return Self::new();
        };
        match serde_json::from_str::<ShortIdIndex>(&content) {
            Ok(mut index) => {
                index.reverse = index.entries.iter().map(|(k, v)| (v.clone(), *k)).collect();
                index
            }
            Err(e) => {
                tracing::debug!(error = %e, "discarding unreadable short id index");
                Self::new()
            }
        }
    }

    /// Save the index to a project
    pub fn save(&self, project: &Project) -> Result<(), StoreError> {
        let path = project.ilt_dir().join(INDEX_FILE);
        let content = serde_json::to_string_pretty(self)?;
        fs::write(&path, content).map_err(|e| StoreError::io(&path, e))
    }

    /// Clear and rebuild the index with new entity IDs
    pub fn rebuild<'a>(&mut self, entity_ids: impl IntoIterator<Item = &'a EntityId>) {
        self.entries.clear();
        self.reverse.clear();
        self.next_id = 1;

        for id in entity_ids {
            self.add(id.to_string());
        }
    }

    /// Add an entity ID and return its short ID
    pub fn add(&mut self, entity_id: String) -> u32 {
        if let Some(&short_id) = self.reverse.get(&entity_id) {
            return short_id;
        }

        let short_id = self.next_id;
        self.next_id += 1;
        self.entries.insert(short_id, entity_id.clone());
        self.reverse.insert(entity_id, short_id);
        short_id
    }

    /// Resolve an `@N` reference to a full entity ID.
    ///
    /// Returns `None` for unknown numbers and for anything that is not an
    /// `@N` reference.
    pub fn resolve(&self, reference: &str) -> Option<&str> {
        let n: u32 = reference.strip_prefix('@')?.parse().ok()?;
        self.entries.get(&n).map(String::as_str)
    }

    /// Get the short ID for a full entity ID
    pub fn get_short_id(&self, entity_id: &EntityId) -> Option<u32> {
        self.reverse.get(&entity_id.to_string()).copied()
    }

    /// Short ID as displayed in listings (`@N`), blank when unknown
    pub fn label(&self, entity_id: &EntityId) -> String {
        self.get_short_id(entity_id)
            .map(|n| format!("@{}", n))
            .unwrap_or_default()
    }

    /// Number of entries in the index
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the index is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
