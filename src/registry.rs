//src/registry.rs

use ahash::AHashMap;

use crate::errors::{Error, Result};

/// The caller's name for a read, as it must appear again on output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalName {
    pub id: String,
    pub comment: Option<String>,
}

/// Bidirectional map between dense read indices and original read names.
///
/// Indices are handed out in ingestion order starting at 0. The registry is
/// only grown during ingestion; afterwards it is consulted read-only.
#[derive(Debug, Default)]
pub struct IdentityRegistry {
    names: Vec<OriginalName>,
    /// original id -> index, used to refuse duplicates
    index_of: AHashMap<String, usize>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns the next index to `original_id`. A name seen before is an error,
    /// not something to silently deduplicate.
    pub fn register(&mut self, original_id: &str, comment: Option<&str>) -> Result<usize> {
        if self.index_of.contains_key(original_id) {
            return Err(Error::DuplicateReadName(original_id.to_string()));
        }
        let index = self.names.len();
        self.index_of.insert(original_id.to_string(), index);
        self.names.push(OriginalName {
            id: original_id.to_string(),
            comment: comment.map(str::to_string),
        });
        Ok(index)
    }

    /// Every index in scrubbed output must come from ingestion, so a miss here
    /// is fatal.
    pub fn resolve(&self, index: usize) -> Result<&OriginalName> {
        self.names.get(index).ok_or(Error::UnknownReadIndex(index))
    }

    pub fn index_of(&self, original_id: &str) -> Option<usize> {
        self.index_of.get(original_id).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
