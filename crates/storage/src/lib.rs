#![forbid(unsafe_code)]

mod metadata;
mod vault;

pub use metadata::*;
pub use vault::*;

use rt_core::TagOccurrence;
use serde_yaml::Mapping;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("document not found: {0}")]
    NotFound(String),
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("frontmatter in {path}: {source}")]
    Frontmatter {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// What the vault knows about the tags in one document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StructuredTagCache {
    /// Inline tags in document order, offsets into the full text.
    pub tags: Vec<TagOccurrence>,
    pub frontmatter: Option<Mapping>,
}

/// Document storage as seen by the tag engine. Paths are vault-relative and
/// `/`-separated.
pub trait VaultAccess {
    fn read(&self, path: &str) -> Result<String, StoreError>;

    /// Replaces the content of an existing document.
    fn modify(&self, path: &str, text: &str) -> Result<(), StoreError>;

    fn exists(&self, path: &str) -> bool;

    fn list_documents(&self) -> Result<Vec<String>, StoreError>;

    /// Reads the frontmatter, lets `mutate` edit it and writes the document
    /// back in one step. Nothing is written unless `mutate` returns true.
    fn process_frontmatter(
        &self,
        path: &str,
        mutate: &mut dyn FnMut(&mut Mapping) -> bool,
    ) -> Result<bool, StoreError>;

    /// `None` when the document does not exist.
    fn tag_cache(&self, path: &str) -> Result<Option<StructuredTagCache>, StoreError>;
}

/// Records keyed by tag path that have to follow a rename or delete.
pub trait MetadataSideEffects {
    fn handle_tag_rename(
        &mut self,
        old_path: &str,
        new_path: &str,
        preserve_destination: bool,
    ) -> Result<(), StoreError>;

    fn handle_tag_delete(&mut self, path: &str) -> Result<(), StoreError>;
}

pub(crate) fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        .min(i64::MAX as u128) as i64
}
