#![forbid(unsafe_code)]

use super::{build_tag_cache, mutate_frontmatter};
use crate::{StoreError, StructuredTagCache, VaultAccess};
use rt_core::InlineTagMutator;
use serde_yaml::Mapping;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Vault kept entirely in memory. Paths are used verbatim as keys.
#[derive(Debug, Default)]
pub struct MemoryVault {
    documents: Mutex<BTreeMap<String, String>>,
    scanner: Mutex<InlineTagMutator>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_documents<P, T>(documents: impl IntoIterator<Item = (P, T)>) -> Self
    where
        P: Into<String>,
        T: Into<String>,
    {
        let vault = Self::new();
        {
            let mut map = vault.documents();
            for (path, text) in documents {
                map.insert(path.into(), text.into());
            }
        }
        vault
    }

    /// Creates or overwrites a document.
    pub fn insert(&self, path: impl Into<String>, text: impl Into<String>) {
        self.documents().insert(path.into(), text.into());
    }

    pub fn remove(&self, path: &str) -> Option<String> {
        self.documents().remove(path)
    }

    pub fn get(&self, path: &str) -> Option<String> {
        self.documents().get(path).cloned()
    }

    fn documents(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.documents.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl VaultAccess for MemoryVault {
    fn read(&self, path: &str) -> Result<String, StoreError> {
        self.get(path)
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }

    fn modify(&self, path: &str, text: &str) -> Result<(), StoreError> {
        let mut documents = self.documents();
        let Some(slot) = documents.get_mut(path) else {
            return Err(StoreError::NotFound(path.to_string()));
        };
        *slot = text.to_string();
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        self.documents().contains_key(path)
    }

    fn list_documents(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.documents().keys().cloned().collect())
    }

    fn process_frontmatter(
        &self,
        path: &str,
        mutate: &mut dyn FnMut(&mut Mapping) -> bool,
    ) -> Result<bool, StoreError> {
        let mut documents = self.documents();
        let Some(slot) = documents.get_mut(path) else {
            return Err(StoreError::NotFound(path.to_string()));
        };
        let Some(next) = mutate_frontmatter(path, slot, mutate)? else {
            return Ok(false);
        };
        *slot = next;
        Ok(true)
    }

    fn tag_cache(&self, path: &str) -> Result<Option<StructuredTagCache>, StoreError> {
        let Some(text) = self.get(path) else {
            return Ok(None);
        };
        let mut scanner = self.scanner.lock().unwrap_or_else(PoisonError::into_inner);
        build_tag_cache(path, &text, &mut scanner).map(Some)
    }
}
