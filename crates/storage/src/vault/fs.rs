#![forbid(unsafe_code)]

use super::{build_tag_cache, mutate_frontmatter};
use crate::{StoreError, StructuredTagCache, VaultAccess};
use rt_core::InlineTagMutator;
use serde::{Deserialize, Serialize};
use serde_yaml::Mapping;
use std::io::Write as _;
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, PoisonError};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// File extensions (without the dot) treated as documents.
    pub extensions: Vec<String>,
    /// Directory names skipped while walking the vault.
    pub exclude_dirs: Vec<String>,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["md".to_string()],
            exclude_dirs: vec![
                ".obsidian".to_string(),
                ".trash".to_string(),
                ".git".to_string(),
                ".retag".to_string(),
            ],
        }
    }
}

/// A directory of markdown documents.
#[derive(Debug)]
pub struct FsVault {
    root: PathBuf,
    config: VaultConfig,
    scanner: Mutex<InlineTagMutator>,
}

impl FsVault {
    pub fn open(root: impl AsRef<Path>, config: VaultConfig) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(StoreError::InvalidPath(format!(
                "vault root {} is not a directory",
                root.display()
            )));
        }
        Ok(Self {
            root,
            config,
            scanner: Mutex::new(InlineTagMutator::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(path);
        let safe = !path.trim().is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !safe {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }

    fn read_existing(&self, path: &str) -> Result<(PathBuf, String), StoreError> {
        let abs = self.resolve(path)?;
        match std::fs::read_to_string(&abs) {
            Ok(text) => Ok((abs, text)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(path.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn is_document(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.config.extensions.iter().any(|e| e == ext))
    }

    fn walker(&self) -> ignore::Walk {
        let mut builder = ignore::WalkBuilder::new(&self.root);
        builder
            .hidden(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .parents(false);

        let exclude_dirs = self.config.exclude_dirs.clone();
        builder.filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            if !is_dir || entry.depth() == 0 {
                return true;
            }
            entry
                .file_name()
                .to_str()
                .is_none_or(|name| !exclude_dirs.iter().any(|e| e == name))
        });
        builder.build()
    }
}

/// Writes through a temp file in the same directory, then renames it over
/// the target so readers never see a half-written document.
fn write_atomic(abs: &Path, text: &str) -> Result<(), StoreError> {
    let dir = abs
        .parent()
        .ok_or_else(|| StoreError::InvalidPath(abs.display().to_string()))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(text.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(abs).map_err(|err| err.error)?;
    Ok(())
}

impl VaultAccess for FsVault {
    fn read(&self, path: &str) -> Result<String, StoreError> {
        self.read_existing(path).map(|(_, text)| text)
    }

    fn modify(&self, path: &str, text: &str) -> Result<(), StoreError> {
        let abs = self.resolve(path)?;
        if !abs.is_file() {
            return Err(StoreError::NotFound(path.to_string()));
        }
        write_atomic(&abs, text)?;
        tracing::debug!(path = %path, bytes = text.len(), "document written");
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).is_ok_and(|abs| abs.is_file())
    }

    fn list_documents(&self) -> Result<Vec<String>, StoreError> {
        let mut out = Vec::new();
        for entry in self.walker() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(error = %err, "skipping unreadable vault entry");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) || !self.is_document(entry.path())
            {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let parts = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>();
            out.push(parts.join("/"));
        }
        out.sort();
        Ok(out)
    }

    fn process_frontmatter(
        &self,
        path: &str,
        mutate: &mut dyn FnMut(&mut Mapping) -> bool,
    ) -> Result<bool, StoreError> {
        let (abs, text) = self.read_existing(path)?;
        let Some(next) = mutate_frontmatter(path, &text, mutate)? else {
            return Ok(false);
        };
        write_atomic(&abs, &next)?;
        tracing::debug!(path = %path, "frontmatter written");
        Ok(true)
    }

    fn tag_cache(&self, path: &str) -> Result<Option<StructuredTagCache>, StoreError> {
        let text = match self.read(path) {
            Ok(text) => text,
            Err(StoreError::NotFound(_)) => return Ok(None),
            Err(err) => return Err(err),
        };
        let mut scanner = self.scanner.lock().unwrap_or_else(PoisonError::into_inner);
        build_tag_cache(path, &text, &mut scanner).map(Some)
    }
}
