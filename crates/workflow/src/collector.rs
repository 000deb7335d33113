#![forbid(unsafe_code)]

use crate::batch::BatchTarget;
use crate::outcome::{FileOutcome, SkipReason};
use rt_core::charset::{is_tag, is_tag_char};
use rt_core::frontmatter::{
    frontmatter_tags, is_tag_list_separator, split_frontmatter, split_tag_list,
};
use rt_core::{
    InlineTagMutator, TagDescriptor, TagFieldEntry, TagFieldValue, TagOccurrence, TagReplacement,
    visit_tag_fields,
};
use rt_storage::{StoreError, StructuredTagCache, VaultAccess};
use serde::Serialize;
use serde_yaml::Mapping;
use std::collections::BTreeMap;

/// A document that uses the tag being renamed, as seen at scan time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenameFile {
    pub path: String,
    /// Matching inline occurrences, last one first.
    pub occurrences: Vec<TagOccurrence>,
    pub has_frontmatter: bool,
}

impl BatchTarget for RenameFile {
    fn path(&self) -> &str {
        &self.path
    }
}

impl RenameFile {
    /// Applies the rename to the live document.
    ///
    /// Every cached occurrence is checked against the fresh text first. If
    /// any of them went stale the file is skipped as a whole and nothing is
    /// written.
    pub fn renamed(
        &self,
        vault: &dyn VaultAccess,
        replacement: &mut TagReplacement,
    ) -> Result<FileOutcome, StoreError> {
        let text = match vault.read(&self.path) {
            Ok(text) => text,
            Err(err) if err.is_not_found() => {
                return Ok(FileOutcome::Skipped(SkipReason::FileMissing));
            }
            Err(err) => return Err(err),
        };

        let from = replacement.from_tag();
        let stale = self
            .occurrences
            .iter()
            .any(|occurrence| !still_there(&text, occurrence, from));
        if stale {
            return Ok(FileOutcome::Skipped(SkipReason::FileChanged));
        }

        let mut next = text.clone();
        for occurrence in &self.occurrences {
            next = replacement.in_string(&next, occurrence.start);
        }
        let inline_changed = next != text;
        if inline_changed {
            vault.modify(&self.path, &next)?;
        }

        let frontmatter_changed = self.has_frontmatter
            && vault.process_frontmatter(&self.path, &mut |mapping: &mut Mapping| {
                visit_tag_fields(mapping, |field| {
                    let next = replacement.in_value(field.value(), field.is_alias());
                    field.set(next);
                })
            })?;

        if inline_changed || frontmatter_changed {
            Ok(FileOutcome::Changed)
        } else {
            Ok(FileOutcome::Skipped(SkipReason::NoOp))
        }
    }
}

/// The fresh text still holds the cached tag at the cached offsets, and the
/// tag ends there.
fn still_there(text: &str, occurrence: &TagOccurrence, from: &TagDescriptor) -> bool {
    let Some(found) = text.get(occurrence.start..occurrence.end) else {
        return false;
    };
    let ends_here = text[occurrence.end..]
        .chars()
        .next()
        .is_none_or(|ch| !is_tag_char(ch));
    ends_here
        && found.to_lowercase() == occurrence.tag.to_lowercase()
        && from.matches(found)
        && from.matches(&occurrence.tag)
}

/// A document that uses the tag being deleted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeleteFile {
    pub path: String,
    pub has_inline: bool,
    pub has_frontmatter: bool,
}

impl BatchTarget for DeleteFile {
    fn path(&self) -> &str {
        &self.path
    }
}

impl DeleteFile {
    /// Strips `tag` and its descendants from the body and the tag fields.
    /// Fields left empty are removed.
    pub fn deleted(
        &self,
        vault: &dyn VaultAccess,
        tag: &TagDescriptor,
        mutator: &mut InlineTagMutator,
    ) -> Result<FileOutcome, StoreError> {
        let text = match vault.read(&self.path) {
            Ok(text) => text,
            Err(err) if err.is_not_found() => {
                return Ok(FileOutcome::Skipped(SkipReason::FileMissing));
            }
            Err(err) => return Err(err),
        };

        let body_start = split_frontmatter(&text).map_or(0, |block| block.body_start);
        let body = mutator.remove_tag_tree(&text[body_start..], tag)?;
        let inline_changed = body != text[body_start..];
        if inline_changed {
            let next = format!("{}{body}", &text[..body_start]);
            vault.modify(&self.path, &next)?;
        }

        let frontmatter_changed = self.has_frontmatter
            && vault.process_frontmatter(&self.path, &mut |mapping: &mut Mapping| {
                visit_tag_fields(mapping, |field| {
                    match strip_tag(field.value(), tag, field.is_alias()) {
                        Stripped::Unchanged => {}
                        Stripped::Empty => field.remove(),
                        Stripped::Value(next) => field.set(next),
                    }
                })
            })?;

        if inline_changed || frontmatter_changed {
            Ok(FileOutcome::Changed)
        } else {
            Ok(FileOutcome::Skipped(SkipReason::NoOp))
        }
    }
}

enum Stripped {
    Unchanged,
    Empty,
    Value(TagFieldValue),
}

fn strip_tag(value: &TagFieldValue, tag: &TagDescriptor, is_alias: bool) -> Stripped {
    match value {
        TagFieldValue::Scalar(text) => match strip_text(text, tag, is_alias) {
            None => Stripped::Unchanged,
            Some(rest) if rest.is_empty() => Stripped::Empty,
            Some(rest) => Stripped::Value(TagFieldValue::Scalar(rest)),
        },
        TagFieldValue::List(entries) => {
            let mut changed = false;
            let mut kept = Vec::with_capacity(entries.len());
            for entry in entries {
                let TagFieldEntry::Text(text) = entry else {
                    kept.push(entry.clone());
                    continue;
                };
                match strip_text(text, tag, is_alias) {
                    None => kept.push(entry.clone()),
                    Some(rest) => {
                        changed = true;
                        if !rest.is_empty() {
                            kept.push(TagFieldEntry::Text(rest));
                        }
                    }
                }
            }
            if !changed {
                Stripped::Unchanged
            } else if kept.is_empty() {
                Stripped::Empty
            } else {
                Stripped::Value(TagFieldValue::List(kept))
            }
        }
    }
}

/// `None` when nothing in `text` names the tag.
fn strip_text(text: &str, tag: &TagDescriptor, is_alias: bool) -> Option<String> {
    if is_alias {
        return (is_tag(text) && tag.matches(text)).then(String::new);
    }
    if !text.contains(is_tag_list_separator) {
        return tag.matches(text).then(String::new);
    }
    let pieces = split_tag_list(text).collect::<Vec<_>>();
    let kept = pieces
        .iter()
        .copied()
        .filter(|piece| !tag.matches(piece))
        .collect::<Vec<_>>();
    if kept.len() == pieces.len() {
        return None;
    }
    let separator = if text.contains(',') { ", " } else { " " };
    Some(kept.join(separator))
}

fn frontmatter_matches(cache: &StructuredTagCache, tag: &TagDescriptor) -> bool {
    cache
        .frontmatter
        .as_ref()
        .is_some_and(|mapping| frontmatter_tags(mapping).iter().any(|t| tag.matches(&t.value)))
}

fn scan<T>(
    vault: &dyn VaultAccess,
    operation: &'static str,
    mut target: impl FnMut(&str, StructuredTagCache) -> Option<T>,
) -> Result<Vec<T>, StoreError> {
    let documents = vault.list_documents()?;
    let mut out = Vec::new();
    for path in &documents {
        let cache = match vault.tag_cache(path) {
            Ok(Some(cache)) => cache,
            Ok(None) => continue,
            Err(err) => {
                tracing::warn!(
                    operation,
                    path = %path,
                    error = %err,
                    "skipping unreadable document"
                );
                continue;
            }
        };
        if let Some(found) = target(path, cache) {
            out.push(found);
        }
    }
    tracing::debug!(operation, scanned = documents.len(), targets = out.len(), "scan finished");
    Ok(out)
}

pub fn collect_rename_targets(
    vault: &dyn VaultAccess,
    from: &TagDescriptor,
) -> Result<Vec<RenameFile>, StoreError> {
    scan(vault, "rename", |path, cache| {
        let has_frontmatter = frontmatter_matches(&cache, from);
        let mut occurrences = cache
            .tags
            .into_iter()
            .filter(|occurrence| from.matches(&occurrence.tag))
            .collect::<Vec<_>>();
        if occurrences.is_empty() && !has_frontmatter {
            return None;
        }
        occurrences.sort_by(|a, b| b.start.cmp(&a.start));
        Some(RenameFile {
            path: path.to_string(),
            occurrences,
            has_frontmatter,
        })
    })
}

pub fn collect_delete_targets(
    vault: &dyn VaultAccess,
    tag: &TagDescriptor,
) -> Result<Vec<DeleteFile>, StoreError> {
    scan(vault, "delete", |path, cache| {
        let has_frontmatter = frontmatter_matches(&cache, tag);
        let has_inline = cache.tags.iter().any(|occurrence| tag.matches(&occurrence.tag));
        (has_inline || has_frontmatter).then(|| DeleteFile {
            path: path.to_string(),
            has_inline,
            has_frontmatter,
        })
    })
}

/// How often a tag is used across the vault.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TagUsage {
    /// Display form of the first occurrence seen, with `#`.
    pub tag: String,
    pub canonical: String,
    pub count: usize,
}

/// Every tag in the vault, keyed by canonical form.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagCorpus {
    tags: BTreeMap<String, TagUsage>,
}

impl TagCorpus {
    pub fn collect(vault: &dyn VaultAccess) -> Result<Self, StoreError> {
        let mut corpus = Self::default();
        scan(vault, "corpus", |_, cache| {
            for occurrence in &cache.tags {
                corpus.add(&occurrence.tag);
            }
            if let Some(mapping) = &cache.frontmatter {
                for found in frontmatter_tags(mapping) {
                    corpus.add(&found.value);
                }
            }
            None::<()>
        })?;
        Ok(corpus)
    }

    pub fn add(&mut self, raw: &str) {
        let tag = TagDescriptor::new(raw);
        if tag.is_empty() {
            return;
        }
        self.tags
            .entry(tag.canonical().to_string())
            .or_insert_with(|| TagUsage {
                tag: tag.tag().to_string(),
                canonical: tag.canonical().to_string(),
                count: 0,
            })
            .count += 1;
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn contains(&self, tag: &TagDescriptor) -> bool {
        self.tags.contains_key(tag.canonical())
    }

    pub fn usages(&self) -> impl Iterator<Item = &TagUsage> {
        self.tags.values()
    }

    /// Display forms, in canonical order.
    pub fn names(&self) -> Vec<String> {
        self.tags.values().map(|usage| usage.tag.clone()).collect()
    }

    /// `tag` and everything below it.
    pub fn subtree<'a>(&'a self, tag: &'a TagDescriptor) -> impl Iterator<Item = &'a TagUsage> {
        self.tags.values().filter(move |usage| tag.matches(&usage.tag))
    }
}
