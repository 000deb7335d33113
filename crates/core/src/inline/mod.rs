#![forbid(unsafe_code)]

mod exclusions;
mod patterns;

pub use exclusions::*;
pub use patterns::PatternCache;

use crate::charset::{TagCharClass, is_tag_char};
use crate::tag::TagDescriptor;
use regex::Captures;

/// An inline `#tag` found in a document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagOccurrence {
    /// Literal text including the `#`, as written.
    pub tag: String,
    pub start: usize,
    pub end: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Removal {
    pub start: usize,
    pub len: usize,
}

/// Finds and strips inline tags outside code and HTML.
#[derive(Debug, Default)]
pub struct InlineTagMutator {
    patterns: PatternCache,
}

impl InlineTagMutator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear_cache(&mut self) {
        self.patterns.clear();
    }

    pub fn cached_patterns(&self) -> usize {
        self.patterns.len()
    }

    pub fn find_tags(&mut self, text: &str) -> Result<Vec<TagOccurrence>, regex::Error> {
        let ranges = exclusion_ranges(text, &mut self.patterns)?;
        let token = self.patterns.get("token", || {
            format!("#{}+", TagCharClass::Body.to_regex())
        })?;

        let mut out = Vec::new();
        for found in token.find_iter(text) {
            let start = found.start();
            if !preceded_by_space(text, start) || is_excluded(&ranges, start) {
                continue;
            }
            let body = &found.as_str()[1..];
            if body.chars().all(|ch| ch.is_ascii_digit() || ch == '/') {
                continue;
            }
            out.push(TagOccurrence {
                tag: found.as_str().to_string(),
                start,
                end: found.end(),
            });
        }
        Ok(out)
    }

    /// Removes every listed tag (exact tags, not their descendants) from
    /// `text`, together with one leading space or tab.
    ///
    /// Longer names go first so a short tag never eats the head of a longer
    /// one. Exclusion ranges are computed once and shifted after each tag's
    /// pass so they keep pointing at the same protected bytes.
    pub fn remove_tags(
        &mut self,
        text: &str,
        tags: &[TagDescriptor],
    ) -> Result<String, regex::Error> {
        let mut ordered = tags
            .iter()
            .filter(|tag| !tag.is_empty())
            .collect::<Vec<_>>();
        ordered.sort_by(|a, b| {
            b.canonical_name()
                .chars()
                .count()
                .cmp(&a.canonical_name().chars().count())
                .then_with(|| a.canonical_name().cmp(b.canonical_name()))
        });
        ordered.dedup_by(|a, b| a.canonical() == b.canonical());

        let mut current = text.to_string();
        let mut ranges = exclusion_ranges(&current, &mut self.patterns)?;
        for tag in ordered {
            let key = format!("tag:{}", tag.canonical_name());
            let pattern = self.patterns.get(&key, || {
                format!("(?i)([ \\t]?)#{}", regex::escape(tag.canonical_name()))
            })?;

            let mut removals = Vec::new();
            let next = pattern
                .replace_all(&current, |caps: &Captures<'_>| {
                    let Some(whole) = caps.get(0) else {
                        return String::new();
                    };
                    let lead = caps.get(1).map_or(0, |m| m.len());
                    let hash_at = whole.start() + lead;
                    let keep = !preceded_by_space(&current, hash_at)
                        || !followed_by_boundary(&current, whole.end())
                        || is_excluded(&ranges, hash_at);
                    if keep {
                        return whole.as_str().to_string();
                    }
                    removals.push(Removal {
                        start: whole.start(),
                        len: whole.len(),
                    });
                    String::new()
                })
                .into_owned();

            if removals.is_empty() {
                continue;
            }
            shift_ranges(&mut ranges, &removals);
            current = next;
        }
        Ok(current)
    }

    /// Removes `tag` and every descendant tag present in `text`.
    pub fn remove_tag_tree(
        &mut self,
        text: &str,
        tag: &TagDescriptor,
    ) -> Result<String, regex::Error> {
        let found = self
            .find_tags(text)?
            .into_iter()
            .filter(|occurrence| tag.matches(&occurrence.tag))
            .map(|occurrence| TagDescriptor::new(&occurrence.tag))
            .collect::<Vec<_>>();
        if found.is_empty() {
            return Ok(text.to_string());
        }
        self.remove_tags(text, &found)
    }
}

fn preceded_by_space(text: &str, offset: usize) -> bool {
    text[..offset]
        .chars()
        .next_back()
        .is_none_or(char::is_whitespace)
}

fn followed_by_boundary(text: &str, offset: usize) -> bool {
    text[offset..].chars().next().is_none_or(|ch| !is_tag_char(ch))
}
