#![forbid(unsafe_code)]

use crate::charset::is_tag;
use crate::frontmatter::{
    TagFieldEntry, TagFieldValue, is_tag_list_separator, split_keeping_separators,
};
use crate::tag::{TagDescriptor, skip_chars};
use std::collections::{HashMap, HashSet};

/// Rewrites occurrences of one tag (and its descendants) into another.
///
/// Built once per rename and shared by every document in the batch.
#[derive(Clone, Debug)]
pub struct TagReplacement {
    from: TagDescriptor,
    to: TagDescriptor,
    /// The source tag itself, as written and in canonical form. The only
    /// entries looked up case-insensitively.
    direct: HashMap<String, String>,
    /// Exact-text memo of every entry seen so far.
    cache: HashMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeConflict {
    pub original: TagDescriptor,
    pub conflict: TagDescriptor,
}

impl TagReplacement {
    pub fn new(from: TagDescriptor, to: TagDescriptor) -> Self {
        let mut direct = HashMap::new();
        direct.insert(from.tag().to_string(), to.tag().to_string());
        direct.insert(from.name().to_string(), to.name().to_string());
        direct.insert(from.canonical().to_string(), to.tag().to_string());
        direct.insert(from.canonical_name().to_string(), to.name().to_string());
        Self {
            from,
            to,
            direct,
            cache: HashMap::new(),
        }
    }

    pub fn from_tag(&self) -> &TagDescriptor {
        &self.from
    }

    pub fn to_tag(&self) -> &TagDescriptor {
        &self.to
    }

    /// Splices the target tag over the source tag's length at `position`.
    ///
    /// The caller guarantees `position` still points at an occurrence; an
    /// offset outside the text or off a char boundary leaves it untouched.
    pub fn in_string(&self, text: &str, position: usize) -> String {
        let Some(rest) = text.get(position..) else {
            return text.to_string();
        };
        let tail = skip_chars(rest, self.from.tag().chars().count());
        let mut out = String::with_capacity(text.len() + self.to.tag().len());
        out.push_str(&text[..position]);
        out.push_str(self.to.tag());
        out.push_str(tail);
        out
    }

    /// Rewrites the entries of a frontmatter list.
    ///
    /// With `skip_odd_entries` the odd positions are separators produced by
    /// [`split_keeping_separators`] and pass through unchanged.
    pub fn in_array(
        &mut self,
        values: &[TagFieldEntry],
        skip_odd_entries: bool,
        is_alias: bool,
    ) -> Vec<TagFieldEntry> {
        values
            .iter()
            .enumerate()
            .map(|(idx, entry)| {
                if skip_odd_entries && idx % 2 == 1 {
                    return entry.clone();
                }
                match entry {
                    TagFieldEntry::Text(text) => TagFieldEntry::Text(self.in_text(text, is_alias)),
                    TagFieldEntry::Other(_) => entry.clone(),
                }
            })
            .collect()
    }

    pub fn in_value(&mut self, value: &TagFieldValue, is_alias: bool) -> TagFieldValue {
        match value {
            TagFieldValue::Scalar(text) => TagFieldValue::Scalar(self.in_text(text, is_alias)),
            TagFieldValue::List(entries) => {
                TagFieldValue::List(self.in_array(entries, false, is_alias))
            }
        }
    }

    fn in_text(&mut self, text: &str, is_alias: bool) -> String {
        if text.is_empty() {
            return String::new();
        }
        if is_alias {
            if !is_tag(text) {
                return text.to_string();
            }
        } else if text.contains(is_tag_list_separator) {
            return split_keeping_separators(text)
                .into_iter()
                .enumerate()
                .map(|(idx, piece)| {
                    if idx % 2 == 1 || piece.is_empty() {
                        piece.to_string()
                    } else {
                        self.replace_single(piece)
                    }
                })
                .collect();
        }
        self.replace_single(text)
    }

    fn replace_single(&mut self, text: &str) -> String {
        if let Some(hit) = self.cache.get(text) {
            return hit.clone();
        }
        let lower = text.to_lowercase();
        let direct = self
            .direct
            .get(text)
            .or_else(|| self.direct.get(&lower))
            .cloned();

        // Descendants keep their own suffix casing.
        let replaced = if let Some(hit) = direct {
            hit
        } else if lower.starts_with(self.from.canonical_prefix()) {
            let tail = skip_chars(text, self.from.tag().chars().count());
            format!("{}{tail}", self.to.tag())
        } else if format!("#{lower}").starts_with(self.from.canonical_prefix()) {
            let tail = skip_chars(text, self.from.name().chars().count());
            format!("{}{tail}", self.to.name())
        } else {
            text.to_string()
        };
        self.cache.insert(text.to_string(), replaced.clone());
        replaced
    }

    /// Looks for a tag that would collide with an existing one after the
    /// rename. Case-only renames never merge.
    pub fn will_merge_tags<S: AsRef<str>>(&self, existing: &[S]) -> Option<MergeConflict> {
        if self.from.canonical() == self.to.canonical() {
            return None;
        }
        let known = existing
            .iter()
            .map(|name| TagDescriptor::new(name.as_ref()).canonical().to_string())
            .collect::<HashSet<_>>();
        for name in existing {
            let name = name.as_ref();
            if !self.from.matches(name) {
                continue;
            }
            let original = TagDescriptor::new(name);
            let changed = self.in_string(original.tag(), 0);
            if known.contains(&changed.to_lowercase()) {
                return Some(MergeConflict {
                    original,
                    conflict: TagDescriptor::new(&changed),
                });
            }
        }
        None
    }
}
