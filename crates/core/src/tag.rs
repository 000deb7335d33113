#![forbid(unsafe_code)]

use crate::charset::is_tag_char;

/// A hierarchical tag (`parent/child`) in both display and canonical form.
///
/// Display forms keep the casing the author used; canonical forms are
/// lowercased and are what every comparison goes through.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TagDescriptor {
    tag: String,
    name: String,
    canonical_name: String,
    canonical: String,
    canonical_prefix: String,
}

impl TagDescriptor {
    pub fn new(raw: &str) -> Self {
        let name = normalize_name(raw).to_string();
        let canonical_name = name.to_lowercase();
        let canonical = format!("#{canonical_name}");
        let canonical_prefix = format!("{canonical}/");
        Self {
            tag: format!("#{name}"),
            name,
            canonical_name,
            canonical,
            canonical_prefix,
        }
    }

    /// Display form with a leading `#`.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Display form without the `#`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn canonical_name(&self) -> &str {
        &self.canonical_name
    }

    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    pub fn canonical_prefix(&self) -> &str {
        &self.canonical_prefix
    }

    pub fn is_empty(&self) -> bool {
        self.canonical_name.is_empty()
    }

    /// True when `text` names this tag or one of its descendants.
    pub fn matches(&self, text: &str) -> bool {
        if self.is_empty() {
            return false;
        }
        let candidate = normalize_name(text).to_lowercase();
        match candidate.strip_prefix(self.canonical_name.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    pub fn is_descendant_of(&self, ancestor: &TagDescriptor) -> bool {
        !ancestor.is_empty() && self.canonical.starts_with(ancestor.canonical_prefix.as_str())
    }

    /// Renaming `source` into one of its own descendants would create a cycle.
    pub fn is_descendant_rename(source: &TagDescriptor, target: &TagDescriptor) -> bool {
        target.is_descendant_of(source)
    }

    /// Moves this tag from under `from` to under `to`.
    ///
    /// Returns `None` when this tag is neither `from` nor a descendant of it.
    pub fn rebase(&self, from: &TagDescriptor, to: &TagDescriptor) -> Option<TagDescriptor> {
        if !from.matches(&self.name) {
            return None;
        }
        let suffix = skip_chars(&self.name, from.name.chars().count());
        Some(TagDescriptor::new(&format!("{}{suffix}", to.name)))
    }

    pub fn validate(&self) -> Result<(), TagNameError> {
        if self.is_empty() {
            return Err(TagNameError::Empty);
        }
        for (index, ch) in self.name.chars().enumerate() {
            if ch == '/' {
                continue;
            }
            if !is_tag_char(ch) {
                return Err(TagNameError::InvalidChar { ch, index });
            }
        }
        if self.name.split('/').any(str::is_empty) {
            return Err(TagNameError::EmptySegment);
        }
        if self.name.chars().all(|ch| ch.is_ascii_digit() || ch == '/') {
            return Err(TagNameError::NumericOnly);
        }
        Ok(())
    }
}

impl std::fmt::Display for TagDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.tag)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TagNameError {
    Empty,
    InvalidChar { ch: char, index: usize },
    EmptySegment,
    NumericOnly,
}

impl TagNameError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "tag name must not be empty",
            Self::InvalidChar { .. } => "tag name contains a character that is not allowed in tags",
            Self::EmptySegment => "tag name must not contain empty path segments",
            Self::NumericOnly => "tag name must contain at least one non-numeric character",
        }
    }
}

impl std::fmt::Display for TagNameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidChar { ch, index } => {
                write!(f, "{} ({ch:?} at {index})", self.message())
            }
            _ => f.write_str(self.message()),
        }
    }
}

impl std::error::Error for TagNameError {}

/// Lowercase, `#`-prefixed form of `raw`.
pub fn canonical(raw: &str) -> String {
    format!("#{}", normalize_name(raw).to_lowercase())
}

fn normalize_name(raw: &str) -> &str {
    raw.trim().trim_start_matches('#').trim_matches('/')
}

/// The remainder of `text` after its first `count` characters.
pub(crate) fn skip_chars(text: &str, count: usize) -> &str {
    match text.char_indices().nth(count) {
        Some((idx, _)) => &text[idx..],
        None => "",
    }
}
