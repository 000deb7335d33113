#![forbid(unsafe_code)]

use crate::charset::is_tag;
use serde_yaml::{Mapping, Value as YamlValue};

pub const TAG_FIELD_KEYS: &[&str] = &["tags", "tag", "aliases", "alias"];

/// A `tags`/`aliases` field value, whichever shape it was written in.
#[derive(Clone, Debug, PartialEq)]
pub enum TagFieldValue {
    Scalar(String),
    List(Vec<TagFieldEntry>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum TagFieldEntry {
    Text(String),
    Other(YamlValue),
}

impl TagFieldEntry {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Other(_) => None,
        }
    }
}

impl TagFieldValue {
    /// Only strings and sequences are tag fields; numbers, booleans and
    /// nested mappings are left alone.
    pub fn from_yaml(value: &YamlValue) -> Option<Self> {
        match value {
            YamlValue::String(text) => Some(Self::Scalar(text.clone())),
            YamlValue::Sequence(items) => Some(Self::List(
                items
                    .iter()
                    .map(|item| match item {
                        YamlValue::String(text) => TagFieldEntry::Text(text.clone()),
                        other => TagFieldEntry::Other(other.clone()),
                    })
                    .collect(),
            )),
            _ => None,
        }
    }

    pub fn to_yaml(&self) -> YamlValue {
        match self {
            Self::Scalar(text) => YamlValue::String(text.clone()),
            Self::List(entries) => YamlValue::Sequence(
                entries
                    .iter()
                    .map(|entry| match entry {
                        TagFieldEntry::Text(text) => YamlValue::String(text.clone()),
                        TagFieldEntry::Other(other) => other.clone(),
                    })
                    .collect(),
            ),
        }
    }
}

enum FieldAction {
    Keep,
    Set(TagFieldValue),
    Remove,
}

/// One tag-bearing frontmatter field, handed to the visitor callback.
pub struct TagField {
    key: String,
    lower_key: String,
    is_alias: bool,
    value: TagFieldValue,
    action: FieldAction,
}

impl TagField {
    /// Key as written in the document.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn lower_key(&self) -> &str {
        &self.lower_key
    }

    pub fn is_alias(&self) -> bool {
        self.is_alias
    }

    pub fn value(&self) -> &TagFieldValue {
        &self.value
    }

    pub fn set(&mut self, next: TagFieldValue) {
        if next == self.value {
            self.action = FieldAction::Keep;
        } else {
            self.action = FieldAction::Set(next);
        }
    }

    pub fn remove(&mut self) {
        self.action = FieldAction::Remove;
    }
}

/// Visits every `tags`/`tag`/`aliases`/`alias` field (any key casing) whose
/// value is a string or a list. Returns true iff a field was changed.
pub fn visit_tag_fields<F>(mapping: &mut Mapping, mut visit: F) -> bool
where
    F: FnMut(&mut TagField),
{
    let keys = mapping
        .keys()
        .filter_map(|key| key.as_str())
        .filter(|key| TAG_FIELD_KEYS.contains(&key.to_lowercase().as_str()))
        .map(str::to_string)
        .collect::<Vec<_>>();

    let mut changed = false;
    for key in keys {
        let Some(value) = mapping.get(key.as_str()).and_then(TagFieldValue::from_yaml) else {
            continue;
        };
        let lower_key = key.to_lowercase();
        let mut field = TagField {
            is_alias: lower_key.starts_with("alias"),
            key,
            lower_key,
            value,
            action: FieldAction::Keep,
        };
        visit(&mut field);
        match field.action {
            FieldAction::Keep => {}
            FieldAction::Set(next) => {
                mapping.insert(YamlValue::String(field.key), next.to_yaml());
                changed = true;
            }
            FieldAction::Remove => {
                if mapping.remove(field.key.as_str()).is_some() {
                    changed = true;
                }
            }
        }
    }
    changed
}

/// A single tag value found in frontmatter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrontmatterTag {
    pub value: String,
    pub is_alias: bool,
}

/// Individual tag values from all tag fields. Scalars and list entries are
/// split on commas, spaces and newlines; aliases count only when they are
/// written as tags.
pub fn frontmatter_tags(mapping: &Mapping) -> Vec<FrontmatterTag> {
    let mut out = Vec::new();
    for (key, value) in mapping {
        let Some(key) = key.as_str() else {
            continue;
        };
        let lower_key = key.to_lowercase();
        if !TAG_FIELD_KEYS.contains(&lower_key.as_str()) {
            continue;
        }
        let is_alias = lower_key.starts_with("alias");
        let texts = match TagFieldValue::from_yaml(value) {
            Some(TagFieldValue::Scalar(text)) => vec![text],
            Some(TagFieldValue::List(entries)) => entries
                .iter()
                .filter_map(TagFieldEntry::as_text)
                .map(str::to_string)
                .collect(),
            None => continue,
        };
        for text in texts {
            if is_alias {
                if is_tag(&text) {
                    out.push(FrontmatterTag {
                        value: text,
                        is_alias,
                    });
                }
                continue;
            }
            for piece in split_tag_list(&text) {
                out.push(FrontmatterTag {
                    value: piece.to_string(),
                    is_alias,
                });
            }
        }
    }
    out
}

pub fn is_tag_list_separator(ch: char) -> bool {
    matches!(ch, ',' | ' ' | '\n')
}

/// Non-empty pieces of a comma/space/newline separated tag list.
pub fn split_tag_list(text: &str) -> impl Iterator<Item = &str> {
    text.split(is_tag_list_separator)
        .filter(|piece| !piece.is_empty())
}

/// Splits on separator runs, keeping them: even indices are pieces, odd
/// indices are the separators between them.
pub fn split_keeping_separators(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_separator = false;
    for (idx, ch) in text.char_indices() {
        let is_sep = is_tag_list_separator(ch);
        if is_sep != in_separator {
            parts.push(&text[start..idx]);
            start = idx;
            in_separator = is_sep;
        }
    }
    parts.push(&text[start..]);
    parts
}

/// The YAML block at the top of a document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrontmatterBlock<'a> {
    pub yaml: &'a str,
    /// Byte offset where the body starts.
    pub body_start: usize,
}

pub fn split_frontmatter(text: &str) -> Option<FrontmatterBlock<'_>> {
    let open_len = if text.starts_with("---\n") {
        4
    } else if text.starts_with("---\r\n") {
        5
    } else {
        return None;
    };

    let mut line_start = open_len;
    while line_start <= text.len() {
        let rest = &text[line_start..];
        let line_end = rest.find('\n').map(|idx| line_start + idx);
        let line = match line_end {
            Some(end) => &text[line_start..end],
            None => rest,
        };
        if line.trim_end_matches('\r') == "---" {
            let body_start = line_end.map_or(text.len(), |end| end + 1);
            let yaml = text[open_len..line_start]
                .trim_end_matches('\n')
                .trim_end_matches('\r');
            return Some(FrontmatterBlock { yaml, body_start });
        }
        match line_end {
            Some(end) => line_start = end + 1,
            None => break,
        }
    }
    None
}

pub fn parse_frontmatter(yaml: &str) -> Result<Mapping, serde_yaml::Error> {
    if yaml.trim().is_empty() {
        return Ok(Mapping::new());
    }
    match serde_yaml::from_str::<YamlValue>(yaml)? {
        YamlValue::Mapping(mapping) => Ok(mapping),
        YamlValue::Null => Ok(Mapping::new()),
        _ => Err(serde::de::Error::custom("frontmatter must be a mapping")),
    }
}

pub fn render_frontmatter(mapping: &Mapping, body: &str) -> Result<String, serde_yaml::Error> {
    if mapping.is_empty() {
        return Ok(format!("---\n---\n{body}"));
    }
    let yaml = serde_yaml::to_string(mapping)?;
    Ok(format!("---\n{}\n---\n{body}", yaml.trim_end_matches('\n')))
}
