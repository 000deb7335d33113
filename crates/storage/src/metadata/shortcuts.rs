#![forbid(unsafe_code)]

use crate::StoreError;
use rt_core::TagDescriptor;
use serde::{Deserialize, Serialize};

/// An entry in the ordered shortcut list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Shortcut {
    Note { path: String },
    Folder { path: String },
    Tag { path: String },
    Search { query: String },
}

impl Shortcut {
    pub fn from_parts(kind: &str, value: &str) -> Result<Self, StoreError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(StoreError::InvalidInput(format!("{kind} shortcut needs a value")));
        }
        let shortcut = match kind {
            "note" => Self::Note {
                path: value.to_string(),
            },
            "folder" => Self::Folder {
                path: value.to_string(),
            },
            "tag" => {
                let tag = TagDescriptor::new(value);
                if tag.is_empty() {
                    return Err(StoreError::InvalidInput("tag shortcut needs a tag".into()));
                }
                Self::Tag {
                    path: tag.name().to_string(),
                }
            }
            "search" => Self::Search {
                query: value.to_string(),
            },
            other => {
                return Err(StoreError::InvalidInput(format!(
                    "unknown shortcut kind: {other}"
                )));
            }
        };
        Ok(shortcut)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Note { .. } => "note",
            Self::Folder { .. } => "folder",
            Self::Tag { .. } => "tag",
            Self::Search { .. } => "search",
        }
    }

    pub fn target(&self) -> &str {
        match self {
            Self::Note { path } | Self::Folder { path } | Self::Tag { path } => path,
            Self::Search { query } => query,
        }
    }

    /// The tag a shortcut points at, if it is a tag shortcut.
    pub fn tag(&self) -> Option<TagDescriptor> {
        match self {
            Self::Tag { path } => Some(TagDescriptor::new(path)),
            Self::Note { .. } | Self::Folder { .. } | Self::Search { .. } => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StoredShortcut {
    pub position: i64,
    #[serde(flatten)]
    pub shortcut: Shortcut,
}
