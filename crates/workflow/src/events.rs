#![forbid(unsafe_code)]

use rt_core::TagDescriptor;
use serde::{Deserialize, Serialize};
use std::io::Write;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagRenamedEvent {
    pub old_path: String,
    pub new_path: String,
    pub old_canonical_path: String,
    pub new_canonical_path: String,
    pub merged_into_existing: bool,
}

impl TagRenamedEvent {
    pub fn new(from: &TagDescriptor, to: &TagDescriptor, merged_into_existing: bool) -> Self {
        Self {
            old_path: from.name().to_string(),
            new_path: to.name().to_string(),
            old_canonical_path: from.canonical_name().to_string(),
            new_canonical_path: to.canonical_name().to_string(),
            merged_into_existing,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagDeletedEvent {
    pub path: String,
    pub canonical_path: String,
}

impl TagDeletedEvent {
    pub fn new(tag: &TagDescriptor) -> Self {
        Self {
            path: tag.name().to_string(),
            canonical_path: tag.canonical_name().to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum TagEvent {
    TagRenamed(TagRenamedEvent),
    TagDeleted(TagDeletedEvent),
}

pub trait EventBus {
    fn emit(&mut self, event: &TagEvent);
}

impl EventBus for Vec<TagEvent> {
    fn emit(&mut self, event: &TagEvent) {
        self.push(event.clone());
    }
}

/// Writes each event as one JSON line.
#[derive(Debug)]
pub struct JsonLinesEventBus<W> {
    out: W,
}

impl<W: Write> JsonLinesEventBus<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> EventBus for JsonLinesEventBus<W> {
    fn emit(&mut self, event: &TagEvent) {
        let written = serde_json::to_writer(&mut self.out, event)
            .map_err(std::io::Error::from)
            .and_then(|()| self.out.write_all(b"\n"))
            .and_then(|()| self.out.flush());
        if let Err(err) = written {
            tracing::warn!(error = %err, "failed to write tag event");
        }
    }
}
