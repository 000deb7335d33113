#![forbid(unsafe_code)]

use regex::Regex;
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// Compiled patterns keyed by what they match.
///
/// Owned by whoever runs the mutations, so separate runs (and tests) never
/// share state.
#[derive(Debug, Default)]
pub struct PatternCache {
    compiled: HashMap<String, Regex>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<F>(&mut self, key: &str, build: F) -> Result<&Regex, regex::Error>
    where
        F: FnOnce() -> String,
    {
        match self.compiled.entry(key.to_string()) {
            Entry::Occupied(entry) => Ok(&*entry.into_mut()),
            Entry::Vacant(entry) => Ok(&*entry.insert(Regex::new(&build())?)),
        }
    }

    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }

    pub fn clear(&mut self) {
        self.compiled.clear();
    }
}
