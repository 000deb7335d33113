#![forbid(unsafe_code)]

mod fs;
mod memory;

pub use fs::{FsVault, VaultConfig};
pub use memory::MemoryVault;

use crate::{StoreError, StructuredTagCache};
use rt_core::InlineTagMutator;
use rt_core::frontmatter::{parse_frontmatter, render_frontmatter, split_frontmatter};
use serde_yaml::Mapping;

/// Inline tags come from the body only; frontmatter tags live in the mapping.
/// A document whose frontmatter does not parse still gets its inline tags.
pub(crate) fn build_tag_cache(
    path: &str,
    text: &str,
    scanner: &mut InlineTagMutator,
) -> Result<StructuredTagCache, StoreError> {
    let (frontmatter, body_start) = match split_frontmatter(text) {
        Some(block) => match parse_frontmatter(block.yaml) {
            Ok(mapping) => (Some(mapping), block.body_start),
            Err(err) => {
                tracing::warn!(path = %path, error = %err, "ignoring unparseable frontmatter");
                (None, block.body_start)
            }
        },
        None => (None, 0),
    };

    let mut tags = scanner.find_tags(&text[body_start..])?;
    for occurrence in &mut tags {
        occurrence.start += body_start;
        occurrence.end += body_start;
    }
    Ok(StructuredTagCache { tags, frontmatter })
}

/// New document text after `mutate` ran over its frontmatter, or `None` when
/// nothing changed.
pub(crate) fn mutate_frontmatter(
    path: &str,
    text: &str,
    mutate: &mut dyn FnMut(&mut Mapping) -> bool,
) -> Result<Option<String>, StoreError> {
    let (mut mapping, body) = match split_frontmatter(text) {
        Some(block) => {
            let mapping =
                parse_frontmatter(block.yaml).map_err(|source| StoreError::Frontmatter {
                    path: path.to_string(),
                    source,
                })?;
            (mapping, &text[block.body_start..])
        }
        None => (Mapping::new(), text),
    };

    if !mutate(&mut mapping) {
        return Ok(None);
    }
    let next = render_frontmatter(&mapping, body).map_err(|source| StoreError::Frontmatter {
        path: path.to_string(),
        source,
    })?;
    Ok(Some(next))
}
