#![forbid(unsafe_code)]

pub mod charset;
pub mod frontmatter;
pub mod inline;
pub mod replacement;
pub mod tag;

pub use frontmatter::{TagField, TagFieldEntry, TagFieldValue, visit_tag_fields};
pub use inline::{ExclusionRange, InlineTagMutator, PatternCache, TagOccurrence};
pub use replacement::{MergeConflict, TagReplacement};
pub use tag::{TagDescriptor, TagNameError};
