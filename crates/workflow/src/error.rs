#![forbid(unsafe_code)]

use rt_core::TagNameError;
use rt_storage::StoreError;

/// Reasons a workflow stops before any document is touched.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("invalid tag {tag:?}: {reason}")]
    InvalidTag { tag: String, reason: TagNameError },
    #[error("{0} is unchanged")]
    Unchanged(String),
    #[error("cannot rename {from} into itself or its own subtree ({to})")]
    DescendantRename { from: String, to: String },
    #[error("no notes use {0}")]
    NoTargets(String),
    #[error("declined at confirmation")]
    Declined,
    #[error(transparent)]
    Store(#[from] StoreError),
}
