#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_SKIP_SAMPLE_LIMIT: usize = 5;
pub const DEFAULT_NOTICE_TIMEOUT_MS: u64 = 4_000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowOptions {
    /// Targets processed between two cooperative yields.
    pub batch_size: usize,
    /// Example paths kept per skip reason and for failures.
    pub skip_sample_limit: usize,
    pub notice_timeout_ms: u64,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            skip_sample_limit: DEFAULT_SKIP_SAMPLE_LIMIT,
            notice_timeout_ms: DEFAULT_NOTICE_TIMEOUT_MS,
        }
    }
}

impl WorkflowOptions {
    pub(crate) fn effective_batch_size(&self) -> usize {
        self.batch_size.max(1)
    }
}
