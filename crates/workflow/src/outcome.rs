#![forbid(unsafe_code)]

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    FileMissing,
    FileChanged,
    NoOp,
}

impl SkipReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FileMissing => "file-missing",
            Self::FileChanged => "file-changed",
            Self::NoOp => "no-op",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of applying one target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileOutcome {
    Changed,
    Skipped(SkipReason),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FailureSample {
    pub path: String,
    pub error: String,
}

/// Tally of one batch run.
///
/// `changed + skipped + failed` always equals `processed()`; targets left
/// behind by a cancellation are counted in `not_processed` only.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub total: usize,
    pub changed: usize,
    pub skipped: BTreeMap<SkipReason, usize>,
    pub failed: BTreeMap<String, usize>,
    pub skip_samples: BTreeMap<SkipReason, Vec<String>>,
    pub failure_samples: Vec<FailureSample>,
    pub not_processed: usize,
    pub cancelled: bool,
    #[serde(skip)]
    sample_limit: usize,
}

impl BatchOutcome {
    pub fn new(total: usize, sample_limit: usize) -> Self {
        Self {
            total,
            sample_limit,
            ..Self::default()
        }
    }

    pub fn record(&mut self, path: &str, outcome: FileOutcome) {
        match outcome {
            FileOutcome::Changed => self.changed += 1,
            FileOutcome::Skipped(reason) => {
                *self.skipped.entry(reason).or_default() += 1;
                let samples = self.skip_samples.entry(reason).or_default();
                if samples.len() < self.sample_limit {
                    samples.push(path.to_string());
                }
            }
        }
    }

    pub fn record_failure(&mut self, path: &str, error: &str) {
        *self.failed.entry(error.to_string()).or_default() += 1;
        if self.failure_samples.len() < self.sample_limit {
            self.failure_samples.push(FailureSample {
                path: path.to_string(),
                error: error.to_string(),
            });
        }
    }

    pub fn mark_cancelled(&mut self, remaining: usize) {
        self.cancelled = true;
        self.not_processed = remaining;
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.values().sum()
    }

    pub fn skipped_for(&self, reason: SkipReason) -> usize {
        self.skipped.get(&reason).copied().unwrap_or(0)
    }

    pub fn failed_count(&self) -> usize {
        self.failed.values().sum()
    }

    pub fn processed(&self) -> usize {
        self.changed + self.skipped_count() + self.failed_count()
    }

    pub fn is_consistent(&self) -> bool {
        self.processed() + self.not_processed == self.total
    }

    /// Every target was processed and changed.
    pub fn is_clean(&self) -> bool {
        !self.cancelled && self.skipped_count() == 0 && self.failed_count() == 0
    }
}
