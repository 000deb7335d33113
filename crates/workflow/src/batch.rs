#![forbid(unsafe_code)]

use crate::options::WorkflowOptions;
use crate::outcome::{BatchOutcome, FileOutcome};
use std::fmt::Display;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation, observed at batch boundaries.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub(crate) trait BatchTarget {
    fn path(&self) -> &str;
}

/// Applies every target in order. A failing target is logged and tallied;
/// it never stops the rest of the batch.
pub(crate) async fn run_batch<T, E, F>(
    operation: &'static str,
    targets: &[T],
    options: &WorkflowOptions,
    cancel: Option<&CancelFlag>,
    mut apply: F,
) -> BatchOutcome
where
    T: BatchTarget,
    E: Display,
    F: FnMut(&T) -> Result<FileOutcome, E>,
{
    let batch_size = options.effective_batch_size();
    let mut outcome = BatchOutcome::new(targets.len(), options.skip_sample_limit);

    for (index, target) in targets.iter().enumerate() {
        if index % batch_size == 0 {
            if index > 0 {
                tokio::task::yield_now().await;
            }
            if cancel.is_some_and(CancelFlag::is_cancelled) {
                tracing::warn!(
                    operation,
                    processed = index,
                    remaining = targets.len() - index,
                    "batch cancelled"
                );
                outcome.mark_cancelled(targets.len() - index);
                break;
            }
        }

        match apply(target) {
            Ok(result) => {
                if let FileOutcome::Skipped(reason) = result {
                    tracing::debug!(
                        operation,
                        path = %target.path(),
                        reason = %reason,
                        "target skipped"
                    );
                }
                outcome.record(target.path(), result);
            }
            Err(err) => {
                let message = err.to_string();
                tracing::error!(
                    operation,
                    path = %target.path(),
                    error = %message,
                    "target failed"
                );
                outcome.record_failure(target.path(), &message);
            }
        }
    }

    log_summary(operation, &outcome);
    outcome
}

fn log_summary(operation: &'static str, outcome: &BatchOutcome) {
    tracing::info!(
        operation,
        total = outcome.total,
        changed = outcome.changed,
        skipped = outcome.skipped_count(),
        failed = outcome.failed_count(),
        cancelled = outcome.cancelled,
        "batch finished"
    );
    for (reason, samples) in &outcome.skip_samples {
        tracing::warn!(
            operation,
            reason = %reason,
            count = outcome.skipped_for(*reason),
            samples = ?samples,
            "targets skipped"
        );
    }
    for (error, count) in &outcome.failed {
        tracing::warn!(operation, error = %error, count, "targets failed");
    }
}
