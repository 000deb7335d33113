#![forbid(unsafe_code)]

use crate::Services;
use crate::batch::{CancelFlag, run_batch};
use crate::collector::{RenameFile, TagCorpus, collect_rename_targets};
use crate::error::WorkflowError;
use crate::events::{TagEvent, TagRenamedEvent};
use crate::notify::{Notice, NoticeVariant};
use crate::options::WorkflowOptions;
use crate::outcome::BatchOutcome;
use crate::prompt::Confirmation;
use rt_core::{MergeConflict, TagDescriptor, TagReplacement};
use serde::Serialize;
use std::time::Duration;

/// Everything decided before the first document is written.
#[derive(Clone, Debug)]
pub struct RenamePlan {
    pub from: TagDescriptor,
    pub to: TagDescriptor,
    pub replacement: TagReplacement,
    pub targets: Vec<RenameFile>,
    pub merge: Option<MergeConflict>,
}

impl RenamePlan {
    pub fn merged_into_existing(&self) -> bool {
        self.merge.is_some()
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct RenameReport {
    pub old_path: String,
    pub new_path: String,
    pub merged_into_existing: bool,
    pub finalized: bool,
    pub outcome: BatchOutcome,
}

impl RenameReport {
    pub fn renamed(&self) -> usize {
        self.outcome.changed
    }
}

pub struct TagRenameWorkflow<'a> {
    services: Services<'a>,
    options: WorkflowOptions,
    cancel: Option<CancelFlag>,
}

impl<'a> TagRenameWorkflow<'a> {
    pub fn new(services: Services<'a>, options: WorkflowOptions) -> Self {
        Self {
            services,
            options,
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Validates the names, collects targets (unless `preset` already holds
    /// a scan) and checks for a merge into an existing tag.
    pub fn analyze(
        &mut self,
        old: &str,
        new: &str,
        preset: Option<Vec<RenameFile>>,
    ) -> Result<RenamePlan, WorkflowError> {
        let from = TagDescriptor::new(old);
        let to = TagDescriptor::new(new);
        if let Err(err) = self.check_names(&from, &to) {
            self.warn(err.to_string());
            return Err(err);
        }

        let targets = match preset {
            Some(targets) => targets,
            None => collect_rename_targets(self.services.vault, &from)?,
        };
        if targets.is_empty() {
            let err = WorkflowError::NoTargets(from.tag().to_string());
            self.warn(err.to_string());
            return Err(err);
        }

        let replacement = TagReplacement::new(from.clone(), to.clone());
        let corpus = TagCorpus::collect(self.services.vault)?;
        let merge = replacement.will_merge_tags(&corpus.names());
        if let Some(conflict) = &merge {
            tracing::info!(
                original = %conflict.original,
                conflict = %conflict.conflict,
                "rename merges into an existing tag"
            );
        }

        Ok(RenamePlan {
            from,
            to,
            replacement,
            targets,
            merge,
        })
    }

    /// Analyze, confirm, execute.
    pub async fn run(&mut self, old: &str, new: &str) -> Result<RenameReport, WorkflowError> {
        self.run_with_targets(old, new, None).await
    }

    pub async fn run_with_targets(
        &mut self,
        old: &str,
        new: &str,
        preset: Option<Vec<RenameFile>>,
    ) -> Result<RenameReport, WorkflowError> {
        let plan = self.analyze(old, new, preset)?;
        self.confirm(&plan)?;
        Ok(self.execute(plan).await)
    }

    pub fn confirm(&mut self, plan: &RenamePlan) -> Result<(), WorkflowError> {
        let mut message = format!(
            "Rename {} to {} in {} notes?",
            plan.from.tag(),
            plan.to.tag(),
            plan.targets.len()
        );
        if let Some(conflict) = &plan.merge {
            message.push_str(&format!(
                " {} already exists; {} will be merged into it.",
                conflict.conflict, conflict.original
            ));
        }
        let request = Confirmation {
            message,
            targets: plan.targets.len(),
            merge: plan.merge.clone(),
        };
        if self.services.prompt.confirm(&request) {
            Ok(())
        } else {
            tracing::info!(from = %plan.from, to = %plan.to, "rename declined");
            Err(WorkflowError::Declined)
        }
    }

    pub async fn execute(&mut self, plan: RenamePlan) -> RenameReport {
        let RenamePlan {
            from,
            to,
            mut replacement,
            targets,
            merge,
        } = plan;
        let merged_into_existing = merge.is_some();
        let vault = self.services.vault;

        tracing::info!(from = %from, to = %to, targets = targets.len(), "rename started");
        let outcome = run_batch(
            "rename",
            &targets,
            &self.options,
            self.cancel.as_ref(),
            |target| target.renamed(vault, &mut replacement),
        )
        .await;

        let finalized = outcome.is_clean();
        if finalized {
            self.finalize(&from, &to, merged_into_existing, &outcome);
        } else {
            self.warn(not_finalized_message(&outcome));
        }

        RenameReport {
            old_path: from.name().to_string(),
            new_path: to.name().to_string(),
            merged_into_existing,
            finalized,
            outcome,
        }
    }

    fn check_names(&self, from: &TagDescriptor, to: &TagDescriptor) -> Result<(), WorkflowError> {
        for tag in [from, to] {
            tag.validate().map_err(|reason| WorkflowError::InvalidTag {
                tag: tag.name().to_string(),
                reason,
            })?;
        }
        if from.name() == to.name() {
            return Err(WorkflowError::Unchanged(from.tag().to_string()));
        }
        let case_only = from.canonical() == to.canonical();
        if !case_only && TagDescriptor::is_descendant_rename(from, to) {
            return Err(WorkflowError::DescendantRename {
                from: from.tag().to_string(),
                to: to.tag().to_string(),
            });
        }
        Ok(())
    }

    fn finalize(
        &mut self,
        from: &TagDescriptor,
        to: &TagDescriptor,
        merged_into_existing: bool,
        outcome: &BatchOutcome,
    ) {
        if let Err(err) =
            self.services
                .metadata
                .handle_tag_rename(from.name(), to.name(), merged_into_existing)
        {
            tracing::error!(from = %from, to = %to, error = %err, "tag metadata update failed");
        }
        self.services
            .events
            .emit(&TagEvent::TagRenamed(TagRenamedEvent::new(
                from,
                to,
                merged_into_existing,
            )));
        let message = format!(
            "Renamed {} to {} in {} notes",
            from.tag(),
            to.tag(),
            outcome.changed
        );
        self.notify(NoticeVariant::Success, message);
    }

    fn warn(&mut self, message: String) {
        self.notify(NoticeVariant::Warning, message);
    }

    fn notify(&mut self, variant: NoticeVariant, message: String) {
        let timeout = Duration::from_millis(self.options.notice_timeout_ms);
        self.services
            .notifier
            .notify(Notice::new(variant, message).with_timeout(timeout));
    }
}

/// Summary for a batch that left some targets behind.
pub(crate) fn not_finalized_message(outcome: &BatchOutcome) -> String {
    let mut message = format!(
        "Updated {}/{} notes; {} skipped, {} failed",
        outcome.changed,
        outcome.total,
        outcome.skipped_count(),
        outcome.failed_count()
    );
    if outcome.cancelled {
        message.push_str(&format!(", {} not processed", outcome.not_processed));
    }
    message.push_str(". Tag metadata and shortcuts were left unchanged.");
    if outcome.failed_count() > 0 {
        message.push_str(" Check the logs for details.");
    }
    message
}
