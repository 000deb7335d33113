#![forbid(unsafe_code)]

use crate::Services;
use crate::batch::{CancelFlag, run_batch};
use crate::collector::{DeleteFile, collect_delete_targets};
use crate::error::WorkflowError;
use crate::events::{TagDeletedEvent, TagEvent};
use crate::notify::{Notice, NoticeVariant};
use crate::options::WorkflowOptions;
use crate::outcome::BatchOutcome;
use crate::prompt::Confirmation;
use crate::rename::not_finalized_message;
use rt_core::{InlineTagMutator, TagDescriptor};
use serde::Serialize;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct DeletePlan {
    pub tag: TagDescriptor,
    pub targets: Vec<DeleteFile>,
}

#[derive(Clone, Debug, Serialize)]
pub struct DeleteReport {
    pub path: String,
    pub finalized: bool,
    pub outcome: BatchOutcome,
}

impl DeleteReport {
    pub fn removed(&self) -> usize {
        self.outcome.changed
    }
}

/// Removes a tag and its descendants from every note that uses it.
pub struct TagDeleteWorkflow<'a> {
    services: Services<'a>,
    options: WorkflowOptions,
    cancel: Option<CancelFlag>,
    mutator: InlineTagMutator,
}

impl<'a> TagDeleteWorkflow<'a> {
    pub fn new(services: Services<'a>, options: WorkflowOptions) -> Self {
        Self {
            services,
            options,
            cancel: None,
            mutator: InlineTagMutator::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn analyze(
        &mut self,
        path: &str,
        preset: Option<Vec<DeleteFile>>,
    ) -> Result<DeletePlan, WorkflowError> {
        let tag = TagDescriptor::new(path);
        if let Err(reason) = tag.validate() {
            let err = WorkflowError::InvalidTag {
                tag: tag.name().to_string(),
                reason,
            };
            self.warn(err.to_string());
            return Err(err);
        }

        let targets = match preset {
            Some(targets) => targets,
            None => collect_delete_targets(self.services.vault, &tag)?,
        };
        if targets.is_empty() {
            let err = WorkflowError::NoTargets(tag.tag().to_string());
            self.warn(err.to_string());
            return Err(err);
        }
        Ok(DeletePlan { tag, targets })
    }

    pub async fn run(&mut self, path: &str) -> Result<DeleteReport, WorkflowError> {
        self.run_with_targets(path, None).await
    }

    pub async fn run_with_targets(
        &mut self,
        path: &str,
        preset: Option<Vec<DeleteFile>>,
    ) -> Result<DeleteReport, WorkflowError> {
        let plan = self.analyze(path, preset)?;
        self.confirm(&plan)?;
        Ok(self.execute(plan).await)
    }

    pub fn confirm(&mut self, plan: &DeletePlan) -> Result<(), WorkflowError> {
        let request = Confirmation {
            message: format!(
                "Remove {} and its nested tags from {} notes?",
                plan.tag.tag(),
                plan.targets.len()
            ),
            targets: plan.targets.len(),
            merge: None,
        };
        if self.services.prompt.confirm(&request) {
            Ok(())
        } else {
            tracing::info!(tag = %plan.tag, "delete declined");
            Err(WorkflowError::Declined)
        }
    }

    pub async fn execute(&mut self, plan: DeletePlan) -> DeleteReport {
        let DeletePlan { tag, targets } = plan;
        let vault = self.services.vault;
        let mutator = &mut self.mutator;

        tracing::info!(tag = %tag, targets = targets.len(), "delete started");
        let outcome = run_batch(
            "delete",
            &targets,
            &self.options,
            self.cancel.as_ref(),
            |target| target.deleted(vault, &tag, mutator),
        )
        .await;
        self.mutator.clear_cache();

        let finalized = outcome.is_clean();
        if finalized {
            self.finalize(&tag, &outcome);
        } else {
            self.warn(not_finalized_message(&outcome));
        }

        DeleteReport {
            path: tag.name().to_string(),
            finalized,
            outcome,
        }
    }

    fn finalize(&mut self, tag: &TagDescriptor, outcome: &BatchOutcome) {
        if let Err(err) = self.services.metadata.handle_tag_delete(tag.name()) {
            tracing::error!(tag = %tag, error = %err, "tag metadata cleanup failed");
        }
        self.services
            .events
            .emit(&TagEvent::TagDeleted(TagDeletedEvent::new(tag)));
        let message = format!("Removed {} from {} notes", tag.tag(), outcome.changed);
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
