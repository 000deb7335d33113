#![forbid(unsafe_code)]

mod batch;
mod collector;
mod delete;
mod error;
mod events;
mod notify;
mod options;
mod outcome;
mod prompt;
mod rename;

pub use batch::CancelFlag;
pub use collector::{
    DeleteFile, RenameFile, TagCorpus, TagUsage, collect_delete_targets, collect_rename_targets,
};
pub use delete::{DeletePlan, DeleteReport, TagDeleteWorkflow};
pub use error::WorkflowError;
pub use events::{EventBus, JsonLinesEventBus, TagDeletedEvent, TagEvent, TagRenamedEvent};
pub use notify::{Notice, NoticeVariant, NotificationSink, TracingNotifier};
pub use options::WorkflowOptions;
pub use outcome::{BatchOutcome, FailureSample, FileOutcome, SkipReason};
pub use prompt::{AutoConfirm, ConfirmPrompt, Confirmation};
pub use rename::{RenamePlan, RenameReport, TagRenameWorkflow};

use rt_storage::{MetadataSideEffects, VaultAccess};

/// Collaborators a workflow drives. Borrowed for the duration of one run.
pub struct Services<'a> {
    pub vault: &'a dyn VaultAccess,
    pub metadata: &'a mut dyn MetadataSideEffects,
    pub notifier: &'a mut dyn NotificationSink,
    pub events: &'a mut dyn EventBus,
    pub prompt: &'a mut dyn ConfirmPrompt,
}
