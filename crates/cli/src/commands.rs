#![forbid(unsafe_code)]

use crate::cli::{MetaCommand, ShortcutCommand, ShortcutKind};
use crate::config::RetagConfig;
use rt_core::TagDescriptor;
use rt_storage::{FsVault, Shortcut, SqliteTagMetadata, StoreError};
use rt_workflow::{
    AutoConfirm, ConfirmPrompt, EventBus, Services, TagCorpus, TagDeleteWorkflow,
    TagRenameWorkflow, TracingNotifier, WorkflowError, collect_rename_targets,
};
use serde::Serialize;
use std::io::Write;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

impl CommandError {
    /// 2 for rejected input, 1 for everything else.
    pub fn exit_status(&self) -> u8 {
        let usage = matches!(
            self,
            Self::Store(StoreError::InvalidInput(_) | StoreError::InvalidPath(_))
                | Self::Workflow(
                    WorkflowError::InvalidTag { .. }
                        | WorkflowError::Unchanged(_)
                        | WorkflowError::DescendantRename { .. }
                )
        );
        if usage { 2 } else { 1 }
    }
}

/// One invocation's view of the vault.
pub struct Context {
    pub vault: FsVault,
    pub config: RetagConfig,
    pub json: bool,
}

#[derive(Serialize)]
struct ScanEntry<'a> {
    path: &'a str,
    inline: usize,
    frontmatter: bool,
}

impl Context {
    fn open_metadata(&self) -> Result<SqliteTagMetadata, StoreError> {
        SqliteTagMetadata::open(self.config.metadata_db_path(self.vault.root()))
    }

    fn runtime() -> Result<tokio::runtime::Runtime, std::io::Error> {
        tokio::runtime::Builder::new_current_thread().build()
    }

    fn print_json<T: Serialize>(out: &mut dyn Write, value: &T) -> Result<(), CommandError> {
        serde_json::to_writer_pretty(&mut *out, value)?;
        writeln!(out)?;
        Ok(())
    }

    pub fn tags(&self, out: &mut dyn Write) -> Result<(), CommandError> {
        let corpus = TagCorpus::collect(&self.vault)?;
        if self.json {
            let usages = corpus.usages().collect::<Vec<_>>();
            Self::print_json(out, &usages)?;
        } else {
            for usage in corpus.usages() {
                writeln!(out, "{:>5}  {}", usage.count, usage.tag)?;
            }
        }
        Ok(())
    }

    pub fn scan(&self, tag: &str, out: &mut dyn Write) -> Result<(), CommandError> {
        let tag = TagDescriptor::new(tag);
        let targets = collect_rename_targets(&self.vault, &tag)?;
        let entries = targets
            .iter()
            .map(|target| ScanEntry {
                path: &target.path,
                inline: target.occurrences.len(),
                frontmatter: target.has_frontmatter,
            })
            .collect::<Vec<_>>();
        if self.json {
            Self::print_json(out, &entries)?;
            return Ok(());
        }
        for entry in &entries {
            let where_ = match (entry.inline, entry.frontmatter) {
                (0, _) => "frontmatter".to_string(),
                (n, true) => format!("{n} inline + frontmatter"),
                (n, false) => format!("{n} inline"),
            };
            writeln!(out, "{}\t{where_}", entry.path)?;
        }
        writeln!(out, "{} notes use {}", entries.len(), tag.tag())?;
        Ok(())
    }

    /// Returns whether the rename was finalized.
    pub fn rename(
        &self,
        old: &str,
        new: &str,
        prompt: &mut dyn ConfirmPrompt,
        events: &mut dyn EventBus,
        out: &mut dyn Write,
    ) -> Result<bool, CommandError> {
        let mut metadata = self.open_metadata()?;
        let mut notifier = TracingNotifier;
        let services = Services {
            vault: &self.vault,
            metadata: &mut metadata,
            notifier: &mut notifier,
            events,
            prompt,
        };
        let mut workflow = TagRenameWorkflow::new(services, self.config.workflow.clone());
        let report = Self::runtime()?.block_on(workflow.run(old, new))?;

        if self.json {
            Self::print_json(out, &report)?;
        } else {
            writeln!(
                out,
                "renamed {} to {} in {}/{} notes ({} skipped, {} failed)",
                TagDescriptor::new(old).tag(),
                TagDescriptor::new(new).tag(),
                report.renamed(),
                report.outcome.total,
                report.outcome.skipped_count(),
                report.outcome.failed_count()
            )?;
        }
        Ok(report.finalized)
    }

    pub fn delete(
        &self,
        tag: &str,
        prompt: &mut dyn ConfirmPrompt,
        events: &mut dyn EventBus,
        out: &mut dyn Write,
    ) -> Result<bool, CommandError> {
        let mut metadata = self.open_metadata()?;
        let mut notifier = TracingNotifier;
        let services = Services {
            vault: &self.vault,
            metadata: &mut metadata,
            notifier: &mut notifier,
            events,
            prompt,
        };
        let mut workflow = TagDeleteWorkflow::new(services, self.config.workflow.clone());
        let report = Self::runtime()?.block_on(workflow.run(tag))?;

        if self.json {
            Self::print_json(out, &report)?;
        } else {
            writeln!(
                out,
                "removed {} from {}/{} notes ({} skipped, {} failed)",
                TagDescriptor::new(tag).tag(),
                report.removed(),
                report.outcome.total,
                report.outcome.skipped_count(),
                report.outcome.failed_count()
            )?;
        }
        Ok(report.finalized)
    }

    pub fn meta(&self, command: MetaCommand, out: &mut dyn Write) -> Result<(), CommandError> {
        let mut metadata = self.open_metadata()?;
        match command {
            MetaCommand::Set { tag, icon, color } => {
                if icon.is_none() && color.is_none() {
                    let err = StoreError::InvalidInput("pass --icon and/or --color".into());
                    return Err(err.into());
                }
                let stored = metadata.set_appearance(&tag, icon.as_deref(), color.as_deref())?;
                if self.json {
                    Self::print_json(out, &stored)?;
                } else {
                    writeln!(out, "{}", describe_appearance(&stored))?;
                }
            }
            MetaCommand::List => {
                let all = metadata.appearances()?;
                if self.json {
                    Self::print_json(out, &all)?;
                } else {
                    for stored in &all {
                        writeln!(out, "{}", describe_appearance(stored))?;
                    }
                }
            }
        }
        Ok(())
    }

    pub fn shortcut(
        &self,
        command: ShortcutCommand,
        out: &mut dyn Write,
    ) -> Result<(), CommandError> {
        let mut metadata = self.open_metadata()?;
        match command {
            ShortcutCommand::Add { kind, value } => {
                let shortcut = shortcut_from(kind, &value)?;
                if metadata.add_shortcut(&shortcut)? {
                    writeln!(out, "added {} {}", shortcut.kind(), shortcut.target())?;
                } else {
                    writeln!(
                        out,
                        "{} {} is already a shortcut",
                        shortcut.kind(),
                        shortcut.target()
                    )?;
                }
            }
            ShortcutCommand::Remove { kind, value } => {
                let shortcut = shortcut_from(kind, &value)?;
                if !metadata.remove_shortcut(&shortcut)? {
                    return Err(StoreError::NotFound(format!(
                        "{} shortcut {}",
                        shortcut.kind(),
                        shortcut.target()
                    ))
                    .into());
                }
                writeln!(out, "removed {} {}", shortcut.kind(), shortcut.target())?;
            }
            ShortcutCommand::List => {
                let all = metadata.shortcuts()?;
                if self.json {
                    Self::print_json(out, &all)?;
                } else {
                    for stored in &all {
                        writeln!(
                            out,
                            "{:>3}. {:<6} {}",
                            stored.position,
                            stored.shortcut.kind(),
                            stored.shortcut.target()
                        )?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Confirmation for interactive runs, or none with `--yes`.
pub fn prompt_for(yes: bool) -> Box<dyn ConfirmPrompt> {
    if yes {
        Box::new(AutoConfirm)
    } else {
        Box::new(crate::prompt::LinePrompt::stdin())
    }
}

fn shortcut_from(kind: ShortcutKind, value: &str) -> Result<Shortcut, StoreError> {
    Shortcut::from_parts(kind.as_str(), value)
}

fn describe_appearance(stored: &rt_storage::TagAppearance) -> String {
    format!(
        "#{}  icon={}  color={}",
        stored.tag,
        stored.icon.as_deref().unwrap_or("-"),
        stored.color.as_deref().unwrap_or("-")
    )
}
