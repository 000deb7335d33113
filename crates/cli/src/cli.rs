#![forbid(unsafe_code)]

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "retag",
    version,
    about = "Rename and delete hierarchical #tags across a markdown vault"
)]
pub struct Cli {
    /// Vault root directory.
    #[arg(long, global = true, env = "RETAG_VAULT", value_name = "DIR")]
    pub vault: Option<PathBuf>,
    /// Config file; defaults to <vault>/.retag.yaml when present.
    #[arg(long, global = true, env = "RETAG_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Log filter directives, e.g. `retag=debug`.
    #[arg(long, global = true, env = "RETAG_LOG", value_name = "FILTER")]
    pub log: Option<String>,
    /// Print results as JSON.
    #[arg(long, global = true)]
    pub json: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List every tag in the vault with its usage count.
    Tags,
    /// Show which notes use a tag or its nested tags.
    Scan { tag: String },
    /// Rename a tag and its nested tags.
    Rename {
        old: String,
        new: String,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Remove a tag and its nested tags from every note.
    Delete {
        tag: String,
        #[arg(long)]
        yes: bool,
    },
    /// Tag icons and colors.
    #[command(subcommand)]
    Meta(MetaCommand),
    /// Pinned notes, folders, tags and searches.
    #[command(subcommand)]
    Shortcut(ShortcutCommand),
}

#[derive(Debug, Subcommand)]
pub enum MetaCommand {
    Set {
        tag: String,
        #[arg(long)]
        icon: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    List,
}

#[derive(Debug, Subcommand)]
pub enum ShortcutCommand {
    Add { kind: ShortcutKind, value: String },
    Remove { kind: ShortcutKind, value: String },
    List,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ShortcutKind {
    Note,
    Folder,
    Tag,
    Search,
}

impl ShortcutKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::Folder => "folder",
            Self::Tag => "tag",
            Self::Search => "search",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_work_after_the_subcommand() {
        let args = ["retag", "rename", "a", "b", "--yes", "--json", "--vault", "/v"];
        let cli = Cli::try_parse_from(args).expect("parse");
        assert!(cli.json);
        assert_eq!(cli.vault, Some(PathBuf::from("/v")));
        match cli.command {
            Command::Rename { old, new, yes } => {
                assert_eq!((old.as_str(), new.as_str(), yes), ("a", "b", true));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn shortcut_kinds_parse() {
        let cli = Cli::try_parse_from(["retag", "shortcut", "add", "tag", "#work"]).expect("parse");
        match cli.command {
            Command::Shortcut(ShortcutCommand::Add { kind, value }) => {
                assert_eq!(kind, ShortcutKind::Tag);
                assert_eq!(value, "#work");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
