#![forbid(unsafe_code)]

use rt_storage::{MemoryVault, MetadataSideEffects, Shortcut, SqliteTagMetadata, StoreError};
use rt_workflow::{
    AutoConfirm, DeleteReport, Notice, NoticeVariant, Services, SkipReason, TagDeleteWorkflow,
    TagEvent, WorkflowError, WorkflowOptions, collect_delete_targets,
};

#[derive(Debug, Default)]
struct RecordingMetadata {
    deletes: Vec<String>,
}

impl MetadataSideEffects for RecordingMetadata {
    fn handle_tag_rename(&mut self, _: &str, _: &str, _: bool) -> Result<(), StoreError> {
        Ok(())
    }

    fn handle_tag_delete(&mut self, path: &str) -> Result<(), StoreError> {
        self.deletes.push(path.to_string());
        Ok(())
    }
}

async fn delete<'a>(
    vault: &'a MemoryVault,
    metadata: &'a mut dyn MetadataSideEffects,
    notices: &'a mut Vec<Notice>,
    events: &'a mut Vec<TagEvent>,
    tag: &'a str,
) -> Result<DeleteReport, WorkflowError> {
    let services = Services {
        vault,
        metadata,
        notifier: notices,
        events,
        prompt: &mut AutoConfirm,
    };
    TagDeleteWorkflow::new(services, WorkflowOptions::default())
        .run(tag)
        .await
}

#[tokio::test]
async fn removes_the_tag_tree_everywhere() {
    let vault = MemoryVault::with_documents([
        ("a.md", "Call #mom about #mom/gift soon\n"),
        ("b.md", "---\ntags: [mom, family]\n---\nbody\n"),
        ("c.md", "```\n#mom\n```\n#momentum\n"),
    ]);
    let mut metadata = RecordingMetadata::default();
    let mut notices = Vec::new();
    let mut events = Vec::new();

    let report = delete(&vault, &mut metadata, &mut notices, &mut events, "#mom")
        .await
        .expect("delete");

    assert_eq!(report.removed(), 2);
    assert_eq!(report.outcome.total, 2);
    assert!(report.finalized);
    assert_eq!(vault.get("a.md").as_deref(), Some("Call about soon\n"));
    assert_eq!(
        vault.get("b.md").as_deref(),
        Some("---\ntags:\n- family\n---\nbody\n")
    );
    assert_eq!(vault.get("c.md").as_deref(), Some("```\n#mom\n```\n#momentum\n"));

    assert_eq!(metadata.deletes, vec!["mom"]);
    match &events[..] {
        [TagEvent::TagDeleted(event)] => {
            assert_eq!(event.path, "mom");
            assert_eq!(event.canonical_path, "mom");
        }
        other => panic!("unexpected events {other:?}"),
    }
    assert_eq!(notices.last().map(|n| n.variant), Some(NoticeVariant::Success));
}

#[tokio::test]
async fn missing_document_blocks_metadata_cleanup() {
    let vault = MemoryVault::with_documents([("a.md", "#x\n"), ("b.md", "#x\n")]);
    let preset = collect_delete_targets(&vault, &rt_core::TagDescriptor::new("x")).expect("scan");
    vault.remove("b.md");

    let mut metadata = RecordingMetadata::default();
    let mut notices: Vec<Notice> = Vec::new();
    let mut events: Vec<TagEvent> = Vec::new();
    let mut prompt = AutoConfirm;
    let services = Services {
        vault: &vault,
        metadata: &mut metadata,
        notifier: &mut notices,
        events: &mut events,
        prompt: &mut prompt,
    };
    let report = TagDeleteWorkflow::new(services, WorkflowOptions::default())
        .run_with_targets("x", Some(preset))
        .await
        .expect("delete");

    assert_eq!(report.removed(), 1);
    assert_eq!(report.outcome.skipped_for(SkipReason::FileMissing), 1);
    assert!(!report.finalized);
    assert!(metadata.deletes.is_empty());
    assert!(events.is_empty());
    assert_eq!(notices.last().map(|n| n.variant), Some(NoticeVariant::Warning));
}

#[tokio::test]
async fn nothing_to_delete_is_a_warning() {
    let vault = MemoryVault::with_documents([("a.md", "no tags\n")]);
    let mut metadata = RecordingMetadata::default();
    let mut notices = Vec::new();
    let mut events = Vec::new();

    let err = delete(&vault, &mut metadata, &mut notices, &mut events, "ghost")
        .await
        .expect_err("no targets");
    assert!(matches!(err, WorkflowError::NoTargets(_)));
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].variant, NoticeVariant::Warning);
}

#[tokio::test]
async fn sqlite_metadata_follows_a_delete() {
    let vault = MemoryVault::with_documents([("a.md", "#proj/old and #proj/keep\n")]);
    let mut store = SqliteTagMetadata::open_in_memory().expect("store");
    store.set_appearance("proj/old", Some("box"), None).expect("set");
    store.set_appearance("proj/keep", Some("star"), None).expect("set");
    store
        .add_shortcut(&Shortcut::Tag {
            path: "proj/old/sub".to_string(),
        })
        .expect("shortcut");
    let mut notices = Vec::new();
    let mut events = Vec::new();

    delete(&vault, &mut store, &mut notices, &mut events, "proj/old")
        .await
        .expect("delete");

    assert_eq!(vault.get("a.md").as_deref(), Some(" and #proj/keep\n"));
    let left = store
        .appearances()
        .expect("appearances")
        .into_iter()
        .map(|a| a.tag)
        .collect::<Vec<_>>();
    assert_eq!(left, vec!["proj/keep"]);
    assert!(store.shortcuts().expect("shortcuts").is_empty());
}
