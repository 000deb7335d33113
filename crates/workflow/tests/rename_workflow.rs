#![forbid(unsafe_code)]

use rt_core::TagDescriptor;
use rt_core::frontmatter::{parse_frontmatter, split_frontmatter};
use rt_storage::{MemoryVault, MetadataSideEffects, StoreError, StructuredTagCache, VaultAccess};
use rt_workflow::{
    AutoConfirm, CancelFlag, Confirmation, Notice, NoticeVariant, RenameFile, RenameReport,
    Services, SkipReason, TagEvent, TagRenameWorkflow, WorkflowError, WorkflowOptions,
    collect_rename_targets,
};
use serde_yaml::{Mapping, Value};

#[derive(Debug, Default)]
struct RecordingMetadata {
    renames: Vec<(String, String, bool)>,
}

impl MetadataSideEffects for RecordingMetadata {
    fn handle_tag_rename(
        &mut self,
        old_path: &str,
        new_path: &str,
        preserve_destination: bool,
    ) -> Result<(), StoreError> {
        self.renames
            .push((old_path.to_string(), new_path.to_string(), preserve_destination));
        Ok(())
    }

    fn handle_tag_delete(&mut self, _path: &str) -> Result<(), StoreError> {
        Ok(())
    }
}

#[derive(Default)]
struct Harness {
    metadata: RecordingMetadata,
    notices: Vec<Notice>,
    events: Vec<TagEvent>,
    confirmations: Vec<Confirmation>,
    options: WorkflowOptions,
    cancel: Option<CancelFlag>,
}

impl Harness {
    async fn rename(
        &mut self,
        vault: &dyn VaultAccess,
        old: &str,
        new: &str,
        preset: Option<Vec<RenameFile>>,
    ) -> Result<RenameReport, WorkflowError> {
        let confirmations = &mut self.confirmations;
        let mut prompt = |request: &Confirmation| {
            confirmations.push(request.clone());
            true
        };
        let services = Services {
            vault,
            metadata: &mut self.metadata,
            notifier: &mut self.notices,
            events: &mut self.events,
            prompt: &mut prompt,
        };
        let mut workflow = TagRenameWorkflow::new(services, self.options.clone());
        if let Some(cancel) = self.cancel.clone() {
            workflow = workflow.with_cancel(cancel);
        }
        workflow.run_with_targets(old, new, preset).await
    }

    fn warnings(&self) -> Vec<&str> {
        self.notices
            .iter()
            .filter(|notice| notice.variant == NoticeVariant::Warning)
            .map(|notice| notice.message.as_str())
            .collect()
    }
}

/// Refuses writes to one document.
struct FlakyVault {
    inner: MemoryVault,
    broken: &'static str,
}

impl VaultAccess for FlakyVault {
    fn read(&self, path: &str) -> Result<String, StoreError> {
        self.inner.read(path)
    }

    fn modify(&self, path: &str, text: &str) -> Result<(), StoreError> {
        if path == self.broken {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )));
        }
        self.inner.modify(path, text)
    }

    fn exists(&self, path: &str) -> bool {
        self.inner.exists(path)
    }

    fn list_documents(&self) -> Result<Vec<String>, StoreError> {
        self.inner.list_documents()
    }

    fn process_frontmatter(
        &self,
        path: &str,
        mutate: &mut dyn FnMut(&mut Mapping) -> bool,
    ) -> Result<bool, StoreError> {
        self.inner.process_frontmatter(path, mutate)
    }

    fn tag_cache(&self, path: &str) -> Result<Option<StructuredTagCache>, StoreError> {
        self.inner.tag_cache(path)
    }
}

fn frontmatter_list(text: &str, key: &str) -> Vec<String> {
    let block = split_frontmatter(text).expect("frontmatter block");
    let mapping = parse_frontmatter(block.yaml).expect("yaml");
    mapping
        .get(Value::from(key))
        .and_then(Value::as_sequence)
        .expect("sequence")
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn renames_inline_and_frontmatter_across_the_vault() {
    let vault = MemoryVault::with_documents([
        ("doc1.md", "Today #work/urgent needs a reply.\n"),
        ("doc2.md", "---\ntags: [work/urgent, personal]\n---\nMeeting notes\n"),
        ("doc3.md", "Groceries #home\n"),
    ]);
    let targets = collect_rename_targets(&vault, &TagDescriptor::new("work/urgent")).expect("scan");
    let paths = targets.iter().map(|t| t.path.as_str()).collect::<Vec<_>>();
    assert_eq!(paths, vec!["doc1.md", "doc2.md"]);

    let mut harness = Harness::default();
    let report = harness
        .rename(&vault, "work/urgent", "work/important", None)
        .await
        .expect("rename");

    assert_eq!(report.renamed(), 2);
    assert_eq!(report.outcome.total, 2);
    assert_eq!(report.outcome.skipped_count(), 0);
    assert_eq!(report.outcome.failed_count(), 0);
    assert!(report.finalized);

    assert_eq!(
        vault.get("doc1.md").as_deref(),
        Some("Today #work/important needs a reply.\n")
    );
    let doc2 = vault.get("doc2.md").expect("doc2");
    assert_eq!(frontmatter_list(&doc2, "tags"), vec!["work/important", "personal"]);
    assert!(doc2.ends_with("---\nMeeting notes\n"));
    assert_eq!(vault.get("doc3.md").as_deref(), Some("Groceries #home\n"));

    assert_eq!(
        harness.metadata.renames,
        vec![("work/urgent".to_string(), "work/important".to_string(), false)]
    );
    assert_eq!(harness.events.len(), 1);
    assert_eq!(harness.notices.last().map(|n| n.variant), Some(NoticeVariant::Success));
    assert_eq!(harness.confirmations.len(), 1);
    assert_eq!(harness.confirmations[0].targets, 2);
}

#[tokio::test]
async fn rejects_renaming_into_itself_before_touching_files() {
    let original = "#a/b and #a/b/c\n";
    let vault = MemoryVault::with_documents([("a.md", original)]);

    for target in ["a/b/c", "a/b", "#A/B/x"] {
        let mut harness = Harness::default();
        let err = harness
            .rename(&vault, "a/b", target, None)
            .await
            .expect_err("must be rejected");
        assert!(
            matches!(
                err,
                WorkflowError::DescendantRename { .. } | WorkflowError::Unchanged(_)
            ),
            "{target}: {err}"
        );
        assert_eq!(harness.warnings().len(), 1);
        assert!(harness.confirmations.is_empty());
        assert!(harness.metadata.renames.is_empty());
        assert!(harness.events.is_empty());
    }
    assert_eq!(vault.get("a.md").as_deref(), Some(original));
}

#[tokio::test]
async fn case_only_rename_is_allowed() {
    let vault = MemoryVault::with_documents([("a.md", "#todo and #Todo/later\n")]);
    let mut harness = Harness::default();
    let report = harness
        .rename(&vault, "todo", "ToDo", None)
        .await
        .expect("rename");
    assert!(report.finalized);
    assert!(!report.merged_into_existing);
    assert_eq!(vault.get("a.md").as_deref(), Some("#ToDo and #ToDo/later\n"));
}

#[tokio::test]
async fn invalid_names_and_empty_corpus_are_reported() {
    let vault = MemoryVault::with_documents([("a.md", "#a\n")]);

    let mut harness = Harness::default();
    let err = harness
        .rename(&vault, "a", "has space", None)
        .await
        .expect_err("invalid");
    assert!(matches!(err, WorkflowError::InvalidTag { .. }));

    let mut harness = Harness::default();
    let err = harness
        .rename(&vault, "missing", "other", None)
        .await
        .expect_err("no targets");
    assert!(matches!(err, WorkflowError::NoTargets(_)));
    assert_eq!(harness.warnings(), vec!["no notes use #missing"]);
}

#[tokio::test]
async fn rename_then_inverse_restores_the_bytes() {
    let original = "Plan #project/draft here, and #project/draft/v2.\n```\n#project/draft\n```\n`#project/draft`\n";
    let vault = MemoryVault::with_documents([("a.md", original)]);
    let mut harness = Harness::default();

    harness
        .rename(&vault, "project/draft", "project/final", None)
        .await
        .expect("forward");
    let forward = vault.get("a.md").expect("doc");
    assert!(forward.starts_with("Plan #project/final here, and #project/final/v2.\n"));
    assert!(forward.contains("```\n#project/draft\n```\n`#project/draft`\n"));

    harness
        .rename(&vault, "project/final", "project/draft", None)
        .await
        .expect("inverse");
    assert_eq!(vault.get("a.md").as_deref(), Some(original));
}

#[tokio::test]
async fn merge_into_existing_tag_preserves_destination() {
    let vault = MemoryVault::with_documents([("a.md", "#a here\n"), ("b.md", "#b there\n")]);
    let mut harness = Harness::default();
    let report = harness.rename(&vault, "a", "b", None).await.expect("rename");

    assert!(report.merged_into_existing);
    let merge = harness.confirmations[0].merge.clone().expect("merge conflict");
    assert_eq!(merge.original.tag(), "#a");
    assert_eq!(merge.conflict.tag(), "#b");

    assert_eq!(
        harness.metadata.renames,
        vec![("a".to_string(), "b".to_string(), true)]
    );
    match &harness.events[0] {
        TagEvent::TagRenamed(event) => assert!(event.merged_into_existing),
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(vault.get("a.md").as_deref(), Some("#b here\n"));
}

#[tokio::test]
async fn stale_scan_skips_the_file_and_blocks_finalization() {
    let vault = MemoryVault::with_documents([("a.md", "#a one\n#a two\n"), ("b.md", "#a\n")]);
    let preset = collect_rename_targets(&vault, &TagDescriptor::new("a")).expect("scan");
    vault.insert("a.md", "zz one\n#a two\n");

    let mut harness = Harness::default();
    let report = harness
        .rename(&vault, "a", "c", Some(preset))
        .await
        .expect("rename");

    assert_eq!(report.renamed(), 1);
    assert_eq!(report.outcome.skipped_for(SkipReason::FileChanged), 1);
    assert!(!report.finalized);
    assert_eq!(vault.get("a.md").as_deref(), Some("zz one\n#a two\n"));
    assert_eq!(vault.get("b.md").as_deref(), Some("#c\n"));
    assert!(harness.metadata.renames.is_empty());
    assert!(harness.events.is_empty());
    let warnings = harness.warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].starts_with("Updated 1/2 notes; 1 skipped, 0 failed."));
}

#[tokio::test]
async fn one_failing_file_does_not_abort_the_batch() {
    let vault = FlakyVault {
        inner: MemoryVault::with_documents([
            ("a.md", "#t\n"),
            ("b.md", "#t\n"),
            ("c.md", "#t\n"),
        ]),
        broken: "b.md",
    };
    let mut harness = Harness::default();
    let report = harness.rename(&vault, "t", "u", None).await.expect("rename");

    assert_eq!(report.renamed(), 2);
    assert_eq!(report.outcome.failed.get("io: read-only"), Some(&1));
    assert_eq!(report.outcome.failure_samples[0].path, "b.md");
    assert!(!report.finalized);
    assert_eq!(vault.inner.get("c.md").as_deref(), Some("#u\n"));
    assert!(harness.metadata.renames.is_empty());
    assert!(harness.warnings()[0].ends_with("Check the logs for details."));
}

#[tokio::test]
async fn batch_accounting_adds_up() {
    let mut documents = (0..7)
        .map(|idx| (format!("n{idx}.md"), format!("note {idx} #t\n")))
        .collect::<Vec<_>>();
    documents.push(("same.md".to_string(), "#T\n".to_string()));
    let vault = MemoryVault::with_documents(documents);
    let preset = collect_rename_targets(&vault, &TagDescriptor::new("t")).expect("scan");
    vault.remove("n1.md");
    vault.insert("n2.md", "note 2 ##\n");

    let mut harness = Harness {
        options: WorkflowOptions {
            batch_size: 3,
            ..WorkflowOptions::default()
        },
        ..Harness::default()
    };
    let report = harness
        .rename(&vault, "t", "T", Some(preset))
        .await
        .expect("rename");
    let outcome = &report.outcome;

    assert_eq!(outcome.total, 8);
    assert_eq!(outcome.changed, 5);
    assert_eq!(outcome.skipped_for(SkipReason::FileMissing), 1);
    assert_eq!(outcome.skipped_for(SkipReason::FileChanged), 1);
    assert_eq!(outcome.skipped_for(SkipReason::NoOp), 1);
    assert_eq!(outcome.skipped_count(), 3);
    assert_eq!(
        outcome.changed + outcome.skipped_count() + outcome.failed_count(),
        outcome.total
    );
    assert!(outcome.is_consistent());
}

#[tokio::test]
async fn cancelled_batch_leaves_targets_unprocessed() {
    let vault = MemoryVault::with_documents([("a.md", "#t\n"), ("b.md", "#t\n")]);
    let cancel = CancelFlag::new();
    cancel.cancel();
    let mut harness = Harness {
        cancel: Some(cancel),
        ..Harness::default()
    };
    let report = harness.rename(&vault, "t", "u", None).await.expect("rename");

    assert!(report.outcome.cancelled);
    assert_eq!(report.outcome.not_processed, 2);
    assert_eq!(report.renamed(), 0);
    assert!(!report.finalized);
    assert_eq!(vault.get("a.md").as_deref(), Some("#t\n"));
}

#[tokio::test]
async fn declined_confirmation_touches_nothing() {
    let vault = MemoryVault::with_documents([("a.md", "#t\n")]);
    let mut metadata = RecordingMetadata::default();
    let mut notices: Vec<Notice> = Vec::new();
    let mut events: Vec<TagEvent> = Vec::new();
    let mut prompt = |_: &Confirmation| false;
    let services = Services {
        vault: &vault,
        metadata: &mut metadata,
        notifier: &mut notices,
        events: &mut events,
        prompt: &mut prompt,
    };
    let err = TagRenameWorkflow::new(services, WorkflowOptions::default())
        .run("t", "u")
        .await
        .expect_err("declined");
    assert!(matches!(err, WorkflowError::Declined));
    assert_eq!(vault.get("a.md").as_deref(), Some("#t\n"));
    assert!(events.is_empty());
}

#[tokio::test]
async fn auto_confirm_runs_without_asking() {
    let vault = MemoryVault::with_documents([("a.md", "#t\n")]);
    let mut metadata = RecordingMetadata::default();
    let mut notices: Vec<Notice> = Vec::new();
    let mut events: Vec<TagEvent> = Vec::new();
    let services = Services {
        vault: &vault,
        metadata: &mut metadata,
        notifier: &mut notices,
        events: &mut events,
        prompt: &mut AutoConfirm,
    };
    let report = TagRenameWorkflow::new(services, WorkflowOptions::default())
        .run("t", "u")
        .await
        .expect("rename");
    assert!(report.finalized);
}

#[tokio::test]
async fn frontmatter_neighbours_differing_only_in_case_are_left_alone() {
    let vault = MemoryVault::with_documents([
        ("a.md", "---\ntags: [WorkShop, work, Work/Urgent]\n---\nbody\n"),
        ("b.md", "---\ntags: [workshop, work, work/urgent]\n---\nbody\n"),
    ]);
    let mut harness = Harness::default();

    let report = harness
        .rename(&vault, "work", "job", None)
        .await
        .expect("rename");

    assert_eq!(report.renamed(), 2);
    assert!(report.finalized);
    assert_eq!(
        vault.get("a.md").as_deref(),
        Some("---\ntags:\n- WorkShop\n- job\n- job/Urgent\n---\nbody\n")
    );
    assert_eq!(
        vault.get("b.md").as_deref(),
        Some("---\ntags:\n- workshop\n- job\n- job/urgent\n---\nbody\n")
    );
}
