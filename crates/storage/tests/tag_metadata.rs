#![forbid(unsafe_code)]

use rt_storage::{MetadataSideEffects, Shortcut, SqliteTagMetadata};

fn tag(path: &str) -> Shortcut {
    Shortcut::Tag {
        path: path.to_string(),
    }
}

fn targets(store: &mut SqliteTagMetadata) -> Vec<String> {
    store
        .shortcuts()
        .expect("shortcuts")
        .into_iter()
        .map(|s| format!("{}:{}", s.shortcut.kind(), s.shortcut.target()))
        .collect()
}

fn appearance_tags(store: &SqliteTagMetadata) -> Vec<(String, Option<String>)> {
    store
        .appearances()
        .expect("appearances")
        .into_iter()
        .map(|a| (a.tag, a.icon))
        .collect()
}

#[test]
fn appearance_is_keyed_by_canonical_path() {
    let mut store = SqliteTagMetadata::open_in_memory().expect("open");
    store
        .set_appearance("#Project/Draft", Some("pencil"), None)
        .expect("set");
    let updated = store
        .set_appearance("project/draft", None, Some("red"))
        .expect("set");
    assert_eq!(updated.tag, "project/draft");
    assert_eq!(updated.icon.as_deref(), Some("pencil"));
    assert_eq!(updated.color.as_deref(), Some("red"));
    assert!(store.appearance("PROJECT/DRAFT").expect("get").is_some());
    assert!(store.set_appearance("#", Some("x"), None).is_err());
}

#[test]
fn rename_moves_the_tag_and_its_descendants() {
    let mut store = SqliteTagMetadata::open_in_memory().expect("open");
    store.set_appearance("project/draft", Some("a"), None).expect("set");
    store.set_appearance("project/draft/old", Some("b"), None).expect("set");
    store.set_appearance("project/drafts", Some("c"), None).expect("set");
    store.add_shortcut(&Shortcut::from_parts("note", "notes/a.md").expect("note")).expect("add");
    store.add_shortcut(&tag("Project/Draft/Old")).expect("add");
    store.add_shortcut(&tag("project/drafts")).expect("add");

    store
        .handle_tag_rename("project/draft", "project/final", false)
        .expect("rename");

    assert_eq!(
        appearance_tags(&store),
        vec![
            ("project/drafts".to_string(), Some("c".to_string())),
            ("project/final".to_string(), Some("a".to_string())),
            ("project/final/old".to_string(), Some("b".to_string())),
        ]
    );
    assert_eq!(
        targets(&mut store),
        vec!["note:notes/a.md", "tag:project/final/Old", "tag:project/drafts"]
    );
}

#[test]
fn preserve_destination_keeps_existing_records() {
    let mut store = SqliteTagMetadata::open_in_memory().expect("open");
    store.set_appearance("a", Some("from-a"), None).expect("set");
    store.set_appearance("b", Some("from-b"), None).expect("set");
    store.add_shortcut(&tag("a")).expect("add");
    store.add_shortcut(&tag("b")).expect("add");

    store.handle_tag_rename("a", "b", true).expect("rename");

    assert_eq!(
        appearance_tags(&store),
        vec![("b".to_string(), Some("from-b".to_string()))]
    );
    assert_eq!(targets(&mut store), vec!["tag:b"]);
}

#[test]
fn plain_rename_overwrites_destination_records() {
    let mut store = SqliteTagMetadata::open_in_memory().expect("open");
    store.set_appearance("a", Some("from-a"), None).expect("set");
    store.set_appearance("b", Some("from-b"), None).expect("set");
    store.add_shortcut(&tag("a")).expect("add");
    store.add_shortcut(&tag("b")).expect("add");

    store.handle_tag_rename("a", "b", false).expect("rename");

    assert_eq!(
        appearance_tags(&store),
        vec![("b".to_string(), Some("from-a".to_string()))]
    );
    assert_eq!(targets(&mut store), vec!["tag:b"]);
}

#[test]
fn delete_drops_the_subtree_only() {
    let mut store = SqliteTagMetadata::open_in_memory().expect("open");
    store.set_appearance("p", Some("1"), None).expect("set");
    store.set_appearance("p/q", Some("2"), None).expect("set");
    store.set_appearance("pq", Some("3"), None).expect("set");
    store.add_shortcut(&tag("p/q")).expect("add");
    store.add_shortcut(&Shortcut::from_parts("search", "#p").expect("search")).expect("add");

    store.handle_tag_delete("#P").expect("delete");

    assert_eq!(
        appearance_tags(&store),
        vec![("pq".to_string(), Some("3".to_string()))]
    );
    assert_eq!(targets(&mut store), vec!["search:#p"]);
}

#[test]
fn duplicate_tag_shortcuts_are_refused() {
    let mut store = SqliteTagMetadata::open_in_memory().expect("open");
    assert!(store.add_shortcut(&tag("Work")).expect("add"));
    assert!(!store.add_shortcut(&tag("#work")).expect("add"));
    assert!(store.remove_shortcut(&tag("Work")).expect("remove"));
    assert!(store.shortcuts().expect("list").is_empty());
}

#[test]
fn records_survive_reopening() {
    let dir = tempfile::tempdir().expect("temp dir");
    let db = dir.path().join("nested").join("metadata.db");
    {
        let mut store = SqliteTagMetadata::open(&db).expect("open");
        store.set_appearance("keep", Some("star"), None).expect("set");
    }
    let store = SqliteTagMetadata::open(&db).expect("reopen");
    let found = store.appearance("keep").expect("get").expect("exists");
    assert_eq!(found.icon.as_deref(), Some("star"));
}
