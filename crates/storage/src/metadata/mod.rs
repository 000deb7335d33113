#![forbid(unsafe_code)]

mod shortcuts;

pub use shortcuts::{Shortcut, StoredShortcut};

use crate::{MetadataSideEffects, StoreError, now_ms};
use rt_core::TagDescriptor;
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

/// Icon and color attached to a tag path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TagAppearance {
    /// Canonical tag path without the `#`.
    pub tag: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub updated_at_ms: i64,
}

/// Tag appearance and shortcuts kept in SQLite. Records keyed by a tag path
/// follow the tag through renames and deletes.
#[derive(Debug)]
pub struct SqliteTagMetadata {
    conn: Connection,
}

impl SqliteTagMetadata {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        install_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Sets icon and/or color for a tag. A `None` argument keeps the stored
    /// value.
    pub fn set_appearance(
        &mut self,
        tag: &str,
        icon: Option<&str>,
        color: Option<&str>,
    ) -> Result<TagAppearance, StoreError> {
        let tag = appearance_key(tag)?;
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO tag_appearance(tag, icon, color, updated_at_ms) VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(tag) DO UPDATE SET \
               icon = COALESCE(excluded.icon, tag_appearance.icon), \
               color = COALESCE(excluded.color, tag_appearance.color), \
               updated_at_ms = excluded.updated_at_ms",
            params![tag, icon, color, now_ms()],
        )?;
        let stored = appearance_tx(&tx, &tag)?.ok_or_else(|| StoreError::NotFound(tag.clone()))?;
        tx.commit()?;
        Ok(stored)
    }

    pub fn appearance(&self, tag: &str) -> Result<Option<TagAppearance>, StoreError> {
        let tag = appearance_key(tag)?;
        let found = self
            .conn
            .query_row(
                "SELECT tag, icon, color, updated_at_ms FROM tag_appearance WHERE tag=?1",
                params![tag],
                appearance_from_row,
            )
            .optional()?;
        Ok(found)
    }

    pub fn appearances(&self) -> Result<Vec<TagAppearance>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT tag, icon, color, updated_at_ms FROM tag_appearance ORDER BY tag ASC",
            )?;
        let rows = stmt.query_map([], appearance_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Appends a shortcut. Returns false when an equivalent one already exists.
    pub fn add_shortcut(&mut self, shortcut: &Shortcut) -> Result<bool, StoreError> {
        let tx = self.conn.transaction()?;
        if let Some(tag) = shortcut.tag() {
            let taken = shortcuts_tx(&tx)?.into_iter().any(|stored| {
                stored
                    .shortcut
                    .tag()
                    .is_some_and(|other| other.canonical() == tag.canonical())
            });
            if taken {
                return Ok(false);
            }
        }
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO shortcuts(kind, target) VALUES (?1, ?2)",
            params![shortcut.kind(), shortcut.target()],
        )?;
        tx.commit()?;
        Ok(inserted > 0)
    }

    pub fn shortcuts(&mut self) -> Result<Vec<StoredShortcut>, StoreError> {
        let tx = self.conn.transaction()?;
        let out = shortcuts_tx(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    pub fn remove_shortcut(&mut self, shortcut: &Shortcut) -> Result<bool, StoreError> {
        let removed = self.conn.execute(
            "DELETE FROM shortcuts WHERE kind=?1 AND target=?2",
            params![shortcut.kind(), shortcut.target()],
        )?;
        Ok(removed > 0)
    }
}

impl MetadataSideEffects for SqliteTagMetadata {
    fn handle_tag_rename(
        &mut self,
        old_path: &str,
        new_path: &str,
        preserve_destination: bool,
    ) -> Result<(), StoreError> {
        let from = TagDescriptor::new(old_path);
        let to = TagDescriptor::new(new_path);
        if from.is_empty() || to.is_empty() {
            return Err(StoreError::InvalidInput("rename needs two tag paths".into()));
        }

        let tx = self.conn.transaction()?;
        let moved = rename_appearance_tx(&tx, &from, &to, preserve_destination)?;
        let retargeted = rename_shortcuts_tx(&tx, &from, &to, preserve_destination)?;
        tx.commit()?;

        tracing::info!(
            from = %from.name(),
            to = %to.name(),
            preserve_destination,
            appearance = moved,
            shortcuts = retargeted,
            "tag metadata renamed"
        );
        Ok(())
    }

    fn handle_tag_delete(&mut self, path: &str) -> Result<(), StoreError> {
        let tag = TagDescriptor::new(path);
        if tag.is_empty() {
            return Err(StoreError::InvalidInput("delete needs a tag path".into()));
        }

        let tx = self.conn.transaction()?;
        let mut appearance = 0;
        for stored in appearances_tx(&tx)? {
            if tag.matches(&stored.tag) {
                appearance += tx.execute(
                    "DELETE FROM tag_appearance WHERE tag=?1",
                    params![stored.tag],
                )?;
            }
        }
        let mut shortcuts = 0;
        for stored in shortcuts_tx(&tx)? {
            if stored.shortcut.tag().is_some_and(|t| tag.matches(t.name())) {
                shortcuts += tx.execute(
                    "DELETE FROM shortcuts WHERE position=?1",
                    params![stored.position],
                )?;
            }
        }
        tx.commit()?;

        tracing::info!(tag = %tag.name(), appearance, shortcuts, "tag metadata deleted");
        Ok(())
    }
}

fn install_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS tag_appearance (
          tag TEXT PRIMARY KEY,
          icon TEXT,
          color TEXT,
          updated_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS shortcuts (
          position INTEGER PRIMARY KEY AUTOINCREMENT,
          kind TEXT NOT NULL,
          target TEXT NOT NULL,
          UNIQUE(kind, target)
        );
        "#,
    )?;
    Ok(())
}

fn appearance_key(tag: &str) -> Result<String, StoreError> {
    let tag = TagDescriptor::new(tag);
    if tag.is_empty() {
        return Err(StoreError::InvalidInput("empty tag".into()));
    }
    Ok(tag.canonical_name().to_string())
}

fn appearance_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TagAppearance> {
    Ok(TagAppearance {
        tag: row.get(0)?,
        icon: row.get(1)?,
        color: row.get(2)?,
        updated_at_ms: row.get(3)?,
    })
}

fn appearance_tx(tx: &Transaction<'_>, tag: &str) -> Result<Option<TagAppearance>, StoreError> {
    Ok(tx
        .query_row(
            "SELECT tag, icon, color, updated_at_ms FROM tag_appearance WHERE tag=?1",
            params![tag],
            appearance_from_row,
        )
        .optional()?)
}

fn appearances_tx(tx: &Transaction<'_>) -> Result<Vec<TagAppearance>, StoreError> {
    let mut stmt =
        tx.prepare("SELECT tag, icon, color, updated_at_ms FROM tag_appearance ORDER BY tag ASC")?;
    let rows = stmt.query_map([], appearance_from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

fn shortcuts_tx(tx: &Transaction<'_>) -> Result<Vec<StoredShortcut>, StoreError> {
    let mut stmt =
        tx.prepare("SELECT position, kind, target FROM shortcuts ORDER BY position ASC")?;
    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let position = row.get::<_, i64>(0)?;
        let kind = row.get::<_, String>(1)?;
        let target = row.get::<_, String>(2)?;
        out.push(StoredShortcut {
            position,
            shortcut: Shortcut::from_parts(&kind, &target)?,
        });
    }
    Ok(out)
}

/// Source rows are lifted out first, then written under their new key. With
/// `preserve_destination` an existing destination row is left as it is.
fn rename_appearance_tx(
    tx: &Transaction<'_>,
    from: &TagDescriptor,
    to: &TagDescriptor,
    preserve_destination: bool,
) -> Result<usize, StoreError> {
    let mut moves = Vec::new();
    for stored in appearances_tx(tx)? {
        if let Some(next) = TagDescriptor::new(&stored.tag).rebase(from, to) {
            moves.push((next.canonical_name().to_string(), stored));
        }
    }

    for (_, stored) in &moves {
        tx.execute(
            "DELETE FROM tag_appearance WHERE tag=?1",
            params![stored.tag],
        )?;
    }

    let insert = if preserve_destination {
        "INSERT OR IGNORE INTO tag_appearance(tag, icon, color, updated_at_ms) \
         VALUES (?1, ?2, ?3, ?4)"
    } else {
        "INSERT OR REPLACE INTO tag_appearance(tag, icon, color, updated_at_ms) \
         VALUES (?1, ?2, ?3, ?4)"
    };
    let now = now_ms();
    let mut written = 0;
    for (next, stored) in &moves {
        written += tx.execute(insert, params![next, stored.icon, stored.color, now])?;
    }
    Ok(written)
}

/// Tag shortcuts are retargeted in place so they keep their position. A
/// shortcut that would duplicate another tag shortcut is dropped.
fn rename_shortcuts_tx(
    tx: &Transaction<'_>,
    from: &TagDescriptor,
    to: &TagDescriptor,
    preserve_destination: bool,
) -> Result<usize, StoreError> {
    let stored = shortcuts_tx(tx)?;

    let mut kept = BTreeSet::new();
    if preserve_destination {
        for entry in &stored {
            if let Some(tag) = entry.shortcut.tag().filter(|t| !from.matches(t.name())) {
                kept.insert(tag.canonical().to_string());
            }
        }
    }

    let mut drops = Vec::new();
    let mut updates = Vec::new();
    for entry in &stored {
        let Some(tag) = entry.shortcut.tag() else {
            continue;
        };
        let next = tag.rebase(from, to);
        let canonical = next
            .as_ref()
            .map_or_else(|| tag.canonical().to_string(), |n| n.canonical().to_string());

        let untouched_destination = preserve_destination && next.is_none();
        if !untouched_destination && !kept.insert(canonical) {
            drops.push(entry.position);
            continue;
        }
        if let Some(next) = next {
            updates.push((entry.position, next.name().to_string()));
        }
    }

    for position in &drops {
        tx.execute("DELETE FROM shortcuts WHERE position=?1", params![position])?;
    }
    for (position, target) in &updates {
        tx.execute(
            "UPDATE shortcuts SET target=?2 WHERE position=?1",
            params![position, target],
        )?;
    }
    Ok(drops.len() + updates.len())
}
