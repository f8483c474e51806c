//! SQLite persistence for notehub-daemon.
//!
//! This is the single-writer store backing the daemon. Two tables: `kv` holds
//! tracker config and state under their string keys, and `paragraphs` holds
//! document bodies, one row per element ordered by `position`.

use chrono::Utc;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::path::PathBuf;

use tracker_core::{
    Document, DocumentHost, ElementKind, MemoryDocument, Paragraph, StateStore, TrackerError,
};

#[derive(Debug, Clone)]
pub struct Db {
    path: PathBuf,
}

impl Db {
    pub fn new(path: PathBuf) -> Result<Self, String> {
        let db = Self { path };
        db.init_schema()?;
        Ok(db)
    }

    pub fn get_value(&self, key: &str) -> Result<Option<String>, String> {
        self.with_connection(|conn| {
            conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()
            .map_err(|err| format!("Failed to read key {}: {}", key, err))
        })
    }

    pub fn set_value(&self, key: &str, value: &str) -> Result<(), String> {
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3) \
                 ON CONFLICT(key) DO UPDATE SET \
                    value = excluded.value, \
                    updated_at = excluded.updated_at",
                params![key, value, Utc::now().to_rfc3339()],
            )
            .map_err(|err| format!("Failed to write key {}: {}", key, err))?;
            Ok(())
        })
    }

    /// Paragraphs of `doc_id` in body order. Unknown documents have none.
    pub fn load_paragraphs(&self, doc_id: &str) -> Result<Vec<Paragraph>, String> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT kind, text FROM paragraphs WHERE doc_id = ?1 ORDER BY position ASC",
                )
                .map_err(|err| format!("Failed to prepare paragraphs query: {}", err))?;

            let rows = stmt
                .query_map(params![doc_id], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })
                .map_err(|err| format!("Failed to read paragraph rows: {}", err))?;

            let mut paragraphs = Vec::new();
            for row in rows {
                let (kind, text) =
                    row.map_err(|err| format!("Failed to decode paragraph row: {}", err))?;
                paragraphs.push(Paragraph::with_kind(ElementKind::parse(&kind), text));
            }
            Ok(paragraphs)
        })
    }

    /// Replaces the stored body of `doc_id` in one transaction.
    pub fn save_paragraphs(&self, doc_id: &str, paragraphs: &[Paragraph]) -> Result<(), String> {
        self.with_connection(|conn| {
            let tx = conn
                .transaction()
                .map_err(|err| format!("Failed to start document transaction: {}", err))?;
            tx.execute("DELETE FROM paragraphs WHERE doc_id = ?1", params![doc_id])
                .map_err(|err| format!("Failed to clear document {}: {}", doc_id, err))?;
            for (position, paragraph) in paragraphs.iter().enumerate() {
                tx.execute(
                    "INSERT INTO paragraphs (doc_id, position, kind, text) VALUES (?1, ?2, ?3, ?4)",
                    params![
                        doc_id,
                        position as i64,
                        paragraph.kind.as_str(),
                        paragraph.text
                    ],
                )
                .map_err(|err| format!("Failed to write paragraph {}: {}", position, err))?;
            }
            tx.commit()
                .map_err(|err| format!("Failed to commit document {}: {}", doc_id, err))
        })
    }

    fn init_schema(&self) -> Result<(), String> {
        self.with_connection(|conn| {
            conn.execute_batch(
                "BEGIN;
                 CREATE TABLE IF NOT EXISTS kv (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                 );
                 CREATE TABLE IF NOT EXISTS paragraphs (
                    doc_id TEXT NOT NULL,
                    position INTEGER NOT NULL,
                    kind TEXT NOT NULL,
                    text TEXT NOT NULL,
                    PRIMARY KEY (doc_id, position)
                 );
                 COMMIT;",
            )
            .map_err(|err| format!("Failed to initialize schema: {}", err))
        })
    }

    fn with_connection<T>(
        &self,
        op: impl FnOnce(&mut Connection) -> Result<T, String>,
    ) -> Result<T, String> {
        let mut conn = self.open_connection()?;
        op(&mut conn)
    }

    fn open_connection(&self) -> Result<Connection, String> {
        if let Some(parent) = self.path.parent() {
            fs_err::create_dir_all(parent)
                .map_err(|err| format!("Failed to create daemon data dir: {}", err))?;
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_FULL_MUTEX;

        let conn = Connection::open_with_flags(&self.path, flags)
            .map_err(|err| format!("Failed to open sqlite db: {}", err))?;

        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|err| format!("Failed to enable WAL: {}", err))?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .map_err(|err| format!("Failed to set synchronous: {}", err))?;
        conn.pragma_update(None, "busy_timeout", 5000)
            .map_err(|err| format!("Failed to set busy_timeout: {}", err))?;

        Ok(conn)
    }
}

impl StateStore for Db {
    fn get(&self, key: &str) -> tracker_core::Result<Option<String>> {
        self.get_value(key)
            .map_err(|err| TrackerError::store("kv read", err))
    }

    fn set(&mut self, key: &str, value: &str) -> tracker_core::Result<()> {
        self.set_value(key, value)
            .map_err(|err| TrackerError::store("kv write", err))
    }
}

/// Documents are loaded whole into memory and written back on commit.
impl DocumentHost for Db {
    type Doc = MemoryDocument;

    fn open(&self, doc_id: &str) -> tracker_core::Result<MemoryDocument> {
        let paragraphs = self
            .load_paragraphs(doc_id)
            .map_err(|err| TrackerError::store("document load", err))?;
        Ok(MemoryDocument::from_paragraphs(doc_id, paragraphs))
    }

    fn commit(&self, doc: &MemoryDocument) -> tracker_core::Result<()> {
        self.save_paragraphs(doc.id(), doc.body())
            .map_err(|err| TrackerError::store("document commit", err))
    }
}
