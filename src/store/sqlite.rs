//! SQLite implementation of the gloss store.

use super::{
    CachedGloss, GlossStore, PassageRecord, PlaySummary, SearchHit, StoreError, StoreResult,
};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

/// Maximum snippet length returned by search.
const SNIPPET_LEN: usize = 160;

/// SQLite-backed gloss cache.
///
/// A single database file with tables for passages, glosses, and
/// addenda. Thread-safe via internal mutex on the connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Database(rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
                })?;
            }
        }
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database, for tests.
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    /// Initialize the database schema.
    fn init_schema(conn: &Connection) -> StoreResult<()> {
        conn.execute_batch(
            r#"
            -- Passages, keyed by content hash
            CREATE TABLE IF NOT EXISTS passages (
                id INTEGER PRIMARY KEY,
                play TEXT NOT NULL,
                act INTEGER NOT NULL,
                scene INTEGER NOT NULL,
                content_hash TEXT NOT NULL UNIQUE,
                speakers TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_passages_play
                ON passages(play, act, scene);

            -- One gloss per passage and gloss type
            CREATE TABLE IF NOT EXISTS glosses (
                id INTEGER PRIMARY KEY,
                passage_id INTEGER NOT NULL,
                gloss_type TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE (passage_id, gloss_type),
                FOREIGN KEY (passage_id) REFERENCES passages(id) ON DELETE CASCADE
            );

            -- Free-form notes attached to a gloss
            CREATE TABLE IF NOT EXISTS addenda (
                id INTEGER PRIMARY KEY,
                gloss_id INTEGER NOT NULL,
                note TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY (gloss_id) REFERENCES glosses(id) ON DELETE CASCADE
            );

            -- Enable foreign keys
            PRAGMA foreign_keys = ON;

            -- WAL for concurrent reads during writes
            PRAGMA journal_mode = WAL;
            "#,
        )?;
        Ok(())
    }

    fn now() -> String {
        Utc::now().to_rfc3339()
    }
}

impl GlossStore for SqliteStore {
    fn get(&self, hash: &str, gloss_type: &str) -> StoreResult<Option<CachedGloss>> {
        let conn = self.conn.lock().map_err(|_| poisoned())?;
        let row = conn
            .query_row(
                "SELECT g.id, g.content, g.created_at
                 FROM glosses g
                 JOIN passages p ON p.id = g.passage_id
                 WHERE p.content_hash = ?1 AND g.gloss_type = ?2",
                params![hash, gloss_type],
                |row| {
                    Ok(CachedGloss {
                        gloss_id: row.get(0)?,
                        content: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    fn put(&self, passage: &PassageRecord, gloss_type: &str, content: &str) -> StoreResult<i64> {
        let conn = self.conn.lock().map_err(|_| poisoned())?;
        let now = Self::now();

        conn.execute(
            "INSERT INTO passages (play, act, scene, content_hash, speakers, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(content_hash) DO UPDATE SET
                 play = excluded.play,
                 act = excluded.act,
                 scene = excluded.scene,
                 speakers = excluded.speakers",
            params![
                passage.play,
                passage.act,
                passage.scene,
                passage.hash,
                passage.speakers,
                now
            ],
        )?;

        let passage_id: i64 = conn.query_row(
            "SELECT id FROM passages WHERE content_hash = ?1",
            params![passage.hash],
            |row| row.get(0),
        )?;

        conn.execute(
            "INSERT INTO glosses (passage_id, gloss_type, content, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(passage_id, gloss_type) DO UPDATE SET
                 content = excluded.content,
                 created_at = excluded.created_at",
            params![passage_id, gloss_type, content, now],
        )?;

        let gloss_id: i64 = conn.query_row(
            "SELECT id FROM glosses WHERE passage_id = ?1 AND gloss_type = ?2",
            params![passage_id, gloss_type],
            |row| row.get(0),
        )?;

        Ok(gloss_id)
    }

    fn append_note(&self, gloss_id: i64, note: &str) -> StoreResult<()> {
        let conn = self.conn.lock().map_err(|_| poisoned())?;

        let exists: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM glosses WHERE id = ?1",
            params![gloss_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(StoreError::UnknownGloss(gloss_id));
        }

        conn.execute(
            "INSERT INTO addenda (gloss_id, note, created_at) VALUES (?1, ?2, ?3)",
            params![gloss_id, note, Self::now()],
        )?;
        Ok(())
    }

    fn notes(&self, gloss_id: i64) -> StoreResult<Vec<String>> {
        let conn = self.conn.lock().map_err(|_| poisoned())?;
        let mut stmt =
            conn.prepare("SELECT note FROM addenda WHERE gloss_id = ?1 ORDER BY id")?;
        let notes = stmt
            .query_map(params![gloss_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(notes)
    }

    fn plays(&self) -> StoreResult<Vec<PlaySummary>> {
        let conn = self.conn.lock().map_err(|_| poisoned())?;
        let mut stmt = conn.prepare(
            "SELECT p.play, COUNT(DISTINCT p.id), COUNT(g.id)
             FROM passages p
             LEFT JOIN glosses g ON g.passage_id = p.id
             GROUP BY p.play
             ORDER BY p.play",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(PlaySummary {
                    play: row.get(0)?,
                    passages: row.get::<_, i64>(1)? as usize,
                    glosses: row.get::<_, i64>(2)? as usize,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn search(&self, term: &str) -> StoreResult<Vec<SearchHit>> {
        let conn = self.conn.lock().map_err(|_| poisoned())?;
        let pattern = format!("%{}%", term);
        let mut stmt = conn.prepare(
            "SELECT g.id, p.play, p.act, p.scene, p.speakers, g.gloss_type, g.content
             FROM glosses g
             JOIN passages p ON p.id = g.passage_id
             WHERE g.content LIKE ?1
             ORDER BY p.play, p.act, p.scene",
        )?;
        let rows = stmt
            .query_map(params![pattern], |row| {
                let content: String = row.get(6)?;
                Ok(SearchHit {
                    gloss_id: row.get(0)?,
                    play: row.get(1)?,
                    act: row.get::<_, i64>(2)? as u32,
                    scene: row.get::<_, i64>(3)? as i32,
                    speakers: row.get(4)?,
                    gloss_type: row.get(5)?,
                    snippet: snippet(&content, term),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn poisoned() -> StoreError {
    StoreError::Database(rusqlite::Error::InvalidQuery)
}

/// Byte offset in `haystack` of the first case-insensitive match of `term`.
///
/// Lowercasing can change byte lengths ('İ' lowercases to two chars), so
/// searching a lowercased copy yields offsets that may not be char
/// boundaries in the original. Walk the original char by char instead.
fn find_case_insensitive(haystack: &str, term: &str) -> Option<usize> {
    let needle = term.to_lowercase();
    if needle.is_empty() {
        return Some(0);
    }
    haystack.char_indices().map(|(i, _)| i).find(|&i| {
        let mut wanted = needle.chars();
        for c in haystack[i..].chars().flat_map(char::to_lowercase) {
            match wanted.next() {
                Some(w) if w == c => continue,
                Some(_) => return false,
                None => return true,
            }
        }
        wanted.next().is_none()
    })
}

/// Cut a display snippet around the first match of `term`.
fn snippet(content: &str, term: &str) -> String {
    let pos = find_case_insensitive(content, term).unwrap_or(0);
    let start = content[..pos]
        .char_indices()
        .rev()
        .nth(40)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let end = content[pos..]
        .char_indices()
        .nth(SNIPPET_LEN)
        .map(|(i, _)| pos + i)
        .unwrap_or(content.len());

    let mut out = String::new();
    if start > 0 {
        out.push_str("...");
    }
    out.push_str(content[start..end].trim());
    if end < content.len() {
        out.push_str("...");
    }
    out
}
