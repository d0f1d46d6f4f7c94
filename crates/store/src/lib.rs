//! `renum-store` — SQLite store adapter.
//!
//! Implements the engine's [`Store`] trait against a `threads`/`posts`
//! database. Each repair runs in an explicit `BEGIN IMMEDIATE` scope so
//! one thread's clear-then-reassign lands atomically or not at all.

use std::path::Path;

use chrono::DateTime;
use rusqlite::{params, Connection};

use renum_engine::model::{Post, PostId, Thread, ThreadId};
use renum_engine::store::{PostFilter, Store};
use renum_engine::StoreError;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS threads (
    id INTEGER PRIMARY KEY,
    last_post_number INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS posts (
    id INTEGER PRIMARY KEY,
    thread_id INTEGER NOT NULL REFERENCES threads(id),
    created_at INTEGER NOT NULL,  -- unix seconds
    number INTEGER                -- NULL = not yet assigned
);

CREATE INDEX IF NOT EXISTS posts_thread_order ON posts(thread_id, created_at, id);
"#;

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (creating if needed) a database at `path` and make sure the
    /// schema exists.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)
            .map_err(|e| StoreError::Open(format!("{}: {e}", path.display())))?;
        Self::from_conn(conn)
    }

    /// In-memory database, mainly for tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::Open(e.to_string()))?;
        Self::from_conn(conn)
    }

    fn from_conn(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| StoreError::Open(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Insert a thread record. Fixture/loading helper; the engine never
    /// creates threads.
    pub fn insert_thread(&self, id: ThreadId, last_post_number: u32) -> Result<(), StoreError> {
        self.conn
            .execute(
                "INSERT INTO threads (id, last_post_number) VALUES (?1, ?2)",
                params![id, last_post_number],
            )
            .map_err(|e| StoreError::Mutation(e.to_string()))?;
        Ok(())
    }

    /// Insert a post record. Fixture/loading helper.
    pub fn insert_post(
        &self,
        id: PostId,
        thread: ThreadId,
        created_at_secs: i64,
        number: Option<u32>,
    ) -> Result<(), StoreError> {
        self.conn
            .execute(
                "INSERT INTO posts (id, thread_id, created_at, number) VALUES (?1, ?2, ?3, ?4)",
                params![id, thread, created_at_secs, number],
            )
            .map_err(|e| StoreError::Mutation(e.to_string()))?;
        Ok(())
    }
}

impl Store for SqliteStore {
    fn count_threads(&self) -> Result<u64, StoreError> {
        self.conn
            .query_row("SELECT COUNT(*) FROM threads", [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|n| n as u64)
            .map_err(|e| StoreError::Query(e.to_string()))
    }

    fn threads_after(
        &self,
        after: Option<ThreadId>,
        limit: usize,
    ) -> Result<Vec<Thread>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, last_post_number FROM threads \
                 WHERE ?1 IS NULL OR id > ?1 ORDER BY id LIMIT ?2",
            )
            .map_err(|e| StoreError::Query(e.to_string()))?;

        let rows = stmt
            .query_map(params![after, limit as i64], |row| {
                Ok(Thread {
                    id: row.get(0)?,
                    last_post_number: row.get(1)?,
                })
            })
            .map_err(|e| StoreError::Query(e.to_string()))?;

        let mut threads = Vec::new();
        for thread in rows {
            threads.push(thread.map_err(|e| StoreError::Query(e.to_string()))?);
        }
        Ok(threads)
    }

    fn posts_of(&self, thread: ThreadId, filter: PostFilter) -> Result<Vec<Post>, StoreError> {
        let query = match filter {
            PostFilter::All => {
                "SELECT id, created_at, number FROM posts \
                 WHERE thread_id = ?1 ORDER BY created_at, id"
            }
            PostFilter::Numbered => {
                "SELECT id, created_at, number FROM posts \
                 WHERE thread_id = ?1 AND number IS NOT NULL ORDER BY created_at, id"
            }
            PostFilter::Unnumbered => {
                "SELECT id, created_at, number FROM posts \
                 WHERE thread_id = ?1 AND number IS NULL ORDER BY created_at, id"
            }
        };

        let mut stmt = self
            .conn
            .prepare(query)
            .map_err(|e| StoreError::Query(e.to_string()))?;

        let rows = stmt
            .query_map(params![thread], |row| {
                let id: PostId = row.get(0)?;
                let created_at: i64 = row.get(1)?;
                let number: Option<u32> = row.get(2)?;
                Ok((id, created_at, number))
            })
            .map_err(|e| StoreError::Query(e.to_string()))?;

        let mut posts = Vec::new();
        for row in rows {
            let (id, created_at_secs, number) =
                row.map_err(|e| StoreError::Query(e.to_string()))?;
            let created_at = DateTime::from_timestamp(created_at_secs, 0).ok_or_else(|| {
                StoreError::Query(format!("post {id}: created_at {created_at_secs} out of range"))
            })?;
            posts.push(Post {
                id,
                created_at,
                number,
            });
        }
        Ok(posts)
    }

    fn clear_numbers(&self, thread: ThreadId) -> Result<(), StoreError> {
        self.conn
            .execute("UPDATE posts SET number = NULL WHERE thread_id = ?1", params![thread])
            .map_err(|e| StoreError::Mutation(e.to_string()))?;
        Ok(())
    }

    fn persist_post_number(&self, post: PostId, number: u32) -> Result<(), StoreError> {
        let changed = self
            .conn
            .execute(
                "UPDATE posts SET number = ?1 WHERE id = ?2",
                params![number, post],
            )
            .map_err(|e| StoreError::Mutation(e.to_string()))?;
        if changed != 1 {
            return Err(StoreError::Mutation(format!("no such post: {post}")));
        }
        Ok(())
    }

    fn persist_last_post_number(&self, thread: ThreadId, number: u32) -> Result<(), StoreError> {
        let changed = self
            .conn
            .execute(
                "UPDATE threads SET last_post_number = ?1 WHERE id = ?2",
                params![number, thread],
            )
            .map_err(|e| StoreError::Mutation(e.to_string()))?;
        if changed != 1 {
            return Err(StoreError::Mutation(format!("no such thread: {thread}")));
        }
        Ok(())
    }

    fn begin_repair(&self, _thread: ThreadId) -> Result<(), StoreError> {
        // IMMEDIATE takes the write lock up front so the repair cannot
        // deadlock against itself after partial writes.
        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| StoreError::Txn(e.to_string()))
    }

    fn commit_repair(&self) -> Result<(), StoreError> {
        self.conn
            .execute_batch("COMMIT")
            .map_err(|e| StoreError::Txn(e.to_string()))
    }

    fn rollback_repair(&self) -> Result<(), StoreError> {
        self.conn
            .execute_batch("ROLLBACK")
            .map_err(|e| StoreError::Txn(e.to_string()))
    }
}
