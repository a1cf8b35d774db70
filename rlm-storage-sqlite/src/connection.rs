//! Thread-local connection management.
//!
//! Grounded in `rlm/db.py::_get_conn`/`close`: each thread that touches
//! the store gets its own `rusqlite::Connection` (SQLite connections
//! aren't `Send`-shareable across threads without a mutex, and a
//! thread-local avoids needing one), opened in WAL mode with foreign
//! keys enabled, lazily on first use and cached for the thread's
//! lifetime. The upstream Python registers an `atexit` hook to close the
//! connection; the Rust equivalent is `rusqlite::Connection`'s own
//! `Drop` impl, which closes the handle automatically, so no explicit
//! cleanup registration is needed here.

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use rlm_core::error::{Error, Result};
use rusqlite::Connection;

use crate::schema::SCHEMA_SQL;

thread_local! {
    static CONN: RefCell<Option<(PathBuf, Connection)>> = const { RefCell::new(None) };
}

/// Run `f` with a live connection to `db_path` on the calling thread,
/// opening (and initializing the schema on) a fresh connection the
/// first time this thread touches this path, or if the thread was
/// previously bound to a different path.
///
/// # Errors
/// Returns [`Error::Storage`] if the connection can't be opened or the
/// schema can't be applied.
pub fn with_connection<T>(db_path: &Path, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
    CONN.with(|cell| {
        let mut slot = cell.borrow_mut();
        let needs_open = match &*slot {
            Some((path, _)) => path != db_path,
            None => true,
        };
        if needs_open {
            let conn = open(db_path)?;
            *slot = Some((db_path.to_path_buf(), conn));
        }
        let (_, conn) = slot.as_ref().expect("connection was just ensured open");
        f(conn)
    })
}

fn open(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| Error::Storage(format!("failed to create db directory: {e}")))?;
    }
    let conn = Connection::open(db_path)
        .map_err(|e| Error::Storage(format!("failed to open sqlite database: {e}")))?;
    conn.pragma_update(None, "journal_mode", "WAL")
        .map_err(|e| Error::Storage(format!("failed to set WAL mode: {e}")))?;
    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(|e| Error::Storage(format!("failed to enable foreign keys: {e}")))?;
    conn.execute_batch(SCHEMA_SQL)
        .map_err(|e| Error::Storage(format!("failed to initialize schema: {e}")))?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opening_same_path_reuses_the_thread_local_connection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        with_connection(&path, |conn| {
            conn.execute("INSERT INTO entries (id, summary, timestamp, source, char_count, content) VALUES ('m_1', 's', 0.0, 'text', 1, 'c')", [])
                .unwrap();
            Ok(())
        })
        .unwrap();
        with_connection(&path, |conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))
                .unwrap();
            assert_eq!(count, 1);
            Ok(())
        })
        .unwrap();
    }
}
