use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

use crate::identity::Identity;

pub const DB_FILE: &str = "campusd.sqlite3";
pub const IDENTITY_KEY: &str = "usuario";
pub const TOKEN_KEY: &str = "token";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)
        .with_context(|| format!("failed to create workspace {}", workspace.to_string_lossy()))?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.to_string_lossy()))?;
    migrate(&conn)?;
    Ok(conn)
}

fn migrate(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS local_storage(
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;
    ensure_local_storage_updated_at(conn)?;
    Ok(())
}

fn ensure_local_storage_updated_at(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "local_storage", "updated_at")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE local_storage ADD COLUMN updated_at TEXT", [])?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Raw contents of the two storage entries, before parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntries {
    pub identity_json: String,
    pub token: String,
}

/// Durable key/value storage for the session. The identity blob and the
/// token are always written and removed together.
pub struct SessionStore {
    conn: Connection,
}

impl SessionStore {
    pub fn open(workspace: &Path) -> anyhow::Result<Self> {
        Ok(Self {
            conn: open_db(workspace)?,
        })
    }

    #[cfg(test)]
    pub fn in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory()?;
        migrate(&conn)?;
        Ok(Self { conn })
    }

    pub fn save(&mut self, identity: &Identity) -> anyhow::Result<()> {
        let blob = serde_json::to_string(identity).context("failed to serialize identity")?;
        let now = chrono::Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        for (key, value) in [(IDENTITY_KEY, blob.as_str()), (TOKEN_KEY, identity.token.as_str())] {
            tx.execute(
                "INSERT INTO local_storage(key, value, updated_at) VALUES(?, ?, ?)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                (key, value, &now),
            )?;
        }
        tx.commit().context("failed to persist session")?;
        Ok(())
    }

    /// Returns both entries when both are present; a lone entry counts as
    /// no stored session.
    pub fn load(&self) -> anyhow::Result<Option<StoredEntries>> {
        let identity_json = self.get(IDENTITY_KEY)?;
        let token = self.get(TOKEN_KEY)?;
        Ok(match (identity_json, token) {
            (Some(identity_json), Some(token)) => Some(StoredEntries {
                identity_json,
                token,
            }),
            _ => None,
        })
    }

    pub fn clear(&mut self) -> anyhow::Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM local_storage WHERE key IN (?, ?)",
            (IDENTITY_KEY, TOKEN_KEY),
        )?;
        tx.commit().context("failed to clear session")?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let v = self
            .conn
            .query_row(
                "SELECT value FROM local_storage WHERE key = ?",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(v)
    }

    pub fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.conn.execute(
            "INSERT INTO local_storage(key, value, updated_at) VALUES(?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            (key, value, chrono::Utc::now().to_rfc3339()),
        )?;
        Ok(())
    }
}
