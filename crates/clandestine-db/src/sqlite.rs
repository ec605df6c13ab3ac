use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use rusqlite::Connection;
use tracing::info;

use crate::migrations;
use crate::models::{InviteRow, PostRow, UserRow};
use crate::snapshot::{Snapshot, SnapshotStore};

/// Embedded SQLite backend. Each save replaces all three tables inside a
/// single transaction, so the file always holds a complete snapshot.
pub struct SqliteStore {
    path: PathBuf,
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        migrations::run(&conn)?;

        info!("SQLite snapshot store opened at {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock().map_err(|e| anyhow!("DB lock poisoned: {}", e))?;
        f(&mut conn)
    }
}

impl SnapshotStore for SqliteStore {
    fn load(&self) -> Result<Option<Snapshot>> {
        let snapshot = self.with_conn(|conn| {
            Ok(Snapshot {
                users: query_users(conn)?,
                posts: query_posts(conn)?,
                invite_tokens: query_invites(conn)?,
            })
        })?;

        if snapshot.is_empty() {
            Ok(None)
        } else {
            Ok(Some(snapshot))
        }
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute_batch("DELETE FROM users; DELETE FROM posts; DELETE FROM invite_tokens;")?;
            {
                let mut stmt = tx.prepare_cached(
                    "INSERT INTO users (id, username, invite_token, created_at, session_token)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;
                for u in &snapshot.users {
                    stmt.execute(rusqlite::params![
                        u.id as i64,
                        u.username,
                        u.invite_token,
                        u.created_at,
                        u.session_token
                    ])?;
                }

                let mut stmt = tx.prepare_cached(
                    "INSERT INTO posts (id, user_id, content, created_at, expires_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;
                for p in &snapshot.posts {
                    stmt.execute(rusqlite::params![
                        p.id as i64,
                        p.user_id as i64,
                        p.content,
                        p.created_at,
                        p.expires_at
                    ])?;
                }

                let mut stmt = tx.prepare_cached(
                    "INSERT INTO invite_tokens (token, created_at, used, used_at)
                     VALUES (?1, ?2, ?3, ?4)",
                )?;
                for i in &snapshot.invite_tokens {
                    stmt.execute(rusqlite::params![i.token, i.created_at, i.used, i.used_at])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
    }

    fn describe(&self) -> String {
        format!("sqlite:{}", self.path.display())
    }
}

fn query_users(conn: &Connection) -> Result<Vec<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, username, invite_token, created_at, session_token FROM users ORDER BY id",
    )?;

    let rows = stmt
        .query_map([], |row| {
            Ok(UserRow {
                id: row.get::<_, i64>(0)? as u64,
                username: row.get(1)?,
                invite_token: row.get(2)?,
                created_at: row.get(3)?,
                session_token: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn query_posts(conn: &Connection) -> Result<Vec<PostRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, content, created_at, expires_at FROM posts ORDER BY id",
    )?;

    let rows = stmt
        .query_map([], |row| {
            Ok(PostRow {
                id: row.get::<_, i64>(0)? as u64,
                user_id: row.get::<_, i64>(1)? as u64,
                content: row.get(2)?,
                created_at: row.get(3)?,
                expires_at: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn query_invites(conn: &Connection) -> Result<Vec<InviteRow>> {
    // rowid keeps insertion order, matching the JSON array order.
    let mut stmt = conn.prepare(
        "SELECT token, created_at, used, used_at FROM invite_tokens ORDER BY rowid",
    )?;

    let rows = stmt
        .query_map([], |row| {
            Ok(InviteRow {
                token: row.get(0)?,
                created_at: row.get(1)?,
                used: row.get(2)?,
                used_at: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("clandestine_{}_{}.db", name, uuid::Uuid::new_v4()))
    }

    #[test]
    fn fresh_database_loads_as_none() {
        let store = SqliteStore::open(&temp_db("fresh")).unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn save_replaces_previous_contents() {
        let path = temp_db("replace");
        let store = SqliteStore::open(&path).unwrap();

        let mut snapshot = Snapshot {
            users: vec![UserRow {
                id: 1,
                username: "op_7".into(),
                invite_token: "abc-123".into(),
                created_at: 10,
                session_token: Some("s".into()),
            }],
            posts: vec![
                PostRow { id: 1, user_id: 1, content: "one".into(), created_at: 10, expires_at: 20 },
                PostRow { id: 2, user_id: 1, content: "two".into(), created_at: 11, expires_at: 21 },
            ],
            invite_tokens: vec![InviteRow {
                token: "abc-123".into(),
                created_at: 1,
                used: true,
                used_at: Some(10),
            }],
        };
        store.save(&snapshot).unwrap();

        snapshot.posts.remove(0);
        snapshot.users[0].session_token = None;
        store.save(&snapshot).unwrap();

        // A second handle sees only the committed state.
        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.load().unwrap(), Some(snapshot));
    }
}
