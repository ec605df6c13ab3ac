use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id              INTEGER PRIMARY KEY,
            username        TEXT NOT NULL UNIQUE,
            invite_token    TEXT NOT NULL,
            created_at      INTEGER NOT NULL,
            session_token   TEXT
        );

        CREATE TABLE IF NOT EXISTS posts (
            id          INTEGER PRIMARY KEY,
            user_id     INTEGER NOT NULL,
            content     TEXT NOT NULL,
            created_at  INTEGER NOT NULL,
            expires_at  INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_posts_expires
            ON posts(expires_at);

        CREATE TABLE IF NOT EXISTS invite_tokens (
            token       TEXT PRIMARY KEY,
            created_at  INTEGER NOT NULL,
            used        INTEGER NOT NULL DEFAULT 0,
            used_at     INTEGER
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
