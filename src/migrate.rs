use anyhow::Result;
use sqlx::SqlitePool;

/// Create the index tables if they do not exist.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // Single-row table describing how the index was built.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS index_meta (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            model TEXT NOT NULL,
            dims INTEGER NOT NULL,
            unit_count INTEGER NOT NULL,
            corpus_path TEXT NOT NULL,
            built_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS units (
            position INTEGER PRIMARY KEY,
            id TEXT NOT NULL UNIQUE,
            topic TEXT NOT NULL,
            text TEXT NOT NULL,
            embedding BLOB NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
