//! Database migrations for the songs table

use super::error::DbError;
use super::executor::Executor;

/// Run all migrations. Idempotent.
pub async fn run<E: Executor>(db: &E) -> Result<(), DbError> {
    tracing::info!("Running songbook migrations...");

    db.exec(sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS songs (
            id SERIAL PRIMARY KEY,
            group_name TEXT NOT NULL,
            title TEXT NOT NULL,
            release_date DATE NOT NULL,
            text TEXT NOT NULL,
            link TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            CONSTRAINT songs_group_title_key UNIQUE (group_name, title),
            CONSTRAINT songs_group_not_blank CHECK (length(trim(group_name)) > 0),
            CONSTRAINT songs_title_not_blank CHECK (length(trim(title)) > 0)
        )
        "#,
    ))
    .await?;

    db.exec(sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_songs_release_date ON songs(release_date)",
    ))
    .await?;

    tracing::info!("Migrations complete");
    Ok(())
}
