//! Song repository
//!
//! - add: INSERT ... RETURNING id; duplicates surface as a classified conflict
//! - list: COUNT(*) OVER() for the total in the same query
//! - update: COALESCE so absent fields keep their value

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;

use crate::db::Executor;
use crate::error::{AppError, AppResult};
use crate::models::{NewSong, Paginated, Pagination, SongPatch, SongSort};

const SONG_COLUMNS: &str =
    "id, group_name, title, release_date, text, link, created_at, updated_at";

/// Song record from database
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Song {
    pub id: i32,
    #[sqlx(rename = "group_name")]
    pub group: String,
    pub title: String,
    pub release_date: NaiveDate,
    pub text: String,
    pub link: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Song plus the window total for list queries
#[derive(Debug, FromRow)]
struct SongWithTotal {
    #[sqlx(flatten)]
    song: Song,
    total: i64,
}

/// Song repository bound to one executor.
///
/// Bound to the pool it reads outside any transaction; bound to a
/// transaction handle every call joins that transaction.
#[derive(Debug, Clone)]
pub struct SongRepository<E> {
    executor: E,
}

impl<E: Executor> SongRepository<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Insert a song and return its id.
    pub async fn add_song(&self, song: &NewSong) -> AppResult<i32> {
        let (id,): (i32,) = self
            .executor
            .get(
                sqlx::query_as(
                    r#"
                    INSERT INTO songs (group_name, title, release_date, text, link)
                    VALUES ($1, $2, $3, $4, $5)
                    RETURNING id
                    "#,
                )
                .bind(&song.group)
                .bind(&song.title)
                .bind(song.release_date)
                .bind(&song.text)
                .bind(&song.link),
            )
            .await?;

        tracing::debug!(id, group = %song.group, title = %song.title, "song inserted");
        Ok(id)
    }

    /// Get a single song by id.
    pub async fn get_song(&self, id: i32) -> AppResult<Song> {
        let sql = format!("SELECT {SONG_COLUMNS} FROM songs WHERE id = $1");
        let song: Song = self.executor.get(sqlx::query_as(&sql).bind(id)).await?;
        Ok(song)
    }

    /// List songs, one page at a time.
    pub async fn list_songs(&self, page: Pagination, sort: SongSort) -> AppResult<Paginated<Song>> {
        // ORDER BY comes from a closed set of columns, never from input
        let sql = format!(
            r#"
            SELECT {SONG_COLUMNS}, COUNT(*) OVER() AS total
            FROM songs
            ORDER BY {}
            LIMIT $1 OFFSET $2
            "#,
            sort.to_sql()
        );

        let rows: Vec<SongWithTotal> = self
            .executor
            .select(
                sqlx::query_as(&sql)
                    .bind(page.limit() as i64)
                    .bind(page.offset() as i64),
            )
            .await?;

        let total = match rows.first() {
            Some(row) => row.total,
            // Past the last page the window is empty too
            None if page.page > 1 => self.count_songs().await?,
            None => 0,
        };

        let items = rows.into_iter().map(|row| row.song).collect();
        Ok(Paginated::new(items, total, page))
    }

    /// Total number of songs.
    pub async fn count_songs(&self) -> AppResult<i64> {
        let (count,): (i64,) = self
            .executor
            .get(sqlx::query_as("SELECT COUNT(*) FROM songs"))
            .await?;
        Ok(count)
    }

    /// Apply a partial update and return the updated song.
    pub async fn update_song(&self, id: i32, patch: &SongPatch) -> AppResult<Song> {
        let sql = format!(
            r#"
            UPDATE songs SET
                group_name = COALESCE($2, group_name),
                title = COALESCE($3, title),
                release_date = COALESCE($4, release_date),
                text = COALESCE($5, text),
                link = COALESCE($6, link),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {SONG_COLUMNS}
            "#
        );

        let song: Song = self
            .executor
            .get(
                sqlx::query_as(&sql)
                    .bind(id)
                    .bind(patch.group.as_deref())
                    .bind(patch.title.as_deref())
                    .bind(patch.release_date)
                    .bind(patch.text.as_deref())
                    .bind(patch.link.as_deref()),
            )
            .await?;

        tracing::debug!(id, "song updated");
        Ok(song)
    }

    /// Delete a song. Deleting a missing song is NotFound.
    pub async fn delete_song(&self, id: i32) -> AppResult<()> {
        let result = self
            .executor
            .exec(sqlx::query("DELETE FROM songs WHERE id = $1").bind(id))
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("song {id}")));
        }

        tracing::debug!(id, "song deleted");
        Ok(())
    }
}
