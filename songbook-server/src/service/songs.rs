//! Song service
//!
//! Writes run inside a transaction; reads go straight to the pool. Both are
//! bounded by the service timeout.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::db::{deadline, Executor, Song, Transactor, TxOptions};
use crate::error::AppResult;
use crate::models::{NewSong, Paginated, Pagination, SongPatch, SongSort};
use crate::store::DataStore;

/// Song use cases over a transaction-capable handle.
#[derive(Debug)]
pub struct SongService<D> {
    store: DataStore<D>,
    timeout: Option<Duration>,
}

impl<D> Clone for SongService<D> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            timeout: self.timeout,
        }
    }
}

impl<D: Transactor> SongService<D> {
    pub fn new(store: DataStore<D>) -> Self {
        Self {
            store,
            timeout: None,
        }
    }

    /// Bound every call by `timeout`, measured from its start.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn store(&self) -> &DataStore<D> {
        &self.store
    }

    fn deadline(&self) -> Option<Instant> {
        self.timeout.map(|timeout| Instant::now() + timeout)
    }

    fn tx_options(&self) -> TxOptions {
        match self.deadline() {
            Some(deadline) => TxOptions::new().deadline(deadline),
            None => TxOptions::new(),
        }
    }

    /// Run a pool read under the service deadline.
    async fn read<T, F>(&self, fut: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        deadline::within(self.deadline(), fut).await?
    }

    /// `SELECT 1` against the pool.
    pub async fn ping(&self) -> AppResult<()> {
        let executor = self.store.executor();
        self.read(async {
            executor.exec(sqlx::query("SELECT 1")).await?;
            Ok(())
        })
        .await
    }

    pub async fn add_song(&self, song: NewSong) -> AppResult<i32> {
        let id = self
            .store
            .with_transaction_opts(self.tx_options(), |tx| async move {
                let songs = tx.song_repo();
                songs.add_song(&song).await
            })
            .await?;

        tracing::info!(id, "song created");
        Ok(id)
    }

    pub async fn get_song(&self, id: i32) -> AppResult<Song> {
        let songs = self.store.song_repo();
        self.read(songs.get_song(id)).await
    }

    pub async fn list_songs(&self, page: Pagination, sort: SongSort) -> AppResult<Paginated<Song>> {
        let songs = self.store.song_repo();
        self.read(songs.list_songs(page, sort)).await
    }

    pub async fn update_song(&self, id: i32, patch: SongPatch) -> AppResult<Song> {
        let song = self
            .store
            .with_transaction_opts(self.tx_options(), |tx| async move {
                let songs = tx.song_repo();
                songs.update_song(id, &patch).await
            })
            .await?;

        tracing::info!(id, "song updated");
        Ok(song)
    }

    pub async fn delete_song(&self, id: i32) -> AppResult<()> {
        self.store
            .with_transaction_opts(self.tx_options(), |tx| async move {
                let songs = tx.song_repo();
                songs.delete_song(id).await
            })
            .await?;

        tracing::info!(id, "song deleted");
        Ok(())
    }
}
