//! Unit-of-work scenarios against a real Postgres.
//!
//! Run with: DB_USER=... DB_NAME=... cargo test -p songbook-server -- --ignored

use chrono::{NaiveDate, Utc};
use songbook_server::db::{migrations, Executor, IsolationLevel, PgDatabase, TxOptions};
use songbook_server::error::ErrorKind;
use songbook_server::models::NewSong;
use songbook_server::{DataStore, DatabaseConfig};

async fn store() -> DataStore<PgDatabase> {
    let config = DatabaseConfig::from_env().expect("DB_* settings required");
    let db = PgDatabase::connect(&config).await.expect("pool creation failed");
    migrations::run(&db).await.expect("migrations failed");
    DataStore::new(db)
}

fn song(tag: &str) -> NewSong {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    NewSong {
        group: "store-test".into(),
        title: format!("{tag}-{nanos}"),
        release_date: NaiveDate::from_ymd_opt(2001, 6, 19).unwrap(),
        text: "verse".into(),
        link: "https://example.com/verse".into(),
    }
}

#[tokio::test]
#[ignore = "requires database"]
async fn committed_insert_is_visible_outside() {
    let store = store().await;
    let new = song("commit");

    let id = store
        .with_transaction(|tx| {
            let new = new.clone();
            async move {
                let songs = tx.song_repo();
                songs.add_song(&new).await
            }
        })
        .await
        .unwrap();

    assert!(id > 0);
    let stored = store.song_repo().get_song(id).await.unwrap();
    assert_eq!(stored.title, new.title);
}

#[tokio::test]
#[ignore = "requires database"]
async fn duplicate_rolls_back_the_whole_unit() {
    let store = store().await;
    let first = song("dup");
    store.song_repo().add_song(&first).await.unwrap();

    let fresh = song("dup-fresh");
    let err = store
        .with_transaction(|tx| {
            let (fresh, first) = (fresh.clone(), first.clone());
            async move {
                let songs = tx.song_repo();
                songs.add_song(&fresh).await?;
                songs.add_song(&first).await
            }
        })
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(err.cause().starts_with("Unique constraint violation"));

    // The first insert in the unit was rolled back too
    let rows = store
        .executor()
        .query(sqlx::query("SELECT id FROM songs WHERE title = $1").bind(&fresh.title))
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
#[ignore = "requires database"]
async fn read_only_transaction_rejects_writes() {
    let store = store().await;
    let options = TxOptions::new()
        .isolation(IsolationLevel::Serializable)
        .read_only();

    let err = store
        .with_transaction_opts(options, |tx| async move {
            let songs = tx.song_repo();
            songs.add_song(&song("ro")).await
        })
        .await
        .unwrap_err();

    // 25006 read_only_sql_transaction is not in the code table
    assert_eq!(err.kind(), ErrorKind::BadRequest);
}
