//! Song endpoints

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::db::{Song, Transactor};
use crate::error::{AppError, AppResult};
use crate::http::extractors::ValidId;
use crate::http::server::AppState;
use crate::models::{
    Paginated, Pagination, PaginationParams, SongPatchRequest, SongRequest, SongSort,
};

/// Song response
#[derive(Debug, Serialize)]
pub struct SongResponse {
    pub id: i32,
    pub group: String,
    pub title: String,
    /// `DD.MM.YYYY`
    pub release_date: String,
    pub text: String,
    pub link: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
}

impl From<Song> for SongResponse {
    fn from(s: Song) -> Self {
        Self {
            id: s.id,
            group: s.group,
            title: s.title,
            release_date: s.release_date.format("%d.%m.%Y").to_string(),
            text: s.text,
            link: s.link,
            created_at: s.created_at.to_rfc3339(),
            updated_at: s.updated_at.to_rfc3339(),
        }
    }
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AppError::bad_request(rejection.body_text()))
}

/// POST /api/v1/song/create - add a song, returns its id
async fn create_song<D: Transactor>(
    State(state): State<Arc<AppState<D>>>,
    body: Result<Json<SongRequest>, JsonRejection>,
) -> AppResult<Json<i32>> {
    let req = json_body(body)?;
    let song = state.validator.new_song(&req)?;
    let id = state.songs.add_song(song).await?;

    Ok(Json(id))
}

/// GET /api/v1/song - list songs with pagination
async fn list_songs<D: Transactor>(
    State(state): State<Arc<AppState<D>>>,
    params: Result<Query<PaginationParams>, QueryRejection>,
) -> AppResult<Json<Paginated<SongResponse>>> {
    let Query(params) = params.map_err(|rejection| AppError::bad_query_params(rejection.body_text()))?;
    let page = Pagination::try_from(&params)?;
    let sort = SongSort::parse(params.order_by.as_deref().unwrap_or_default())?;

    let result = state.songs.list_songs(page, sort).await?;
    Ok(Json(result.map(SongResponse::from)))
}

/// GET /api/v1/song/{id} - get a single song
async fn get_song<D: Transactor>(
    State(state): State<Arc<AppState<D>>>,
    ValidId(id): ValidId,
) -> AppResult<Json<SongResponse>> {
    let song = state.songs.get_song(id).await?;
    Ok(Json(SongResponse::from(song)))
}

/// PUT /api/v1/song/{id} - update the given fields
async fn update_song<D: Transactor>(
    State(state): State<Arc<AppState<D>>>,
    ValidId(id): ValidId,
    body: Result<Json<SongPatchRequest>, JsonRejection>,
) -> AppResult<Json<SongResponse>> {
    let req = json_body(body)?;
    let patch = state.validator.song_patch(&req)?;
    let song = state.songs.update_song(id, patch).await?;

    Ok(Json(SongResponse::from(song)))
}

/// DELETE /api/v1/song/{id}
async fn delete_song<D: Transactor>(
    State(state): State<Arc<AppState<D>>>,
    ValidId(id): ValidId,
) -> AppResult<StatusCode> {
    state.songs.delete_song(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Song routes, relative to the API prefix
pub fn router<D: Transactor>() -> Router<Arc<AppState<D>>> {
    Router::new()
        .route("/song", get(list_songs::<D>))
        .route("/song/create", post(create_song::<D>))
        .route(
            "/song/{id}",
            get(get_song::<D>).put(update_song::<D>).delete(delete_song::<D>),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::server::{build_router, ServerConfig};
    use crate::models::Validator;
    use crate::service::SongService;
    use crate::store::testing::{FakePool, Tally};
    use crate::store::DataStore;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use chrono::{NaiveDate, TimeZone, Utc};
    use tower::ServiceExt;

    fn app() -> (Router, Arc<Tally>) {
        let pool = FakePool::default();
        let tally = Arc::clone(&pool.tally);
        let state = AppState {
            songs: SongService::new(DataStore::new(pool)),
            validator: Validator::default(),
        };
        (build_router(state, &ServerConfig::default()), tally)
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    #[test]
    fn response_formats_dates() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let response = SongResponse::from(Song {
            id: 1,
            group: "Muse".into(),
            title: "Uprising".into(),
            release_date: NaiveDate::from_ymd_opt(2009, 9, 7).unwrap(),
            text: "la".into(),
            link: "https://example.com".into(),
            created_at: at,
            updated_at: at,
        });

        assert_eq!(response.release_date, "07.09.2009");
        assert_eq!(response.created_at, "2024-01-02T03:04:05+00:00");
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let (app, tally) = app();

        let (status, body) = send(app, post_json("/api/v1/song/create", "{not json")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["err_status"], 400);
        assert_eq!(Tally::count(&tally.begins), 0);
    }

    #[tokio::test]
    async fn invalid_song_never_opens_a_transaction() {
        let (app, tally) = app();

        let (status, body) = send(
            app,
            post_json("/api/v1/song/create", r#"{"group": "Muse", "title": ""}"#),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["err_cause"]
            .as_str()
            .unwrap()
            .starts_with("field validation error"));
        assert_eq!(Tally::count(&tally.begins), 0);
    }

    #[tokio::test]
    async fn non_numeric_id_is_invalid_syntax() {
        let (app, _tally) = app();

        let request = Request::get("/api/v1/song/abc").body(Body::empty()).unwrap();
        let (status, body) = send(app, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["err_cause"].as_str().unwrap().starts_with("invalid syntax"));
    }

    #[tokio::test]
    async fn non_numeric_page_is_bad_request() {
        let (app, _tally) = app();

        let request = Request::get("/api/v1/song?page=two").body(Body::empty()).unwrap();
        let (status, _body) = send(app, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_order_is_bad_request() {
        let (app, _tally) = app();

        let request = Request::get("/api/v1/song?orderBy=password")
            .body(Body::empty())
            .unwrap();
        let (status, _body) = send(app, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn empty_list() {
        let (app, _tally) = app();

        let request = Request::get("/api/v1/song?size=").body(Body::empty()).unwrap();
        let (status, body) = send(app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["size"], 10);
        assert_eq!(body["items"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn missing_song_is_not_found() {
        let (app, _tally) = app();

        let request = Request::get("/api/v1/song/7").body(Body::empty()).unwrap();
        let (status, body) = send(app, request).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["err_msg"], "not found");
    }

    #[tokio::test]
    async fn empty_update_is_bad_request() {
        let (app, tally) = app();

        let request = Request::put("/api/v1/song/7")
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let (status, _body) = send(app, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(Tally::count(&tally.begins), 0);
    }

    #[tokio::test]
    async fn delete_missing_song_rolls_back() {
        let (app, tally) = app();

        let request = Request::delete("/api/v1/song/7").body(Body::empty()).unwrap();
        let (status, _body) = send(app, request).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(Tally::count(&tally.rollbacks), 1);
        assert_eq!(Tally::count(&tally.commits), 0);
    }
}
