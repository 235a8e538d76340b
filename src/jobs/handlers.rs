use axum::{
    extract::{Path, Query, State},
    response::Response,
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::{handlers::gated, session::SessionKey},
    error::ApiError,
    state::AppState,
};

use super::dto::{JobSearch, Pagination};
use super::repo::Job;

pub fn job_routes() -> Router<AppState> {
    Router::new()
        .route("/jobs", get(list_jobs))
        .route("/jobs/search", get(search_jobs))
        .route("/jobs/:id", get(get_job))
}

#[instrument(skip(state, key))]
pub async fn list_jobs(
    State(state): State<AppState>,
    key: SessionKey,
    Query(p): Query<Pagination>,
) -> Result<Response, ApiError> {
    let db = state.db.clone();
    let (limit, offset) = p.clamped();
    gated(&state, key, |_| async move {
        Ok::<_, ApiError>(Json(Job::list(&db, limit, offset).await?))
    })
    .await
}

#[instrument(skip(state, key))]
pub async fn search_jobs(
    State(state): State<AppState>,
    key: SessionKey,
    Query(s): Query<JobSearch>,
) -> Result<Response, ApiError> {
    let db = state.db.clone();
    gated(&state, key, |_| async move {
        let query = s
            .query()
            .ok_or_else(|| ApiError::BadRequest("q must not be empty".into()))?;
        Ok::<_, ApiError>(Json(Job::search(&db, query, s.limit()).await?))
    })
    .await
}

#[instrument(skip(state, key))]
pub async fn get_job(
    State(state): State<AppState>,
    key: SessionKey,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let db = state.db.clone();
    gated(&state, key, |_| async move {
        let job = Job::get(&db, id).await?.ok_or(ApiError::NotFound("job"))?;
        Ok::<_, ApiError>(Json(job))
    })
    .await
}
