use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::{handlers::gated, session::SessionKey},
    error::ApiError,
    state::AppState,
};

use super::dto::{CompanySearch, CreateCompanyRequest, UpdateCompanyRequest};
use super::repo::{Company, CompanyChanges};

pub fn company_routes() -> Router<AppState> {
    Router::new()
        .route("/companies", get(list_companies).post(create_company))
        .route(
            "/companies/:id",
            get(get_company).patch(update_company).delete(delete_company),
        )
        .route("/companies/:id/jobs", get(list_company_jobs))
}

#[instrument(skip(state, key))]
pub async fn list_companies(
    State(state): State<AppState>,
    key: SessionKey,
    Query(q): Query<CompanySearch>,
) -> Result<Response, ApiError> {
    let db = state.db.clone();
    gated(&state, key, |_| async move {
        let companies = Company::list(&db, q.search.as_deref()).await?;
        Ok::<_, ApiError>(Json(companies))
    })
    .await
}

#[instrument(skip(state, key))]
pub async fn get_company(
    State(state): State<AppState>,
    key: SessionKey,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let db = state.db.clone();
    gated(&state, key, |_| async move {
        let company = Company::get(&db, id)
            .await?
            .ok_or(ApiError::NotFound("company"))?;
        Ok::<_, ApiError>(Json(company))
    })
    .await
}

#[instrument(skip(state, key, body))]
pub async fn create_company(
    State(state): State<AppState>,
    key: SessionKey,
    Json(body): Json<CreateCompanyRequest>,
) -> Result<Response, ApiError> {
    let db = state.db.clone();
    gated(&state, key, |user| async move {
        let body = body.normalized().map_err(ApiError::BadRequest)?;
        let company = Company::create(
            &db,
            &body.name,
            body.description.as_deref(),
            body.website.as_deref(),
        )
        .await?;
        info!(company_id = %company.id, user_id = %user.id, "company created");
        Ok::<_, ApiError>((StatusCode::CREATED, Json(company)))
    })
    .await
}

#[instrument(skip(state, key, body))]
pub async fn update_company(
    State(state): State<AppState>,
    key: SessionKey,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateCompanyRequest>,
) -> Result<Response, ApiError> {
    let db = state.db.clone();
    gated(&state, key, |user| async move {
        body.validate().map_err(ApiError::BadRequest)?;
        let changes = CompanyChanges {
            name: body.name.map(|n| n.trim().to_string()),
            description: body.description,
            website: body.website,
        };
        let company = Company::update(&db, id, changes)
            .await?
            .ok_or(ApiError::NotFound("company"))?;
        info!(company_id = %id, user_id = %user.id, "company updated");
        Ok::<_, ApiError>(Json(company))
    })
    .await
}

#[instrument(skip(state, key))]
pub async fn delete_company(
    State(state): State<AppState>,
    key: SessionKey,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let db = state.db.clone();
    gated(&state, key, |user| async move {
        if !Company::delete(&db, id).await? {
            return Err(ApiError::NotFound("company"));
        }
        info!(company_id = %id, user_id = %user.id, "company deleted");
        Ok::<_, ApiError>(StatusCode::NO_CONTENT)
    })
    .await
}

#[instrument(skip(state, key))]
pub async fn list_company_jobs(
    State(state): State<AppState>,
    key: SessionKey,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let db = state.db.clone();
    gated(&state, key, |_| async move {
        if Company::get(&db, id).await?.is_none() {
            return Err(ApiError::NotFound("company"));
        }
        Ok::<_, ApiError>(Json(Company::jobs(&db, id).await?))
    })
    .await
}
