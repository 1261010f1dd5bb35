use axum::{extract::State, http::StatusCode};

use crate::{
    error::AppResult,
    middleware::AuthUser,
    models::{Perfume, PerfumeDraft, PerfumeFilter},
    routes::{extract::{Json, Path, Query}, AppState},
};

/// Public catalog listing, e.g. `/api/perfumes?family=amber&max_price=150`
pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<PerfumeFilter>,
) -> AppResult<Json<Vec<Perfume>>> {
    Ok(Json(state.catalog.list(filter).await?))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Json<Perfume>> {
    Ok(Json(state.catalog.get(id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(draft): Json<PerfumeDraft>,
) -> AppResult<(StatusCode, Json<Perfume>)> {
    auth.require_admin()?;
    let perfume = state.catalog.create(draft).await?;
    Ok((StatusCode::CREATED, Json(perfume)))
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
    Json(draft): Json<PerfumeDraft>,
) -> AppResult<Json<Perfume>> {
    auth.require_admin()?;
    Ok(Json(state.catalog.update(id, draft).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    auth.require_admin()?;
    state.catalog.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
