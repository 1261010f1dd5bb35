use axum::{extract::State, http::StatusCode};

use crate::{
    error::AppResult,
    middleware::AuthUser,
    models::User,
    routes::{extract::{Json, Path}, AppState},
    services::accounts::UpdateUserRequest,
};

/// Lists every account (admin only)
pub async fn list(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Vec<User>>> {
    auth.require_admin()?;
    Ok(Json(state.accounts.list().await?))
}

pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<User>> {
    auth.ensure_self_or_admin(id)?;
    Ok(Json(state.accounts.get(id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
    Json(request): Json<UpdateUserRequest>,
) -> AppResult<Json<User>> {
    auth.ensure_self_or_admin(id)?;
    Ok(Json(state.accounts.update(id, request).await?))
}

/// Deletes the account along with its profile, answers and history
pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    auth.ensure_self_or_admin(id)?;
    state.accounts.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
