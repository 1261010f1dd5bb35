use axum::{extract::State, http::StatusCode};

use crate::{
    error::AppResult,
    middleware::AuthUser,
    models::{ProfileInput, UserProfile},
    routes::{extract::{Json, Path}, AppState},
};

pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<i64>,
) -> AppResult<Json<UserProfile>> {
    auth.ensure_self_or_admin(user_id)?;
    Ok(Json(state.profiles.get(user_id).await?))
}

/// Creates or partially updates the profile
pub async fn upsert(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<i64>,
    Json(input): Json<ProfileInput>,
) -> AppResult<Json<UserProfile>> {
    auth.ensure_self_or_admin(user_id)?;
    Ok(Json(state.profiles.upsert(user_id, input).await?))
}

/// Rebuilds the profile from the stored questionnaire answers
pub async fn from_questionnaire(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<i64>,
) -> AppResult<Json<UserProfile>> {
    auth.ensure_self_or_admin(user_id)?;
    Ok(Json(state.profiles.from_questionnaire(user_id).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<i64>,
) -> AppResult<StatusCode> {
    auth.ensure_self_or_admin(user_id)?;
    state.profiles.delete(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
