use axum::{extract::State, http::StatusCode};

use crate::{
    error::AppResult,
    middleware::AuthUser,
    models::{FeedbackInput, Page, PageRequest},
    routes::{extract::{Json, Path, Query}, AppState},
    services::recommendations::{RecommendRequest, RecommendationView, RecommendedPerfume},
};

/// Ranks the catalog against the user's profile and the given situation
pub async fn generate(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<i64>,
    Json(request): Json<RecommendRequest>,
) -> AppResult<Json<Vec<RecommendedPerfume>>> {
    auth.ensure_self_or_admin(user_id)?;
    Ok(Json(state.recommendations.generate(user_id, request).await?))
}

/// The single best pick for today's situation
pub async fn daily(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<i64>,
    Json(request): Json<RecommendRequest>,
) -> AppResult<Json<RecommendedPerfume>> {
    auth.ensure_self_or_admin(user_id)?;
    Ok(Json(state.recommendations.daily(user_id, request).await?))
}

pub async fn latest(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<i64>,
) -> AppResult<Json<RecommendationView>> {
    auth.ensure_self_or_admin(user_id)?;
    Ok(Json(state.recommendations.latest(user_id).await?))
}

pub async fn history(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<i64>,
    Query(page): Query<PageRequest>,
) -> AppResult<Json<Page<RecommendationView>>> {
    auth.ensure_self_or_admin(user_id)?;
    Ok(Json(state.recommendations.history(user_id, page).await?))
}

pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<RecommendationView>> {
    let view = state.recommendations.get(id).await?;
    auth.ensure_self_or_admin(view.recommendation.user_id)?;
    Ok(Json(view))
}

pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let view = state.recommendations.get(id).await?;
    auth.ensure_self_or_admin(view.recommendation.user_id)?;
    state.recommendations.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Records how the perfume actually performed
pub async fn feedback(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<i64>,
    Json(input): Json<FeedbackInput>,
) -> AppResult<Json<RecommendationView>> {
    let view = state.recommendations.get(id).await?;
    auth.ensure_self_or_admin(view.recommendation.user_id)?;
    Ok(Json(state.recommendations.feedback(id, input).await?))
}
