use axum::{extract::State, http::StatusCode};

use crate::{
    error::AppResult,
    middleware::AuthUser,
    models::{NewResponse, Question, QuestionnaireResponse},
    routes::{extract::{Json, Path}, AppState},
    services::questionnaire,
};

/// The fixed question catalog; public
pub async fn questions() -> Json<&'static [Question]> {
    Json(questionnaire::questions())
}

pub async fn submit(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<i64>,
    Json(response): Json<NewResponse>,
) -> AppResult<(StatusCode, Json<QuestionnaireResponse>)> {
    auth.ensure_self_or_admin(user_id)?;
    let stored = state.questionnaire.submit(user_id, response).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<i64>,
) -> AppResult<Json<Vec<QuestionnaireResponse>>> {
    auth.ensure_self_or_admin(user_id)?;
    Ok(Json(state.questionnaire.list(user_id).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((user_id, response_id)): Path<(i64, i64)>,
) -> AppResult<StatusCode> {
    auth.ensure_self_or_admin(user_id)?;
    state.questionnaire.delete(user_id, response_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
