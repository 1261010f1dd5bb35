use axum::{extract::State, http::StatusCode};

use crate::{
    error::AppResult,
    models::User,
    routes::{extract::Json, AppState},
    services::accounts::{AccessToken, LoginRequest, RegisterRequest},
};

/// Creates an account
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = state.accounts.register(request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Exchanges credentials for an access token
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<AccessToken>> {
    let token = state.accounts.login(request).await?;
    Ok(Json(token))
}
