use std::sync::Arc;

use crate::{
    db::ScentStore,
    error::{AppError, AppResult},
    models::{ProfileInput, UserProfile},
    services::questionnaire::profile_input_from_responses,
};

/// Reads and writes scent profiles
#[derive(Clone)]
pub struct ProfileService {
    store: Arc<dyn ScentStore>,
}

impl ProfileService {
    pub fn new(store: Arc<dyn ScentStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, user_id: i64) -> AppResult<UserProfile> {
        self.store
            .get_profile(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Profile for user {}", user_id)))
    }

    /// Overlays `input` on the stored profile, or on the defaults when there is none yet
    pub async fn upsert(&self, user_id: i64, input: ProfileInput) -> AppResult<UserProfile> {
        let base = self.base_profile(user_id).await?;
        let profile = input.apply(base)?;
        let saved = self.store.save_profile(profile).await?;
        tracing::info!(user_id, "Profile saved");
        Ok(saved)
    }

    /// Rebuilds the profile from the latest answer to each questionnaire question
    pub async fn from_questionnaire(&self, user_id: i64) -> AppResult<UserProfile> {
        let responses = self.store.list_responses(user_id).await?;
        if responses.is_empty() {
            return Err(AppError::InvalidInput(format!(
                "user {} has not answered the questionnaire",
                user_id
            )));
        }

        let input = profile_input_from_responses(&responses)?;
        tracing::debug!(user_id, answers = responses.len(), "Building profile from questionnaire");
        self.upsert(user_id, input).await
    }

    pub async fn delete(&self, user_id: i64) -> AppResult<()> {
        if !self.store.delete_profile(user_id).await? {
            return Err(AppError::NotFound(format!("Profile for user {}", user_id)));
        }
        Ok(())
    }

    async fn base_profile(&self, user_id: i64) -> AppResult<UserProfile> {
        if let Some(profile) = self.store.get_profile(user_id).await? {
            return Ok(profile);
        }
        if self.store.get_user(user_id).await?.is_none() {
            return Err(AppError::NotFound(format!("User {}", user_id)));
        }
        Ok(UserProfile::defaults(user_id))
    }
}
