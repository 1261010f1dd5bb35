use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{
    Feedback, NewRecommendation, NewResponse, NewUser, PageRequest, Perfume, PerfumeDraft,
    PerfumeFilter, QuestionnaireResponse, Recommendation, User, UserChanges, UserProfile,
};

/// Persistence boundary of the service.
///
/// Lookups return `Ok(None)` / `Ok(false)` for missing rows; callers decide whether that is a 404.
/// Deleting a user removes their profile, responses and recommendations. Deleting a perfume
/// removes the recommendations that point at it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScentStore: Send + Sync {
    /// Fails with `Conflict` when the username or e-mail is taken
    async fn create_user(&self, user: NewUser) -> AppResult<User>;
    async fn get_user(&self, id: i64) -> AppResult<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>>;
    async fn list_users(&self) -> AppResult<Vec<User>>;
    async fn update_user(&self, id: i64, changes: UserChanges) -> AppResult<Option<User>>;
    async fn delete_user(&self, id: i64) -> AppResult<bool>;

    async fn get_profile(&self, user_id: i64) -> AppResult<Option<UserProfile>>;
    /// Inserts or replaces the profile keyed by `profile.user_id`
    async fn save_profile(&self, profile: UserProfile) -> AppResult<UserProfile>;
    async fn delete_profile(&self, user_id: i64) -> AppResult<bool>;

    async fn add_response(
        &self,
        user_id: i64,
        response: NewResponse,
    ) -> AppResult<QuestionnaireResponse>;
    /// Newest first
    async fn list_responses(&self, user_id: i64) -> AppResult<Vec<QuestionnaireResponse>>;
    async fn delete_response(&self, user_id: i64, response_id: i64) -> AppResult<bool>;

    async fn create_perfume(&self, draft: PerfumeDraft) -> AppResult<Perfume>;
    async fn get_perfume(&self, id: i64) -> AppResult<Option<Perfume>>;
    /// Ordered by id
    async fn list_perfumes(&self, filter: &PerfumeFilter) -> AppResult<Vec<Perfume>>;
    async fn update_perfume(&self, id: i64, draft: PerfumeDraft) -> AppResult<Option<Perfume>>;
    async fn delete_perfume(&self, id: i64) -> AppResult<bool>;
    async fn count_perfumes(&self) -> AppResult<u64>;

    async fn insert_recommendations(
        &self,
        recommendations: Vec<NewRecommendation>,
    ) -> AppResult<Vec<Recommendation>>;
    async fn get_recommendation(&self, id: i64) -> AppResult<Option<Recommendation>>;
    /// One page of a user's history, newest first, with the total row count
    async fn list_recommendations(
        &self,
        user_id: i64,
        page: PageRequest,
    ) -> AppResult<(Vec<Recommendation>, u64)>;
    async fn update_feedback(&self, id: i64, feedback: Feedback)
        -> AppResult<Option<Recommendation>>;
    async fn delete_recommendation(&self, id: i64) -> AppResult<bool>;
}
