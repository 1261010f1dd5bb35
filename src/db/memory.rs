use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::ScentStore;
use crate::error::{AppError, AppResult};
use crate::models::{
    Feedback, NewRecommendation, NewResponse, NewUser, PageRequest, Perfume, PerfumeDraft,
    PerfumeFilter, QuestionnaireResponse, Recommendation, User, UserChanges, UserProfile,
};

/// Process-local store used for development and tests
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Tables>>,
}

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    profiles: HashMap<i64, UserProfile>,
    responses: BTreeMap<i64, QuestionnaireResponse>,
    perfumes: BTreeMap<i64, Perfume>,
    recommendations: BTreeMap<i64, Recommendation>,
    last_id: i64,
}

impl Tables {
    /// Ids are shared across tables, which keeps them unique and increasing
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn check_unique(&self, username: &str, email: &str, except: Option<i64>) -> AppResult<()> {
        for user in self.users.values().filter(|u| Some(u.id) != except) {
            if user.username == username {
                return Err(AppError::Conflict(format!(
                    "username '{}' is already taken",
                    username
                )));
            }
            if user.email.eq_ignore_ascii_case(email) {
                return Err(AppError::Conflict(format!(
                    "e-mail '{}' is already registered",
                    email
                )));
            }
        }
        Ok(())
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScentStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let mut tables = self.inner.write().await;
        tables.check_unique(&user.username, &user.email, None)?;

        let user = User {
            id: tables.next_id(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            personal: user.personal,
            created_at: Utc::now(),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: i64) -> AppResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let tables = self.inner.read().await;
        Ok(tables
            .users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        Ok(self.inner.read().await.users.values().cloned().collect())
    }

    async fn update_user(&self, id: i64, changes: UserChanges) -> AppResult<Option<User>> {
        let mut tables = self.inner.write().await;
        let Some(mut user) = tables.users.get(&id).cloned() else {
            return Ok(None);
        };

        user.apply(changes);
        tables.check_unique(&user.username, &user.email, Some(id))?;
        tables.users.insert(id, user.clone());
        Ok(Some(user))
    }

    async fn delete_user(&self, id: i64) -> AppResult<bool> {
        let mut tables = self.inner.write().await;
        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }
        tables.profiles.remove(&id);
        tables.responses.retain(|_, r| r.user_id != id);
        tables.recommendations.retain(|_, r| r.user_id != id);
        Ok(true)
    }

    async fn get_profile(&self, user_id: i64) -> AppResult<Option<UserProfile>> {
        Ok(self.inner.read().await.profiles.get(&user_id).cloned())
    }

    async fn save_profile(&self, profile: UserProfile) -> AppResult<UserProfile> {
        let mut tables = self.inner.write().await;
        if !tables.users.contains_key(&profile.user_id) {
            return Err(AppError::NotFound(format!("User {}", profile.user_id)));
        }
        tables.profiles.insert(profile.user_id, profile.clone());
        Ok(profile)
    }

    async fn delete_profile(&self, user_id: i64) -> AppResult<bool> {
        Ok(self.inner.write().await.profiles.remove(&user_id).is_some())
    }

    async fn add_response(
        &self,
        user_id: i64,
        response: NewResponse,
    ) -> AppResult<QuestionnaireResponse> {
        let mut tables = self.inner.write().await;
        let response = QuestionnaireResponse {
            id: tables.next_id(),
            user_id,
            question_id: response.question_id,
            answer_text: response.answer_text,
            answer_number: response.answer_number,
            answer_json: response.answer_json,
            created_at: Utc::now(),
        };
        tables.responses.insert(response.id, response.clone());
        Ok(response)
    }

    async fn list_responses(&self, user_id: i64) -> AppResult<Vec<QuestionnaireResponse>> {
        let tables = self.inner.read().await;
        Ok(tables
            .responses
            .values()
            .rev()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn delete_response(&self, user_id: i64, response_id: i64) -> AppResult<bool> {
        let mut tables = self.inner.write().await;
        match tables.responses.get(&response_id) {
            Some(response) if response.user_id == user_id => {
                tables.responses.remove(&response_id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn create_perfume(&self, draft: PerfumeDraft) -> AppResult<Perfume> {
        let mut tables = self.inner.write().await;
        let perfume = Perfume {
            id: tables.next_id(),
            details: draft,
        };
        tables.perfumes.insert(perfume.id, perfume.clone());
        Ok(perfume)
    }

    async fn get_perfume(&self, id: i64) -> AppResult<Option<Perfume>> {
        Ok(self.inner.read().await.perfumes.get(&id).cloned())
    }

    async fn list_perfumes(&self, filter: &PerfumeFilter) -> AppResult<Vec<Perfume>> {
        let tables = self.inner.read().await;
        Ok(tables
            .perfumes
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect())
    }

    async fn update_perfume(&self, id: i64, draft: PerfumeDraft) -> AppResult<Option<Perfume>> {
        let mut tables = self.inner.write().await;
        Ok(tables.perfumes.get_mut(&id).map(|perfume| {
            perfume.details = draft;
            perfume.clone()
        }))
    }

    async fn delete_perfume(&self, id: i64) -> AppResult<bool> {
        let mut tables = self.inner.write().await;
        if tables.perfumes.remove(&id).is_none() {
            return Ok(false);
        }
        tables.recommendations.retain(|_, r| r.perfume_id != id);
        Ok(true)
    }

    async fn count_perfumes(&self) -> AppResult<u64> {
        Ok(self.inner.read().await.perfumes.len() as u64)
    }

    async fn insert_recommendations(
        &self,
        recommendations: Vec<NewRecommendation>,
    ) -> AppResult<Vec<Recommendation>> {
        let mut tables = self.inner.write().await;
        let now = Utc::now();
        let mut stored = Vec::with_capacity(recommendations.len());

        for new in recommendations {
            let recommendation = Recommendation {
                id: tables.next_id(),
                user_id: new.user_id,
                perfume_id: new.perfume_id,
                recommendation_date: now,
                context: new.context,
                predictions: new.predictions,
                explanation: new.explanation,
                feedback: Feedback::default(),
            };
            tables
                .recommendations
                .insert(recommendation.id, recommendation.clone());
            stored.push(recommendation);
        }
        Ok(stored)
    }

    async fn get_recommendation(&self, id: i64) -> AppResult<Option<Recommendation>> {
        Ok(self.inner.read().await.recommendations.get(&id).cloned())
    }

    async fn list_recommendations(
        &self,
        user_id: i64,
        page: PageRequest,
    ) -> AppResult<(Vec<Recommendation>, u64)> {
        let tables = self.inner.read().await;
        // Newest batch first, rank order within a batch
        let mut history: Vec<&Recommendation> = tables
            .recommendations
            .values()
            .filter(|r| r.user_id == user_id)
            .collect();
        history.sort_by(|a, b| {
            b.recommendation_date
                .cmp(&a.recommendation_date)
                .then(a.id.cmp(&b.id))
        });

        let total = history.len() as u64;
        let items = history
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.per_page as usize)
            .cloned()
            .collect();
        Ok((items, total))
    }

    async fn update_feedback(
        &self,
        id: i64,
        feedback: Feedback,
    ) -> AppResult<Option<Recommendation>> {
        let mut tables = self.inner.write().await;
        Ok(tables.recommendations.get_mut(&id).map(|recommendation| {
            recommendation.feedback = feedback;
            recommendation.clone()
        }))
    }

    async fn delete_recommendation(&self, id: i64) -> AppResult<bool> {
        Ok(self.inner.write().await.recommendations.remove(&id).is_some())
    }
}
