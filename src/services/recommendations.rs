use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{
    db::ScentStore,
    error::{AppError, AppResult},
    models::{
        Airflow, FeedbackInput, HumidityBand, NewRecommendation, Page, PageRequest, Perfume,
        PerfumeFilter, Predictions, Recommendation, RecommendationContext, TemperatureBand,
    },
    services::{
        catalog::CatalogService,
        scoring::{RecommendationEngine, ScoringContext},
    },
};

/// Most perfumes a single request may ask for
pub const MAX_LIMIT: usize = 50;

/// Situation to recommend for
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecommendRequest {
    #[serde(flatten)]
    pub context: RecommendationContext,
    /// Takes precedence over `temperature`
    pub temperature_band: Option<TemperatureBand>,
    /// Takes precedence over `humidity`
    pub humidity_band: Option<HumidityBand>,
    pub airflow: Option<Airflow>,
    pub limit: Option<usize>,
}

impl RecommendRequest {
    fn validate(&self) -> AppResult<()> {
        if let Some(limit) = self.limit {
            if !(1..=MAX_LIMIT).contains(&limit) {
                return Err(AppError::InvalidInput(format!(
                    "limit must be between 1 and {}",
                    MAX_LIMIT
                )));
            }
        }
        if let Some(temperature) = self.context.temperature {
            if !temperature.is_finite() {
                return Err(AppError::InvalidInput(
                    "temperature must be a number".to_string(),
                ));
            }
        }
        if let Some(humidity) = self.context.humidity {
            if !(0.0..=100.0).contains(&humidity) {
                return Err(AppError::InvalidInput(
                    "humidity must be a percentage between 0 and 100".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn scoring_context(&self) -> ScoringContext {
        ScoringContext {
            temperature_band: self
                .temperature_band
                .or_else(|| self.context.temperature.map(TemperatureBand::from_celsius)),
            humidity_band: self
                .humidity_band
                .or_else(|| self.context.humidity.map(HumidityBand::from_percent)),
            airflow: self.airflow,
            weather: self.context.weather.clone(),
            activity: self.context.activity.clone(),
        }
    }
}

/// One freshly generated recommendation
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecommendedPerfume {
    pub recommendation_id: i64,
    pub perfume: Perfume,
    pub predictions: Predictions,
    pub explanation: String,
}

/// A stored recommendation with its perfume, if it still exists
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecommendationView {
    #[serde(flatten)]
    pub recommendation: Recommendation,
    pub perfume: Option<Perfume>,
}

#[derive(Clone)]
pub struct RecommendationService {
    store: Arc<dyn ScentStore>,
    catalog: CatalogService,
    engine: RecommendationEngine,
    default_limit: usize,
}

impl RecommendationService {
    pub fn new(store: Arc<dyn ScentStore>, catalog: CatalogService, default_limit: usize) -> Self {
        Self {
            store,
            catalog,
            engine: RecommendationEngine::new(),
            default_limit: default_limit.clamp(1, MAX_LIMIT),
        }
    }

    /// Ranks the catalog for the user's profile and records the result
    pub async fn generate(
        &self,
        user_id: i64,
        request: RecommendRequest,
    ) -> AppResult<Vec<RecommendedPerfume>> {
        request.validate()?;
        let limit = request.limit.unwrap_or(self.default_limit);
        self.rank_and_store(user_id, &request, limit).await
    }

    /// The single best pick for today's conditions; 404 when nothing passes the filters
    pub async fn daily(
        &self,
        user_id: i64,
        request: RecommendRequest,
    ) -> AppResult<RecommendedPerfume> {
        request.validate()?;
        self.rank_and_store(user_id, &request, 1)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                AppError::NotFound(format!("No perfume matches the profile of user {}", user_id))
            })
    }

    /// Most recent recommendation of the user, the top pick when it came from a batch
    pub async fn latest(&self, user_id: i64) -> AppResult<RecommendationView> {
        let first = PageRequest {
            page: 1,
            per_page: 1,
        };
        self.history(user_id, first)
            .await?
            .items
            .into_iter()
            .next()
            .ok_or_else(|| AppError::NotFound(format!("Recommendations for user {}", user_id)))
    }

    async fn rank_and_store(
        &self,
        user_id: i64,
        request: &RecommendRequest,
        limit: usize,
    ) -> AppResult<Vec<RecommendedPerfume>> {
        let profile = self
            .store
            .get_profile(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Profile for user {}", user_id)))?;

        let catalog = self.catalog.list(PerfumeFilter::default()).await?;
        let ranked = self
            .engine
            .rank(&profile, &request.scoring_context(), &catalog, limit);

        if ranked.is_empty() {
            tracing::info!(user_id, catalog = catalog.len(), "No perfume passed the profile filters");
            return Ok(Vec::new());
        }

        let rows = ranked
            .iter()
            .map(|scored| NewRecommendation {
                user_id,
                perfume_id: scored.perfume.id,
                context: request.context.clone(),
                predictions: scored.predictions,
                explanation: Some(scored.explanation.clone()),
            })
            .collect();
        let stored = self.store.insert_recommendations(rows).await?;

        tracing::info!(
            user_id,
            count = stored.len(),
            top_perfume = ranked[0].perfume.id,
            top_utility = ranked[0].predictions.utility_score,
            "Recommendations generated"
        );

        Ok(stored
            .into_iter()
            .zip(ranked)
            .map(|(recommendation, scored)| RecommendedPerfume {
                recommendation_id: recommendation.id,
                perfume: scored.perfume,
                predictions: scored.predictions,
                explanation: scored.explanation,
            })
            .collect())
    }

    /// A page of the user's history, newest first
    pub async fn history(
        &self,
        user_id: i64,
        page: PageRequest,
    ) -> AppResult<Page<RecommendationView>> {
        page.validate()?;
        let (recommendations, total) = self.store.list_recommendations(user_id, page).await?;

        let mut perfumes: HashMap<i64, Option<Perfume>> = HashMap::new();
        let mut items = Vec::with_capacity(recommendations.len());
        for recommendation in recommendations {
            let perfume = match perfumes.get(&recommendation.perfume_id) {
                Some(perfume) => perfume.clone(),
                None => {
                    let perfume = self.store.get_perfume(recommendation.perfume_id).await?;
                    perfumes.insert(recommendation.perfume_id, perfume.clone());
                    perfume
                }
            };
            items.push(RecommendationView {
                recommendation,
                perfume,
            });
        }

        Ok(Page {
            items,
            page: page.page,
            per_page: page.per_page,
            total,
        })
    }

    pub async fn get(&self, id: i64) -> AppResult<RecommendationView> {
        let recommendation = self
            .store
            .get_recommendation(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Recommendation {}", id)))?;
        let perfume = self.store.get_perfume(recommendation.perfume_id).await?;
        Ok(RecommendationView {
            recommendation,
            perfume,
        })
    }

    pub async fn delete(&self, id: i64) -> AppResult<()> {
        if !self.store.delete_recommendation(id).await? {
            return Err(AppError::NotFound(format!("Recommendation {}", id)));
        }
        Ok(())
    }

    /// Records what the user observed; fields left out keep earlier feedback
    pub async fn feedback(&self, id: i64, input: FeedbackInput) -> AppResult<RecommendationView> {
        input.validate()?;
        let mut view = self.get(id).await?;

        let mut feedback = view.recommendation.feedback.clone();
        input.merge_into(&mut feedback, Utc::now());

        view.recommendation = self
            .store
            .update_feedback(id, feedback)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Recommendation {}", id)))?;

        tracing::info!(
            recommendation_id = id,
            rating = ?view.recommendation.feedback.user_rating,
            "Feedback recorded"
        );
        Ok(view)
    }
}
