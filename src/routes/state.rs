use std::sync::Arc;

use crate::{
    config::Config,
    db::{Cache, ScentStore},
    services::{
        accounts::AccountService, catalog::CatalogService, profiles::ProfileService,
        questionnaire::QuestionnaireService, recommendations::RecommendationService,
    },
};

/// Shared application state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub accounts: AccountService,
    pub profiles: ProfileService,
    pub questionnaire: QuestionnaireService,
    pub catalog: CatalogService,
    pub recommendations: RecommendationService,
}

impl AppState {
    /// Wires every service onto one store and an optional cache
    pub fn new(store: Arc<dyn ScentStore>, cache: Option<Cache>, config: Config) -> Self {
        let catalog = CatalogService::new(store.clone(), cache, config.catalog_cache_ttl_secs);

        Self {
            accounts: AccountService::new(store.clone(), &config),
            profiles: ProfileService::new(store.clone()),
            questionnaire: QuestionnaireService::new(store.clone()),
            recommendations: RecommendationService::new(
                store,
                catalog.clone(),
                config.recommendation_limit,
            ),
            catalog,
            config: Arc::new(config),
        }
    }
}
