use std::sync::Arc;

use crate::{
    cached,
    db::{Cache, CacheKey, ScentStore},
    error::{AppError, AppResult},
    models::{Perfume, PerfumeDraft, PerfumeFilter},
};

/// Catalog shipped with the service, loaded into an empty database at startup
const SAMPLE_CATALOG: &str = include_str!("../../data/perfumes.json");

pub fn sample_catalog() -> AppResult<Vec<PerfumeDraft>> {
    serde_json::from_str(SAMPLE_CATALOG)
        .map_err(|e| AppError::Internal(format!("Bundled catalog is malformed: {}", e)))
}

/// Perfume catalog with optional read-through caching
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn ScentStore>,
    cache: Option<Cache>,
    ttl: u64,
}

impl CatalogService {
    pub fn new(store: Arc<dyn ScentStore>, cache: Option<Cache>, ttl: u64) -> Self {
        Self { store, cache, ttl }
    }

    pub async fn list(&self, filter: PerfumeFilter) -> AppResult<Vec<Perfume>> {
        if let Some(cache) = &self.cache {
            let result: AppResult<Vec<Perfume>> =
                cached!(cache, CacheKey::Catalog(filter.clone()), self.ttl, async {
                    self.store.list_perfumes(&filter).await
                });
            match result {
                Err(AppError::Cache(e)) => {
                    tracing::warn!(error = %e, "Catalog cache unavailable, reading from store")
                }
                other => return other,
            }
        }
        self.store.list_perfumes(&filter).await
    }

    pub async fn get(&self, id: i64) -> AppResult<Perfume> {
        let not_found = || AppError::NotFound(format!("Perfume {}", id));

        if let Some(cache) = &self.cache {
            let result: AppResult<Perfume> =
                cached!(cache, CacheKey::Perfume(id), self.ttl, async {
                    self.store.get_perfume(id).await?.ok_or_else(not_found)
                });
            match result {
                Err(AppError::Cache(e)) => {
                    tracing::warn!(error = %e, "Catalog cache unavailable, reading from store")
                }
                other => return other,
            }
        }
        self.store.get_perfume(id).await?.ok_or_else(not_found)
    }

    pub async fn create(&self, draft: PerfumeDraft) -> AppResult<Perfume> {
        draft.validate()?;
        let perfume = self.store.create_perfume(draft).await?;
        tracing::info!(perfume_id = perfume.id, name = %perfume.details.name, "Perfume added");
        self.invalidate().await;
        Ok(perfume)
    }

    pub async fn update(&self, id: i64, draft: PerfumeDraft) -> AppResult<Perfume> {
        draft.validate()?;
        let perfume = self
            .store
            .update_perfume(id, draft)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Perfume {}", id)))?;
        self.invalidate().await;
        Ok(perfume)
    }

    pub async fn delete(&self, id: i64) -> AppResult<()> {
        if !self.store.delete_perfume(id).await? {
            return Err(AppError::NotFound(format!("Perfume {}", id)));
        }
        tracing::info!(perfume_id = id, "Perfume removed");
        self.invalidate().await;
        Ok(())
    }

    /// Inserts the bundled catalog when no perfume exists yet; returns how many were added
    pub async fn seed_if_empty(&self) -> AppResult<usize> {
        if self.store.count_perfumes().await? > 0 {
            tracing::debug!("Catalog already populated, skipping seed");
            return Ok(0);
        }

        let drafts = sample_catalog()?;
        let count = drafts.len();
        for draft in drafts {
            self.store.create_perfume(draft).await?;
        }
        self.invalidate().await;

        tracing::info!(count, "Seeded sample catalog");
        Ok(count)
    }

    /// A stale cache expires on its own, so a failed invalidation only warns
    async fn invalidate(&self) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.invalidate_catalog().await {
                tracing::warn!(error = %e, "Failed to invalidate catalog cache");
            }
        }
    }
}
