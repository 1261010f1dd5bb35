use std::fmt::Display;

use redis::{aio::ConnectionManager, AsyncCommands, Client, RedisResult};
use serde::{de::DeserializeOwned, Serialize};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use crate::{
    error::{AppError, AppResult},
    models::PerfumeFilter,
};

/// Every catalog key lives under this prefix
const CATALOG_PREFIX: &str = "perfumes";

/// Counter bumped by each catalog write. Keys embed it, so entries written under an older
/// generation are never read again and age out by TTL.
const GENERATION_KEY: &str = "perfumes:generation";

#[derive(Debug, Clone, PartialEq)]
pub enum CacheKey {
    Catalog(PerfumeFilter),
    Perfume(i64),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Catalog(filter) => {
                let text = |value: &Option<String>| {
                    value
                        .as_deref()
                        .map(|v| v.trim().to_lowercase())
                        .unwrap_or_default()
                };
                write!(
                    f,
                    "list:family={}:brand={}:presentation={}:season={}:max_price={}",
                    text(&filter.family),
                    text(&filter.brand),
                    filter.presentation.map(|p| p.label()).unwrap_or_default(),
                    filter.season.map(|s| s.label()).unwrap_or_default(),
                    filter.max_price.map(|p| p.to_string()).unwrap_or_default(),
                )
            }
            CacheKey::Perfume(id) => write!(f, "id:{}", id),
        }
    }
}

impl CacheKey {
    /// Redis key of this entry under the given catalog generation
    pub fn versioned(&self, generation: u64) -> String {
        format!("{}:v{}:{}", CATALOG_PREFIX, generation, self)
    }
}

/// Parses the URL; no connection is made until [`Cache::connect`]
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    Client::open(redis_url).map_err(|e| anyhow::anyhow!("Invalid Redis URL: {}", e))
}

/// Writes waiting for the background writer; beyond this, new writes are dropped
const WRITE_QUEUE_CAPACITY: usize = 1024;

struct PendingWrite {
    key: String,
    payload: String,
    ttl_secs: u64,
}

/// Read-through cache in front of the catalog.
///
/// Reads and invalidations run on the caller's task. Writes are queued to a single writer
/// task so a slow Redis never delays a response.
#[derive(Clone)]
pub struct Cache {
    conn: ConnectionManager,
    writes: mpsc::Sender<PendingWrite>,
}

/// Stops the writer task once the queued writes are flushed. Dropping the handle also stops it.
pub struct CacheWriterHandle {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl CacheWriterHandle {
    pub async fn shutdown(self) {
        let _ = self.stop.send(());
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Cache writer task panicked");
        }
    }
}

struct CacheWriter {
    conn: ConnectionManager,
    queue: mpsc::Receiver<PendingWrite>,
}

impl CacheWriter {
    async fn run(mut self, mut stop: oneshot::Receiver<()>) {
        tracing::debug!("Cache writer started");
        loop {
            tokio::select! {
                write = self.queue.recv() => match write {
                    Some(write) => self.apply(write).await,
                    None => break,
                },
                _ = &mut stop => break,
            }
        }

        self.queue.close();
        let mut flushed = 0usize;
        while let Some(write) = self.queue.recv().await {
            self.apply(write).await;
            flushed += 1;
        }
        tracing::info!(flushed, "Cache writer stopped");
    }

    async fn apply(&mut self, write: PendingWrite) {
        let result: RedisResult<()> = self
            .conn
            .set_ex(&write.key, write.payload, write.ttl_secs)
            .await;
        if let Err(e) = result {
            tracing::warn!(key = %write.key, error = %e, "Cache write failed");
        }
    }
}

impl Cache {
    /// Opens a managed connection and spawns the writer task
    pub async fn connect(client: Client) -> AppResult<(Self, CacheWriterHandle)> {
        let conn = ConnectionManager::new(client).await?;
        let (writes, queue) = mpsc::channel(WRITE_QUEUE_CAPACITY);
        let (stop, stopped) = oneshot::channel();

        let writer = CacheWriter {
            conn: conn.clone(),
            queue,
        };
        let task = tokio::spawn(writer.run(stopped));

        Ok((Self { conn, writes }, CacheWriterHandle { stop, task }))
    }

    /// Resolves `key` against the current catalog generation. Callers resolve once, before
    /// loading from the store, and write back under the same key.
    pub async fn versioned_key(&self, key: &CacheKey) -> AppResult<String> {
        let mut conn = self.conn.clone();
        let generation: Option<u64> = conn.get(GENERATION_KEY).await?;
        Ok(key.versioned(generation.unwrap_or(0)))
    }

    /// The cached value under `key`, or `None` on a miss
    pub async fn get_from_cache<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        let mut conn = self.conn.clone();
        let payload: Option<String> = conn.get(key).await?;

        payload
            .map(|json| {
                serde_json::from_str(&json).map_err(|e| {
                    AppError::Internal(format!("Corrupt cache entry under {}: {}", key, e))
                })
            })
            .transpose()
    }

    /// Queues a write and returns immediately
    pub fn set_in_background<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Value not cacheable");
                return;
            }
        };

        let write = PendingWrite {
            key: key.to_owned(),
            payload,
            ttl_secs,
        };
        match self.writes.try_send(write) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(write)) => {
                tracing::warn!(key = %write.key, "Cache write queue full, skipping write")
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("Cache writer stopped, skipping write")
            }
        }
    }

    /// Starts a new catalog generation. Runs inline so the next read sees the change, and
    /// a write still queued from before lands under the retired generation.
    pub async fn invalidate_catalog(&self) -> AppResult<()> {
        let mut conn = self.conn.clone();
        let generation: u64 = conn.incr(GENERATION_KEY, 1u64).await?;
        tracing::debug!(generation, "Invalidated cached catalog entries");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Presentation, Season};

    #[test]
    fn test_perfume_key() {
        assert_eq!(CacheKey::Perfume(42).to_string(), "id:42");
        assert_eq!(CacheKey::Perfume(42).versioned(0), "perfumes:v0:id:42");
    }

    #[test]
    fn test_generations_never_share_keys() {
        let key = CacheKey::Catalog(PerfumeFilter::default());
        assert_ne!(key.versioned(3), key.versioned(4));
        assert!(key.versioned(4).starts_with("perfumes:v4:list:"));
    }

    #[test]
    fn test_catalog_key_normalizes_text_filters() {
        let key = CacheKey::Catalog(PerfumeFilter {
            family: Some(" Woody ".to_string()),
            brand: Some("CHANEL".to_string()),
            ..Default::default()
        });
        assert_eq!(
            key.to_string(),
            "list:family=woody:brand=chanel:presentation=:season=:max_price="
        );
    }

    #[test]
    fn test_catalog_keys_differ_per_filter() {
        let all = CacheKey::Catalog(PerfumeFilter::default()).to_string();
        let summer = CacheKey::Catalog(PerfumeFilter {
            season: Some(Season::Summer),
            presentation: Some(Presentation::Unisex),
            max_price: Some(99.5),
            ..Default::default()
        })
        .to_string();

        assert_ne!(all, summer);
        assert!(summer.ends_with("presentation=Unisex:season=Summer:max_price=99.5"));
    }

    async fn live_cache() -> (Cache, CacheWriterHandle) {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let client = create_redis_client(&redis_url).unwrap();
        Cache::connect(client).await.unwrap()
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_round_trip_and_invalidate() {
        let (cache, handle) = live_cache().await;

        let key = cache.versioned_key(&CacheKey::Perfume(987_654)).await.unwrap();
        cache.set_in_background(&key, &vec!["Santal".to_string()], 60);
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let hit: Option<Vec<String>> = cache.get_from_cache(&key).await.unwrap();
        assert_eq!(hit, Some(vec!["Santal".to_string()]));

        cache.invalidate_catalog().await.unwrap();
        let key = cache.versioned_key(&CacheKey::Perfume(987_654)).await.unwrap();
        let miss: Option<Vec<String>> = cache.get_from_cache(&key).await.unwrap();
        assert_eq!(miss, None);

        handle.shutdown().await;
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_write_loaded_before_invalidation_is_not_served() {
        let (cache, handle) = live_cache().await;
        let entry = CacheKey::Perfume(987_655);

        // A reader resolves its key and loads the old row, then a catalog write lands
        let stale_key = cache.versioned_key(&entry).await.unwrap();
        cache.invalidate_catalog().await.unwrap();
        cache.set_in_background(&stale_key, &"old".to_string(), 60);
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let key = cache.versioned_key(&entry).await.unwrap();
        assert_ne!(key, stale_key);
        let cached: Option<String> = cache.get_from_cache(&key).await.unwrap();
        assert_eq!(cached, None);

        handle.shutdown().await;
    }
}
