/// Read-through caching for an async computation returning `AppResult<T>`.
///
/// The key is resolved against the catalog generation first. On a hit the cached value is
/// returned; on a miss `$block` is awaited, the value is queued for a background write under
/// that same resolved key with `$ttl` seconds to live, and returned. `$cache` must expose
/// `versioned_key`, `get_from_cache` and `set_in_background`.
///
/// ```rust,ignore
/// let perfumes: Vec<Perfume> = cached!(cache, CacheKey::Catalog(filter.clone()), ttl, async {
///     store.list_perfumes(&filter).await
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        match $cache.versioned_key(&$key).await {
            Ok(key) => match $cache.get_from_cache(&key).await {
                Ok(Some(cached)) => Ok(cached),
                Ok(None) => match $block.await {
                    Ok(value) => {
                        $cache.set_in_background(&key, &value, $ttl);
                        Ok(value)
                    }
                    Err(e) => Err(e),
                },
                Err(e) => Err(e),
            },
            Err(e) => Err(e),
        }
    }};
}
