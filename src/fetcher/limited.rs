use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::app::{CanopyError, Result};
use crate::cache::ItemCache;
use crate::domain::{Category, Item, ItemId, User};
use crate::index::LookAside;
use crate::source::ItemSource;

pub const DEFAULT_MAX_CONCURRENCY: usize = 3;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Gate in front of the remote source.
///
/// At most `max_concurrency` remote calls are in flight at any moment,
/// shared by every caller holding this fetcher. Each call is bounded by an
/// absolute timeout. Successful item fetches land in the item cache and the
/// look-aside index before being returned.
pub struct RateLimitedFetcher {
    source: Arc<dyn ItemSource>,
    cache: Arc<ItemCache>,
    index: Option<Arc<dyn LookAside>>,
    semaphore: Arc<Semaphore>,
    max_concurrency: usize,
    timeout: Duration,
}

impl RateLimitedFetcher {
    pub fn new(source: Arc<dyn ItemSource>, cache: Arc<ItemCache>) -> Self {
        Self::with_limits(source, cache, DEFAULT_MAX_CONCURRENCY, DEFAULT_TIMEOUT)
    }

    pub fn with_limits(
        source: Arc<dyn ItemSource>,
        cache: Arc<ItemCache>,
        max_concurrency: usize,
        timeout: Duration,
    ) -> Self {
        let max_concurrency = max_concurrency.max(1);
        Self {
            source,
            cache,
            index: None,
            semaphore: Arc::new(Semaphore::new(max_concurrency)),
            max_concurrency,
            timeout,
        }
    }

    pub fn with_index(mut self, index: Arc<dyn LookAside>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn cache(&self) -> &Arc<ItemCache> {
        &self.cache
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Remote calls currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.max_concurrency - self.semaphore.available_permits()
    }

    /// Fetch an item from the remote source, bypassing every cache.
    pub async fn fetch(&self, id: ItemId) -> Result<Item> {
        let item = self.limited(self.source.fetch_item(id)).await?;
        tracing::debug!("Fetched item {} from remote", id);

        self.cache.put_item(item.clone());
        if let Some(index) = &self.index {
            if let Err(e) = index.index_item(&item) {
                tracing::warn!("Failed to index item {}: {}", id, e);
            }
        }

        Ok(item)
    }

    /// Read an item through the caches, falling back to [`fetch`](Self::fetch).
    pub async fn get(&self, id: ItemId) -> Result<Item> {
        if let Some(item) = self.cache.get_item(id) {
            return Ok(item);
        }

        if let Some(index) = &self.index {
            match index.lookup(id) {
                Ok(Some(item)) => {
                    tracing::debug!("Index hit for item {}", id);
                    self.cache.put_item(item.clone());
                    return Ok(item);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("Index lookup failed for item {}: {}", id, e),
            }
        }

        self.fetch(id).await
    }

    pub async fn category_ids(&self, category: Category) -> Result<Vec<ItemId>> {
        self.limited(self.source.fetch_category_ids(category)).await
    }

    pub async fn max_id(&self) -> Result<ItemId> {
        self.limited(self.source.fetch_max_id()).await
    }

    /// User profiles are not cached.
    pub async fn user(&self, name: &str) -> Result<User> {
        self.limited(self.source.fetch_user(name)).await
    }

    async fn limited<T, F>(&self, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        // the permit is released on drop, whichever way the call ends
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| CanopyError::Other(format!("fetcher closed: {}", e)))?;

        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(CanopyError::Timeout(self.timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ItemKind;
    use crate::source::mock::{story, MockSource};
    use crate::store::SqliteStore;

    fn fetcher_for(source: Arc<MockSource>, limit: usize, timeout: Duration) -> RateLimitedFetcher {
        RateLimitedFetcher::with_limits(source, Arc::new(ItemCache::in_memory()), limit, timeout)
    }

    #[tokio::test]
    async fn test_fetch_populates_cache() {
        let source = Arc::new(MockSource::new());
        source.insert(story(1, vec![]));
        let fetcher = fetcher_for(source.clone(), 3, DEFAULT_TIMEOUT);

        let item = fetcher.fetch(1).await.unwrap();
        assert_eq!(item.id, 1);
        assert_eq!(fetcher.cache().get_item(1), Some(item));
    }

    #[tokio::test]
    async fn test_get_prefers_cache() {
        let source = Arc::new(MockSource::new());
        source.insert(story(1, vec![]));
        let fetcher = fetcher_for(source.clone(), 3, DEFAULT_TIMEOUT);

        fetcher.get(1).await.unwrap();
        fetcher.get(1).await.unwrap();
        assert_eq!(source.calls(), 1);

        fetcher.fetch(1).await.unwrap();
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_get_consults_index_and_fetch_feeds_it() {
        let source = Arc::new(MockSource::new());
        source.insert(story(1, vec![]));
        let index = Arc::new(SqliteStore::in_memory().unwrap());

        let mut indexed = Item::new(2, ItemKind::Story);
        indexed.title = Some("from index".into());
        index.index_item(&indexed).unwrap();

        let fetcher = fetcher_for(source.clone(), 3, DEFAULT_TIMEOUT).with_index(index.clone());

        let hit = fetcher.get(2).await.unwrap();
        assert_eq!(hit.title.as_deref(), Some("from index"));
        assert_eq!(source.calls(), 0);

        fetcher.get(1).await.unwrap();
        assert_eq!(source.calls(), 1);
        assert!(index.lookup(1).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_not_found_is_error() {
        let source = Arc::new(MockSource::new());
        let fetcher = fetcher_for(source, 3, DEFAULT_TIMEOUT);
        let err = fetcher.fetch(404).await.unwrap_err();
        assert!(matches!(err, CanopyError::ItemNotFound(404)));
        assert!(fetcher.cache().get_item(404).is_none());
    }

    #[tokio::test]
    async fn test_timeout_is_distinct_and_releases_slot() {
        let source = Arc::new(MockSource::hanging());
        let fetcher = fetcher_for(source, 1, Duration::from_millis(20));

        let err = fetcher.fetch(1).await.unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(fetcher.in_flight(), 0);

        // a leaked slot would make this second call hang forever instead of timing out
        let err = fetcher.max_id().await.unwrap_err();
        assert!(matches!(err, CanopyError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_errors_release_slot() {
        let source = Arc::new(MockSource::new());
        source.fail(1);
        let fetcher = fetcher_for(source, 1, DEFAULT_TIMEOUT);

        for _ in 0..5 {
            tokio_test::assert_err!(fetcher.fetch(1).await);
        }
        assert_eq!(fetcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_user_goes_through_slot() {
        let source = Arc::new(MockSource::new());
        source.insert_user(User {
            id: "pg".into(),
            created: 1160418092,
            karma: 157236,
            about: None,
            submitted: vec![1],
        });
        let fetcher = fetcher_for(source.clone(), 3, DEFAULT_TIMEOUT);

        assert_eq!(fetcher.user("pg").await.unwrap().karma, 157236);
        let err = fetcher.user("nobody").await.unwrap_err();
        assert!(matches!(err, CanopyError::UserNotFound(_)));
        assert_eq!(source.calls(), 2);

        let hanging = fetcher_for(Arc::new(MockSource::hanging()), 1, Duration::from_millis(20));
        assert!(hanging.user("pg").await.unwrap_err().is_timeout());
        assert_eq!(hanging.in_flight(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_flood_never_exceeds_bound() {
        let source = Arc::new(
            MockSource::new().with_latency(|id| Duration::from_micros(200 + (id % 7) * 100)),
        );
        for id in 1..=1000 {
            source.insert(story(id, vec![]));
        }
        let fetcher = Arc::new(fetcher_for(source.clone(), 3, DEFAULT_TIMEOUT));

        let mut tasks = tokio::task::JoinSet::new();
        for id in 1..=1000 {
            let fetcher = fetcher.clone();
            tasks.spawn(async move { fetcher.fetch(id).await });
        }

        let mut ok = 0;
        while let Some(joined) = tasks.join_next().await {
            if joined.unwrap().is_ok() {
                ok += 1;
            }
        }

        assert_eq!(ok, 1000);
        assert_eq!(source.calls(), 1000);
        assert!(source.peak_in_flight() <= 3);
        assert!(source.peak_in_flight() >= 1);
        assert_eq!(fetcher.in_flight(), 0);
    }
}
