use std::fs;
use std::sync::Arc;

use crate::app::error::{CanopyError, Result};
use crate::assembler::PageAssembler;
use crate::cache::{Clock, ItemCache, MemoryItemTier, PageTier, SystemClock};
use crate::config::Config;
use crate::domain::{Item, User};
use crate::fetcher::RateLimitedFetcher;
use crate::index::LookAside;
use crate::refresher::{RefreshSettings, Refresher, RefresherHandle};
use crate::scanner::ActivityScanner;
use crate::source::{HttpSource, ItemSource};
use crate::store::SqliteStore;
use crate::thread::{RootResolver, ThreadBuilder};

/// Every component, wired together from a [`Config`].
pub struct AppContext {
    pub config: Config,
    pub store: Option<Arc<SqliteStore>>,
    pub cache: Arc<ItemCache>,
    pub fetcher: Arc<RateLimitedFetcher>,
    pub assembler: Arc<PageAssembler>,
    pub threads: Arc<ThreadBuilder>,
    pub resolver: Arc<RootResolver>,
    pub scanner: Arc<ActivityScanner>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let store = if config.cache.persist {
            let db_path = config.db_path()?;
            if let Some(parent) = db_path.parent() {
                fs::create_dir_all(parent)?;
            }
            tracing::debug!("Opening cache database at {}", db_path.display());
            Some(Arc::new(SqliteStore::new(&db_path)?))
        } else {
            None
        };

        let source = Arc::new(HttpSource::new(&config.api)?);
        Ok(Self::from_parts(config, source, store, Arc::new(SystemClock)))
    }

    pub fn from_parts(
        config: Config,
        source: Arc<dyn ItemSource>,
        store: Option<Arc<SqliteStore>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let pages = store.clone().map(|s| s as Arc<dyn PageTier>);
        let cache = Arc::new(ItemCache::new(
            Arc::new(MemoryItemTier::new()),
            pages,
            clock,
            config.cache.freshness(),
        ));

        let mut fetcher = RateLimitedFetcher::with_limits(
            source,
            cache.clone(),
            config.fetcher.max_concurrency,
            config.fetcher.timeout(),
        );
        if config.cache.look_aside {
            if let Some(store) = &store {
                fetcher = fetcher.with_index(store.clone() as Arc<dyn LookAside>);
            }
        }
        let fetcher = Arc::new(fetcher);

        let assembler = Arc::new(PageAssembler::new(fetcher.clone()));
        let threads = Arc::new(ThreadBuilder::with_max_depth(
            fetcher.clone(),
            config.thread.max_depth,
        ));
        let resolver = Arc::new(RootResolver::with_max_hops(
            fetcher.clone(),
            config.thread.max_depth,
        ));
        let scanner = Arc::new(ActivityScanner::with_workers(
            fetcher.clone(),
            resolver.clone(),
            config.scanner.workers,
        ));

        Self {
            config,
            store,
            cache,
            fetcher,
            assembler,
            threads,
            resolver,
            scanner,
        }
    }

    /// A refresher over this context's components, configured from the
    /// `[refresher]` and `[scanner]` sections.
    pub fn refresher(&self) -> Result<Refresher> {
        let settings = RefreshSettings {
            interval: self.config.refresher.interval()?,
            categories: self.config.refresher.categories.clone(),
            per_page: self.config.refresher.per_page,
            comments_limit: self.config.scanner.limit,
            comments_deadline: self.config.scanner.deadline(),
            refresh_on_start: self.config.refresher.refresh_on_start,
        };
        Ok(Refresher::new(
            self.assembler.clone(),
            self.threads.clone(),
            self.scanner.clone(),
            settings,
        ))
    }

    pub fn spawn_refresher(&self) -> Result<RefresherHandle> {
        Ok(self.refresher()?.spawn())
    }

    /// Search items seen so far. Needs the persistent store.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<Item>> {
        let store = self.store.as_ref().ok_or_else(|| {
            CanopyError::Config("search needs the persistent cache (cache.persist = true)".into())
        })?;
        store.search(query, limit)
    }

    /// Items held by the local index, 0 without a persistent store.
    pub fn indexed_count(&self) -> Result<usize> {
        match &self.store {
            Some(store) => store.indexed_count(),
            None => Ok(0),
        }
    }

    pub async fn user(&self, name: &str) -> Result<User> {
        self.fetcher.user(name).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::cache::ManualClock;
    use crate::domain::Category;
    use crate::source::mock::{comment, story, MockSource};

    fn site() -> Arc<MockSource> {
        let source = MockSource::new();
        let mut first = story(1, vec![2]);
        first.title = Some("Rust in production".into());
        source.insert(first);
        source.insert(comment(2, 1, vec![]));
        source.set_category(Category::Top, vec![1]);
        Arc::new(source)
    }

    fn context(config: Config, persist: bool) -> AppContext {
        let store = persist.then(|| Arc::new(SqliteStore::in_memory().unwrap()));
        AppContext::from_parts(config, site(), store, Arc::new(ManualClock::new(Utc::now())))
    }

    #[tokio::test]
    async fn test_wires_components() {
        let mut config = Config::default();
        config.fetcher.max_concurrency = 2;
        let ctx = context(config, true);
        assert_eq!(ctx.fetcher.max_concurrency(), 2);

        let stories = ctx
            .assembler
            .assemble_page(Category::Top, 1, 30, false)
            .await
            .unwrap();
        assert_eq!(stories.len(), 1);

        let page = ctx.threads.item_page(1, false).await.unwrap();
        assert_eq!(page.comments.len(), 1);

        let root = ctx.resolver.resolve_root(&page.comments[0]).await.unwrap();
        assert_eq!(root.id, 1);
    }

    #[tokio::test]
    async fn test_search_over_fetched_items() {
        let ctx = context(Config::default(), true);
        ctx.fetcher.fetch(1).await.unwrap();

        let hits = ctx.search("rust", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 1);
        assert_eq!(ctx.indexed_count().unwrap(), 1);
    }

    #[test]
    fn test_search_without_store() {
        let ctx = context(Config::default(), false);
        assert!(matches!(ctx.search("rust", 10), Err(CanopyError::Config(_))));
        assert_eq!(ctx.indexed_count().unwrap(), 0);
    }

    #[test]
    fn test_refresher_rejects_bad_interval() {
        let mut config = Config::default();
        config.refresher.interval = "soon".into();
        let ctx = context(config, false);
        assert!(ctx.refresher().is_err());
    }
}
