//! Two-tier cache.
//!
//! ```text
//! ItemCache ─┬─ ItemTier  (in-process, raw items by ID, no eviction)
//!            └─ PageTier  (persisted, assembled composites with a timestamp)
//! ```
//!
//! The persisted tier is optional. Any failure reading or writing it is
//! logged and treated as a miss.

pub mod clock;
pub mod memory;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::app::Result;
use crate::domain::{Category, CommentWithStory, Item, ItemId, ItemPage};

pub use clock::{Clock, ManualClock, SystemClock};
pub use memory::MemoryItemTier;

/// Default freshness window for composites.
pub const DEFAULT_FRESHNESS: Duration = Duration::from_secs(5 * 60);

/// In-process raw item storage. Readers never block each other.
pub trait ItemTier: Send + Sync {
    fn get(&self, id: ItemId) -> Option<Item>;
    fn put(&self, item: Item);
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Durable storage for serialized composites.
pub trait PageTier: Send + Sync {
    fn load(&self, key: &CacheKey) -> Result<Option<StoredEntry>>;
    fn store(&self, key: &CacheKey, entry: &StoredEntry) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Full assembled listing for a category.
    Listing(Category),
    /// Comment tree rooted at an item.
    Page(ItemId),
    /// Most recent scan of new comments.
    NewComments,
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Listing(category) => write!(f, "listing:{}", category),
            CacheKey::Page(id) => write!(f, "item:{}", id),
            CacheKey::NewComments => f.write_str("newcomments"),
        }
    }
}

/// Serialized composite as held by a [`PageTier`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEntry {
    pub payload: String,
    pub cached_at: DateTime<Utc>,
}

/// A cache read. Stale values are still handed back so callers can compare
/// against them, but `fresh` is false.
#[derive(Debug, Clone, PartialEq)]
pub struct Cached<T> {
    pub value: T,
    pub cached_at: DateTime<Utc>,
    pub fresh: bool,
}

impl<T> Cached<T> {
    pub fn into_fresh(self) -> Option<T> {
        self.fresh.then_some(self.value)
    }
}

pub struct ItemCache {
    items: Arc<dyn ItemTier>,
    pages: Option<Arc<dyn PageTier>>,
    clock: Arc<dyn Clock>,
    freshness: chrono::Duration,
}

impl ItemCache {
    pub fn new(
        items: Arc<dyn ItemTier>,
        pages: Option<Arc<dyn PageTier>>,
        clock: Arc<dyn Clock>,
        freshness: Duration,
    ) -> Self {
        Self {
            items,
            pages,
            clock,
            freshness: chrono::Duration::from_std(freshness)
                .unwrap_or_else(|_| chrono::Duration::seconds(DEFAULT_FRESHNESS.as_secs() as i64)),
        }
    }

    /// Memory-only cache with the system clock.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryItemTier::new()),
            None,
            Arc::new(SystemClock),
            DEFAULT_FRESHNESS,
        )
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn get_item(&self, id: ItemId) -> Option<Item> {
        self.items.get(id)
    }

    pub fn put_item(&self, item: Item) {
        self.items.put(item);
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn get_listing(&self, category: Category) -> Option<Cached<Vec<Item>>> {
        self.load(&CacheKey::Listing(category))
    }

    pub fn put_listing(&self, category: Category, items: &[Item]) {
        self.save(&CacheKey::Listing(category), &items, self.now());
    }

    pub fn get_page(&self, id: ItemId) -> Option<Cached<ItemPage>> {
        self.load(&CacheKey::Page(id))
    }

    pub fn put_page(&self, page: &ItemPage) {
        self.save(&CacheKey::Page(page.item.id), page, page.cached_at);
    }

    pub fn get_new_comments(&self) -> Option<Cached<Vec<CommentWithStory>>> {
        self.load(&CacheKey::NewComments)
    }

    pub fn put_new_comments(&self, comments: &[CommentWithStory]) {
        self.save(&CacheKey::NewComments, &comments, self.now());
    }

    fn is_fresh(&self, cached_at: DateTime<Utc>) -> bool {
        self.now().signed_duration_since(cached_at) < self.freshness
    }

    fn load<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<Cached<T>> {
        let pages = self.pages.as_ref()?;

        let entry = match pages.load(key) {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Cache read failed for {}: {}", key, e);
                return None;
            }
        };

        match serde_json::from_str(&entry.payload) {
            Ok(value) => Some(Cached {
                value,
                cached_at: entry.cached_at,
                fresh: self.is_fresh(entry.cached_at),
            }),
            Err(e) => {
                tracing::warn!("Discarding unreadable cache entry {}: {}", key, e);
                None
            }
        }
    }

    fn save<T: Serialize + ?Sized>(&self, key: &CacheKey, value: &T, cached_at: DateTime<Utc>) {
        let Some(pages) = self.pages.as_ref() else {
            return;
        };

        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("Failed to serialize cache entry {}: {}", key, e);
                return;
            }
        };

        let entry = StoredEntry { payload, cached_at };
        match pages.store(key, &entry) {
            Ok(()) => tracing::debug!("Cached {}", key),
            Err(e) => tracing::warn!("Failed to write cache entry {}: {}", key, e),
        }
    }
}
