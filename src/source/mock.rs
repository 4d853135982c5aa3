//! Scriptable in-memory source for exercising the engine without a network.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::app::{CanopyError, Result};
use crate::domain::{Category, Item, ItemId, ItemKind, User};
use crate::source::ItemSource;

#[derive(Default)]
pub struct MockSource {
    items: Mutex<HashMap<ItemId, Item>>,
    users: Mutex<HashMap<String, User>>,
    categories: Mutex<HashMap<Category, Vec<ItemId>>>,
    failing: Mutex<HashSet<ItemId>>,
    max_id: Mutex<Option<ItemId>>,
    latency: Option<fn(ItemId) -> Duration>,
    hang: bool,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call blocks forever.
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::default()
        }
    }

    /// Per-item delay, used to shuffle completion order.
    pub fn with_latency(mut self, latency: fn(ItemId) -> Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn insert(&self, item: Item) {
        self.items.lock().unwrap().insert(item.id, item);
    }

    pub fn insert_user(&self, user: User) {
        self.users.lock().unwrap().insert(user.id.clone(), user);
    }

    pub fn set_category(&self, category: Category, ids: Vec<ItemId>) {
        self.categories.lock().unwrap().insert(category, ids);
    }

    pub fn set_max_id(&self, id: ItemId) {
        *self.max_id.lock().unwrap() = Some(id);
    }

    pub fn fail(&self, id: ItemId) {
        self.failing.lock().unwrap().insert(id);
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn enter(&self, id: Option<ItemId>) -> InFlight<'_> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let guard = InFlight(&self.in_flight);

        if self.hang {
            std::future::pending::<()>().await;
        }
        match (self.latency, id) {
            (Some(latency), Some(id)) => tokio::time::sleep(latency(id)).await,
            _ => tokio::task::yield_now().await,
        }
        guard
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ItemSource for MockSource {
    async fn fetch_item(&self, id: ItemId) -> Result<Item> {
        let _guard = self.enter(Some(id)).await;
        if self.failing.lock().unwrap().contains(&id) {
            return Err(CanopyError::Remote(format!("injected failure for {}", id)));
        }
        self.items
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(CanopyError::ItemNotFound(id))
    }

    async fn fetch_category_ids(&self, category: Category) -> Result<Vec<ItemId>> {
        let _guard = self.enter(None).await;
        Ok(self
            .categories
            .lock()
            .unwrap()
            .get(&category)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_max_id(&self) -> Result<ItemId> {
        let _guard = self.enter(None).await;
        let explicit = *self.max_id.lock().unwrap();
        Ok(explicit.unwrap_or_else(|| {
            self.items
                .lock()
                .unwrap()
                .keys()
                .copied()
                .max()
                .unwrap_or(0)
        }))
    }

    async fn fetch_user(&self, name: &str) -> Result<User> {
        let _guard = self.enter(None).await;
        self.users
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| CanopyError::UserNotFound(name.to_string()))
    }
}

pub fn story(id: ItemId, kids: Vec<ItemId>) -> Item {
    let mut item = Item::new(id, ItemKind::Story);
    item.title = Some(format!("Story {}", id));
    item.kids = kids;
    item
}

pub fn comment(id: ItemId, parent: ItemId, kids: Vec<ItemId>) -> Item {
    let mut item = Item::new(id, ItemKind::Comment);
    item.parent = Some(parent);
    item.kids = kids;
    item.text = Some(format!("comment {}", id));
    item
}

/// Deterministic pseudo-random delay in 0..=19ms.
pub fn scrambled_latency(id: ItemId) -> Duration {
    Duration::from_millis(id.wrapping_mul(7919).wrapping_add(13) % 20)
}
