use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};

use crate::app::Result;
use crate::cache::ItemCache;
use crate::domain::{Item, ItemId, ItemPage};
use crate::fetcher::RateLimitedFetcher;

pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Rebuilds the comment thread under a root item.
///
/// The tree is walked one level at a time. Every level is scattered through
/// the rate-limited fetcher and gathered back by index, so the number of
/// concurrent remote calls stays bounded however wide the tree is.
pub struct ThreadBuilder {
    fetcher: Arc<RateLimitedFetcher>,
    cache: Arc<ItemCache>,
    max_depth: usize,
}

impl ThreadBuilder {
    pub fn new(fetcher: Arc<RateLimitedFetcher>) -> Self {
        Self::with_max_depth(fetcher, DEFAULT_MAX_DEPTH)
    }

    pub fn with_max_depth(fetcher: Arc<RateLimitedFetcher>, max_depth: usize) -> Self {
        let cache = fetcher.cache().clone();
        Self {
            fetcher,
            cache,
            max_depth,
        }
    }

    /// Item page for `id`, served from cache while fresh.
    pub async fn item_page(&self, id: ItemId, skip_cache: bool) -> Result<ItemPage> {
        if !skip_cache {
            if let Some(page) = self.cache.get_page(id).and_then(|c| c.into_fresh()) {
                tracing::debug!("Cache hit for item page {}", id);
                return Ok(page);
            }
        }

        let root = self.fetcher.fetch(id).await?;
        self.build_tree(root).await
    }

    /// Fetch the descendants of `root`, order them parent-before-child and
    /// persist the result.
    pub async fn build_tree(&self, root: Item) -> Result<ItemPage> {
        let collected = self.collect_descendants(&root).await;
        let comments = order_thread(root.id, collected);

        let page = ItemPage::new(root, comments, self.cache.now());
        self.cache.put_page(&page);

        tracing::debug!(
            "Built thread for {} with {} comments",
            page.item.id,
            page.comments.len()
        );
        Ok(page)
    }

    async fn collect_descendants(&self, root: &Item) -> Vec<Item> {
        let mut seen: HashSet<ItemId> = HashSet::from([root.id]);
        let mut collected = Vec::new();
        let mut frontier: Vec<ItemId> = root.kids.clone();
        let mut depth = 0;

        while !frontier.is_empty() {
            if depth >= self.max_depth {
                tracing::warn!(
                    "Thread under {} is deeper than {} levels, truncating",
                    root.id,
                    self.max_depth
                );
                break;
            }

            frontier.retain(|id| seen.insert(*id));

            let mut next = Vec::new();
            for item in self.fetch_level(&frontier).await {
                // dead and deleted nodes are dropped along with their subtree
                if item.is_visible() {
                    next.extend(item.kids.iter().copied());
                    collected.push(item);
                }
            }

            frontier = next;
            depth += 1;
        }

        collected
    }

    /// Fetch one level, preserving the order of `ids`. Failures are logged
    /// and skipped.
    async fn fetch_level(&self, ids: &[ItemId]) -> Vec<Item> {
        let mut slots: Vec<Option<Item>> = vec![None; ids.len()];

        let mut pending: FuturesUnordered<_> = ids
            .iter()
            .enumerate()
            .map(|(idx, &id)| async move { (idx, id, self.fetcher.fetch(id).await) })
            .collect();

        while let Some((idx, id, result)) = pending.next().await {
            match result {
                Ok(item) => slots[idx] = Some(item),
                Err(e) => tracing::warn!("Error fetching comment {}: {}", id, e),
            }
        }

        slots.into_iter().flatten().collect()
    }
}

/// Order comments so every parent precedes its children: first those
/// replying directly to the root, then repeated passes emitting any comment
/// whose parent is already placed. Comments whose parent never appears are
/// dropped.
pub fn order_thread(root_id: ItemId, comments: Vec<Item>) -> Vec<Item> {
    let mut placed: HashSet<ItemId> = HashSet::from([root_id]);
    let mut ordered = Vec::with_capacity(comments.len());

    let (top, mut remaining): (Vec<Item>, Vec<Item>) = comments
        .into_iter()
        .partition(|c| c.parent_id() == Some(root_id));
    for comment in top {
        placed.insert(comment.id);
        ordered.push(comment);
    }

    while !remaining.is_empty() {
        let before = remaining.len();
        let mut rest = Vec::with_capacity(remaining.len());

        for comment in remaining {
            let parent_placed = comment.parent_id().is_some_and(|p| placed.contains(&p));
            if parent_placed {
                placed.insert(comment.id);
                ordered.push(comment);
            } else {
                rest.push(comment);
            }
        }

        if rest.len() == before {
            tracing::debug!(
                "Dropping {} comments under {} with unreachable parents",
                rest.len(),
                root_id
            );
            break;
        }
        remaining = rest;
    }

    ordered
}
