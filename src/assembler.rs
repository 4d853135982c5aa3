//! Category listings assembled into ranked pages.

use std::sync::Arc;

use tokio::task::JoinSet;

use crate::app::{CanopyError, Result};
use crate::cache::ItemCache;
use crate::domain::{Category, Item, ItemId};
use crate::fetcher::RateLimitedFetcher;

pub const DEFAULT_PER_PAGE: usize = 30;

pub struct PageAssembler {
    fetcher: Arc<RateLimitedFetcher>,
    cache: Arc<ItemCache>,
}

impl PageAssembler {
    pub fn new(fetcher: Arc<RateLimitedFetcher>) -> Self {
        let cache = fetcher.cache().clone();
        Self { fetcher, cache }
    }

    /// One page of a category, in listing order, with absolute 1-based ranks.
    ///
    /// `page < 1` is treated as the first page and `per_page < 1` as
    /// [`DEFAULT_PER_PAGE`].
    pub async fn assemble_page(
        &self,
        category: Category,
        page: usize,
        per_page: usize,
        skip_cache: bool,
    ) -> Result<Vec<Item>> {
        let page = page.max(1);
        let per_page = if per_page == 0 {
            DEFAULT_PER_PAGE
        } else {
            per_page
        };

        let cached = if skip_cache {
            None
        } else {
            self.cache
                .get_listing(category)
                .and_then(|c| c.into_fresh())
                .filter(|items| !items.is_empty())
        };

        let listing = match cached {
            Some(items) => {
                tracing::debug!("Cache hit for {} ({} items)", category, items.len());
                items
            }
            None => {
                let items = self.fetch_listing(category).await?;
                self.cache.put_listing(category, &items);
                items
            }
        };

        paginate(listing, page, per_page)
    }

    /// Fetch every item of a category concurrently, keeping listing order.
    async fn fetch_listing(&self, category: Category) -> Result<Vec<Item>> {
        let ids = self.fetcher.category_ids(category).await?;
        if ids.is_empty() {
            return Err(CanopyError::NoStoriesForCategory(category));
        }

        let results = self.fetch_indexed(&ids).await;

        let mut items = Vec::with_capacity(ids.len());
        let mut last_err = None;
        for (id, result) in ids.iter().zip(results) {
            match result {
                Ok(item) if item.kind.is_listable() => items.push(item),
                Ok(item) => {
                    tracing::debug!("Skipping {} item {} in {}", item.kind.as_str(), id, category)
                }
                Err(e) => {
                    tracing::warn!("Failed to fetch item {} for {}: {}", id, category, e);
                    last_err = Some(e);
                }
            }
        }

        if items.is_empty() {
            if let Some(e) = last_err {
                return Err(e);
            }
        }

        tracing::info!("Assembled {} with {} of {} items", category, items.len(), ids.len());
        Ok(items)
    }

    /// Results are written back by originating index, so the output order is
    /// the order of `ids` regardless of which fetch finishes first.
    async fn fetch_indexed(&self, ids: &[ItemId]) -> Vec<Result<Item>> {
        let mut slots: Vec<Option<Result<Item>>> = Vec::with_capacity(ids.len());
        slots.resize_with(ids.len(), || None);

        let mut tasks = JoinSet::new();
        for (idx, &id) in ids.iter().enumerate() {
            let fetcher = self.fetcher.clone();
            tasks.spawn(async move { (idx, fetcher.fetch(id).await) });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, result)) => slots[idx] = Some(result),
                Err(e) => tracing::error!("Task join error: {}", e),
            }
        }

        slots
            .into_iter()
            .zip(ids)
            .map(|(slot, id)| {
                slot.unwrap_or_else(|| Err(CanopyError::Other(format!("fetch task for {} lost", id))))
            })
            .collect()
    }
}

/// Window `[start, start + per_page)` of `items`, ranked by absolute position.
fn paginate(items: Vec<Item>, page: usize, per_page: usize) -> Result<Vec<Item>> {
    let out_of_range = || CanopyError::PageOutOfRange {
        page,
        available: items.len(),
    };
    let start = page
        .checked_sub(1)
        .and_then(|p| p.checked_mul(per_page))
        .filter(|&start| start < items.len())
        .ok_or_else(out_of_range)?;
    let end = start.saturating_add(per_page).min(items.len());

    Ok(items
        .into_iter()
        .enumerate()
        .skip(start)
        .take(end - start)
        .map(|(pos, mut item)| {
            item.rank = pos + 1;
            item
        })
        .collect())
}
