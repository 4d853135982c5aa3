//! Scanning the newest item IDs for fresh comments.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::app::{CanopyError, Result};
use crate::cache::ItemCache;
use crate::domain::{CommentWithStory, ItemId, ItemKind};
use crate::fetcher::RateLimitedFetcher;
use crate::thread::RootResolver;

pub const DEFAULT_WORKERS: usize = 5;
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);

pub struct ActivityScanner {
    fetcher: Arc<RateLimitedFetcher>,
    resolver: Arc<RootResolver>,
    cache: Arc<ItemCache>,
    workers: usize,
}

impl ActivityScanner {
    pub fn new(fetcher: Arc<RateLimitedFetcher>, resolver: Arc<RootResolver>) -> Self {
        Self::with_workers(fetcher, resolver, DEFAULT_WORKERS)
    }

    pub fn with_workers(
        fetcher: Arc<RateLimitedFetcher>,
        resolver: Arc<RootResolver>,
        workers: usize,
    ) -> Self {
        let cache = fetcher.cache().clone();
        Self {
            fetcher,
            resolver,
            cache,
            workers: workers.max(1),
        }
    }

    /// Up to `limit` of the newest comments, each paired with its story,
    /// newest first.
    ///
    /// The whole scan must finish within `deadline`; running out of time is
    /// a [`CanopyError::Timeout`] even when some comments were already found.
    pub async fn scan_recent_comments(
        &self,
        limit: usize,
        skip_cache: bool,
        deadline: Duration,
    ) -> Result<Vec<CommentWithStory>> {
        if !skip_cache {
            let cached = self
                .cache
                .get_new_comments()
                .and_then(|c| c.into_fresh())
                .filter(|c| !c.is_empty());
            if let Some(mut comments) = cached {
                tracing::debug!("Cache hit: {} new comments", comments.len());
                comments.truncate(limit);
                return Ok(comments);
            }
        }

        let comments = tokio::time::timeout(deadline, self.scan(limit))
            .await
            .map_err(|_| CanopyError::Timeout(deadline))??;

        self.cache.put_new_comments(&comments);
        tracing::info!("Collected {} new comments", comments.len());
        Ok(comments)
    }

    async fn scan(&self, limit: usize) -> Result<Vec<CommentWithStory>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let max_id = self.fetcher.max_id().await?;
        // not every ID is a comment, so look at twice as many as needed
        let end = max_id.saturating_sub(limit as ItemId * 2);
        let window: VecDeque<ItemId> = (end + 1..=max_id).rev().collect();
        tracing::debug!("Scanning items {} down to {}", max_id, end + 1);

        let (tx, mut rx) = mpsc::channel(window.len().max(1));
        let queue = Arc::new(Mutex::new(window));

        let mut workers = JoinSet::new();
        for _ in 0..self.workers {
            let queue = queue.clone();
            let fetcher = self.fetcher.clone();
            let tx = tx.clone();
            workers.spawn(async move {
                loop {
                    let next = queue.lock().unwrap_or_else(|e| e.into_inner()).pop_front();
                    let Some(id) = next else {
                        break;
                    };
                    let result = fetcher.get(id).await;
                    if tx.send((id, result)).await.is_err() {
                        break;
                    }
                }
            });
        }
        // the channel closes once every worker has drained the queue
        drop(tx);

        let mut comments = Vec::with_capacity(limit);
        let mut last_err = None;

        while comments.len() < limit {
            let Some((id, result)) = rx.recv().await else {
                break;
            };

            let item = match result {
                Ok(item) => item,
                Err(e) => {
                    tracing::warn!("Error fetching item {}: {}", id, e);
                    last_err = Some(e);
                    continue;
                }
            };
            if item.kind != ItemKind::Comment {
                continue;
            }

            let story = match self.resolver.resolve_root(&item).await {
                Ok(story) => Some(story),
                Err(e) => {
                    tracing::warn!("Could not resolve story for comment {}: {}", item.id, e);
                    None
                }
            };
            comments.push(CommentWithStory {
                comment: item,
                story,
            });
        }

        workers.abort_all();

        if comments.is_empty() {
            if let Some(e) = last_err {
                return Err(e);
            }
        }

        comments.sort_by(|a, b| b.comment.id.cmp(&a.comment.id));
        Ok(comments)
    }
}
