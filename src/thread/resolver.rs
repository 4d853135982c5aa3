use std::collections::HashSet;
use std::sync::Arc;

use crate::app::{CanopyError, Result};
use crate::domain::Item;
use crate::fetcher::RateLimitedFetcher;

pub const DEFAULT_MAX_HOPS: usize = 100;

/// Walks parent links up to the story that owns an item.
pub struct RootResolver {
    fetcher: Arc<RateLimitedFetcher>,
    max_hops: usize,
}

impl RootResolver {
    pub fn new(fetcher: Arc<RateLimitedFetcher>) -> Self {
        Self::with_max_hops(fetcher, DEFAULT_MAX_HOPS)
    }

    pub fn with_max_hops(fetcher: Arc<RateLimitedFetcher>, max_hops: usize) -> Self {
        Self { fetcher, max_hops }
    }

    /// The first ancestor that is a story or has no parent.
    ///
    /// Stories and parentless items are their own root. A revisited ID ends
    /// the walk with [`CanopyError::CycleDetected`]; a chain longer than the
    /// hop limit with [`CanopyError::DepthExceeded`].
    pub async fn resolve_root(&self, item: &Item) -> Result<Item> {
        if item.is_root() {
            return Ok(item.clone());
        }

        let mut visited = HashSet::from([item.id]);
        let mut current = item.clone();

        for _ in 0..self.max_hops {
            let Some(parent_id) = current.parent_id() else {
                return Ok(current);
            };
            if visited.contains(&parent_id) {
                return Err(CanopyError::CycleDetected(parent_id));
            }

            let parent = self.fetcher.get(parent_id).await?;
            if parent.is_root() {
                return Ok(parent);
            }

            visited.insert(parent.id);
            current = parent;
        }

        Err(CanopyError::DepthExceeded {
            id: item.id,
            max: self.max_hops,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ItemCache;
    use crate::domain::{ItemId, ItemKind};
    use crate::source::mock::{comment, story, MockSource};

    fn resolver(source: Arc<MockSource>, max_hops: usize) -> RootResolver {
        let fetcher = RateLimitedFetcher::new(source, Arc::new(ItemCache::in_memory()));
        RootResolver::with_max_hops(Arc::new(fetcher), max_hops)
    }

    #[tokio::test]
    async fn test_story_is_its_own_root() {
        let source = Arc::new(MockSource::new());
        let top = story(1, vec![2]);
        let root = resolver(source.clone(), 100).resolve_root(&top).await.unwrap();
        assert_eq!(root, top);
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_parentless_item_is_its_own_root() {
        let source = Arc::new(MockSource::new());
        let orphan = Item::new(5, ItemKind::Comment);
        let root = resolver(source, 100).resolve_root(&orphan).await.unwrap();
        assert_eq!(root.id, 5);
    }

    #[tokio::test]
    async fn test_three_hop_chain() {
        let source = Arc::new(MockSource::new());
        source.insert(story(1, vec![2]));
        source.insert(comment(2, 1, vec![3]));
        source.insert(comment(3, 2, vec![4]));
        let leaf = comment(4, 3, vec![]);

        let root = resolver(source.clone(), 100).resolve_root(&leaf).await.unwrap();
        assert_eq!(root.id, 1);
        assert_eq!(root.kind, ItemKind::Story);
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn test_comment_on_poll_resolves_to_poll() {
        let source = Arc::new(MockSource::new());
        source.insert(Item::new(10, ItemKind::Poll));
        let reply = comment(11, 10, vec![]);

        let root = resolver(source, 100).resolve_root(&reply).await.unwrap();
        assert_eq!(root.id, 10);
    }

    #[tokio::test]
    async fn test_cycle_detected() {
        let source = Arc::new(MockSource::new());
        // A -> B -> A
        source.insert(comment(100, 200, vec![]));
        source.insert(comment(200, 100, vec![]));
        let a = comment(100, 200, vec![]);

        let err = resolver(source, 100).resolve_root(&a).await.unwrap_err();
        assert!(matches!(err, CanopyError::CycleDetected(100)));
        assert!(err.is_structural());
    }

    #[tokio::test]
    async fn test_depth_exceeded() {
        let source = Arc::new(MockSource::new());
        let chain: Vec<ItemId> = (1..=30).collect();
        for &id in &chain {
            source.insert(comment(id, id + 1, vec![]));
        }
        let start = comment(0, 1, vec![]);

        let err = resolver(source, 10).resolve_root(&start).await.unwrap_err();
        assert!(matches!(err, CanopyError::DepthExceeded { id: 0, max: 10 }));
    }

    #[tokio::test]
    async fn test_missing_parent_propagates() {
        let source = Arc::new(MockSource::new());
        let leaf = comment(4, 3, vec![]);
        let err = resolver(source, 100).resolve_root(&leaf).await.unwrap_err();
        assert!(matches!(err, CanopyError::ItemNotFound(3)));
    }
}
