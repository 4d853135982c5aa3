use crate::app::Result;
use crate::domain::{Item, ItemId};

/// Optional keyed/full-text index consulted before the remote source.
///
/// Absence of an index must only affect latency. Items fetched from the
/// remote are fed back through [`LookAside::index_item`].
pub trait LookAside: Send + Sync {
    fn lookup(&self, id: ItemId) -> Result<Option<Item>>;
    fn index_item(&self, item: &Item) -> Result<()>;
    /// Items whose title, text or author contains `query`, newest first.
    fn search(&self, query: &str, limit: usize) -> Result<Vec<Item>>;
}
