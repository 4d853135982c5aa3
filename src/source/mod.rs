pub mod http_source;
#[cfg(test)]
pub mod mock;

use async_trait::async_trait;

use crate::app::Result;
use crate::domain::{Category, Item, ItemId, User};

pub use http_source::HttpSource;

/// The remote content API.
///
/// Every failure (network, status, empty body, malformed payload) is
/// reported as an error the caller may retry; none of them are fatal.
#[async_trait]
pub trait ItemSource: Send + Sync {
    async fn fetch_item(&self, id: ItemId) -> Result<Item>;

    /// Ordered story IDs for a category listing.
    async fn fetch_category_ids(&self, category: Category) -> Result<Vec<ItemId>>;

    /// Largest item ID currently assigned.
    async fn fetch_max_id(&self) -> Result<ItemId>;

    async fn fetch_user(&self, name: &str) -> Result<User>;
}
