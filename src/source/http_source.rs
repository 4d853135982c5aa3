use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

use crate::app::{CanopyError, Result};
use crate::config::ApiConfig;
use crate::domain::{Category, Item, ItemId, User};
use crate::source::ItemSource;

const BODY_PREVIEW_LEN: usize = 200;

/// reqwest-backed client for the Firebase-style JSON item API.
///
/// The client sets no request timeout of its own. Deadlines belong to
/// [`RateLimitedFetcher`](crate::fetcher::RateLimitedFetcher), so an
/// expired call is always reported as [`CanopyError::Timeout`].
pub struct HttpSource {
    client: Client,
    base_url: String,
}

impl HttpSource {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .gzip(true)
            .brotli(true)
            .user_agent(config.user_agent.as_str())
            .build()?;

        Self::with_client(client, &config.base_url)
    }

    fn with_client(client: Client, base_url: &str) -> Result<Self> {
        Url::parse(base_url)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.endpoint(path);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let preview = String::from_utf8_lossy(&body[..body.len().min(BODY_PREVIEW_LEN)]);
            return Err(CanopyError::Remote(format!(
                "unexpected status code {} from {}: {}",
                status, url, preview
            )));
        }

        if body.is_empty() {
            return Err(CanopyError::Remote(format!("empty response body from {}", url)));
        }

        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl ItemSource for HttpSource {
    async fn fetch_item(&self, id: ItemId) -> Result<Item> {
        // unknown IDs come back as a literal `null`
        let item: Option<Item> = self.get_json(&format!("item/{}", id)).await?;
        item.ok_or(CanopyError::ItemNotFound(id))
    }

    async fn fetch_category_ids(&self, category: Category) -> Result<Vec<ItemId>> {
        self.get_json(category.endpoint()).await
    }

    async fn fetch_max_id(&self) -> Result<ItemId> {
        self.get_json("maxitem").await
    }

    async fn fetch_user(&self, name: &str) -> Result<User> {
        if !User::is_valid_name(name) {
            return Err(CanopyError::UserNotFound(name.to_string()));
        }
        let user: Option<User> = self.get_json(&format!("user/{}", name)).await?;
        user.ok_or_else(|| CanopyError::UserNotFound(name.to_string()))
    }
}
