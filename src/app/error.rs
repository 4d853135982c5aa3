use std::time::Duration;

use thiserror::Error;

use crate::config::ConfigError;
use crate::domain::{Category, ItemId};

#[derive(Error, Debug)]
pub enum CanopyError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Remote failure: {0}")]
    Remote(String),

    #[error("Malformed payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("No stories found for category: {0}")]
    NoStoriesForCategory(Category),

    #[error("Page {page} exceeds available stories ({available})")]
    PageOutOfRange { page: usize, available: usize },

    #[error("Circular parent reference detected at item {0}")]
    CycleDetected(ItemId),

    #[error("Max depth {max} exceeded while resolving root of item {id}")]
    DepthExceeded { id: ItemId, max: usize },

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl CanopyError {
    /// Failures that are always reported to the caller rather than absorbed
    /// into a fan-out's aggregate.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            CanopyError::CycleDetected(_)
                | CanopyError::DepthExceeded { .. }
                | CanopyError::NoStoriesForCategory(_)
                | CanopyError::PageOutOfRange { .. }
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, CanopyError::Timeout(_))
    }
}

impl From<ConfigError> for CanopyError {
    fn from(e: ConfigError) -> Self {
        CanopyError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CanopyError>;
