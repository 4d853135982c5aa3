//! # Canopy
//!
//! A caching, rate-limited reader for the Hacker News item API.
//!
//! ## Architecture
//!
//! Every remote call goes through one shared, bounded fetcher:
//!
//! ```text
//! Assembler / ThreadBuilder / Resolver / Scanner → RateLimitedFetcher → ItemSource
//!                                  ↕
//!                     ItemCache (memory + SQLite) / LookAside index
//! ```
//!
//! - [`assembler`]: category listings assembled into ranked pages
//! - [`thread`]: comment trees and root resolution
//! - [`scanner`]: newest comments across the site
//! - [`refresher`]: background loop keeping the cache warm
//!
//! ## Quick Start
//!
//! ```bash
//! # Front page
//! canopy stories top
//!
//! # A story and its comments
//! canopy item 8863
//!
//! # Newest comments
//! canopy comments --limit 20
//!
//! # Keep the cache warm
//! canopy refresh --interval 2m
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together all components
/// from a [`Config`](config::Config).
pub mod app;

/// Page Assembler: one ranked page of a category.
pub mod assembler;

/// Two-tier cache with a freshness window.
///
/// - [`ItemCache`](cache::ItemCache): facade over both tiers
/// - [`MemoryItemTier`](cache::MemoryItemTier): in-process item tier
/// - [`Clock`](cache::Clock): injectable time source
pub mod cache;

/// Command-line interface using clap.
///
/// - `stories [category]` - Show a page of a category
/// - `item <id>` - Show an item and its thread
/// - `comments` - Show the newest comments
/// - `root <id>` - Find the story an item belongs to
/// - `user <name>` - Show a user's profile
/// - `search <query>` - Search items seen so far
/// - `refresh [--once]` - Run the background refresher
pub mod cli;

/// Configuration loaded from `~/.config/canopy/config.toml`.
pub mod config;

/// Core domain models.
///
/// - [`Item`](domain::Item): any item from the API
/// - [`ItemPage`](domain::ItemPage): an item with its ordered thread
/// - [`Category`](domain::Category): remote story listings
pub mod domain;

/// Bounded, timed access to the remote source.
///
/// - [`RateLimitedFetcher`](fetcher::RateLimitedFetcher): semaphore plus
///   per-call timeout shared by every caller
pub mod fetcher;

/// Look-aside index consulted before remote fetches.
pub mod index;

/// Background refresh of listings, threads and new comments.
pub mod refresher;

/// New-Activity Scanner.
pub mod scanner;

/// Remote item sources.
///
/// - [`ItemSource`](source::ItemSource): async trait for remote access
/// - [`HttpSource`](source::HttpSource): reqwest-based implementation
pub mod source;

/// SQLite persistence for cached pages and the look-aside index.
pub mod store;

/// Comment Tree Builder and Root Resolver.
pub mod thread;
