pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::assembler::DEFAULT_PER_PAGE;
use crate::domain::{Category, ItemId};

#[derive(Parser)]
#[command(name = "canopy")]
#[command(about = "A caching reader for the Hacker News item API", long_about = None)]
pub struct Cli {
    /// Config file to use instead of ~/.config/canopy/config.toml
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Remote calls allowed in flight at once
    #[arg(long, global = true)]
    pub max_concurrency: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show a page of a category
    Stories {
        /// top, new, best, ask, show or job
        #[arg(default_value = "top")]
        category: Category,

        #[arg(short, long, default_value_t = 1)]
        page: usize,

        #[arg(long, default_value_t = DEFAULT_PER_PAGE)]
        per_page: usize,

        /// Bypass the cache
        #[arg(long)]
        refresh: bool,
    },
    /// Show an item with its comment thread
    Item {
        id: ItemId,

        /// Bypass the cache
        #[arg(long)]
        refresh: bool,
    },
    /// Show the newest comments across the site
    Comments {
        /// Number of comments (default: scanner.limit)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Bypass the cache
        #[arg(long)]
        refresh: bool,
    },
    /// Find the story an item belongs to
    Root { id: ItemId },
    /// Show a user's profile
    User {
        name: String,

        /// Also list this many of the user's most recent submission IDs
        #[arg(short, long, default_value_t = 0)]
        submissions: usize,
    },
    /// Search items seen so far by title, text or author
    Search {
        query: String,

        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Keep the cache warm in the foreground until Ctrl-C
    Refresh {
        /// Interval between ticks (e.g. "90s", "2m", "1h")
        #[arg(short, long)]
        interval: Option<String>,

        /// Run a single tick and exit
        #[arg(long)]
        once: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_stories_with_alias() {
        let cli = Cli::parse_from(["canopy", "stories", "paststories", "--page", "2"]);
        match cli.command {
            Commands::Stories {
                category,
                page,
                per_page,
                refresh,
            } => {
                assert_eq!(category, Category::Best);
                assert_eq!(page, 2);
                assert_eq!(per_page, DEFAULT_PER_PAGE);
                assert!(!refresh);
            }
            _ => panic!("expected stories"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["canopy", "item", "42", "--max-concurrency", "5"]);
        assert_eq!(cli.max_concurrency, Some(5));
        assert!(matches!(cli.command, Commands::Item { id: 42, refresh: false }));
    }

    #[test]
    fn test_parses_user() {
        let cli = Cli::parse_from(["canopy", "user", "pg", "-s", "5"]);
        match cli.command {
            Commands::User { name, submissions } => {
                assert_eq!(name, "pg");
                assert_eq!(submissions, 5);
            }
            _ => panic!("expected user"),
        }
    }

    #[test]
    fn test_rejects_unknown_category() {
        assert!(Cli::try_parse_from(["canopy", "stories", "frontpage"]).is_err());
    }
}
