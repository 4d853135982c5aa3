use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::app::{AppContext, Result};
use crate::config::{format_interval, Config};
use crate::domain::{Category, CommentWithStory, Item, ItemId, User};
use crate::refresher::TickReport;

const SNIPPET_CHARS: usize = 120;

/// Config from `path` (or the default location) with CLI overrides applied.
pub fn load_config(path: Option<&Path>, max_concurrency: Option<usize>) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(max) = max_concurrency {
        config.fetcher.max_concurrency = max.max(1);
    }
    Ok(config)
}

pub async fn show_stories(
    ctx: &AppContext,
    category: Category,
    page: usize,
    per_page: usize,
    refresh: bool,
) -> Result<()> {
    let stories = ctx
        .assembler
        .assemble_page(category, page, per_page, refresh)
        .await?;

    let now = ctx.cache.now();
    for story in &stories {
        println!("{}", format_story(story, now));
    }
    Ok(())
}

pub async fn show_item(ctx: &AppContext, id: ItemId, refresh: bool) -> Result<()> {
    let page = ctx.threads.item_page(id, refresh).await?;
    let now = ctx.cache.now();

    println!("{}", page.item.display_title());
    if let Some(url) = &page.item.url {
        println!("{}", url);
    }
    println!(
        "{} points by {} {}",
        page.item.score,
        page.item.by,
        age(&page.item, now)
    );
    let text = page.item.display_text();
    if !text.is_empty() {
        println!("\n{}", text.trim());
    }

    if page.comments.is_empty() {
        println!("\nNo comments");
        return Ok(());
    }

    println!();
    for (depth, comment) in page.thread() {
        let indent = "  ".repeat(depth);
        println!("{}{} {}", indent, comment.by, age(comment, now));
        for line in comment.display_text().trim().lines() {
            println!("{}  {}", indent, line);
        }
    }
    Ok(())
}

pub async fn show_new_comments(ctx: &AppContext, limit: usize, refresh: bool) -> Result<()> {
    let comments = ctx
        .scanner
        .scan_recent_comments(limit, refresh, ctx.config.scanner.deadline())
        .await?;

    if comments.is_empty() {
        println!("No new comments");
        return Ok(());
    }

    let now = ctx.cache.now();
    for entry in &comments {
        println!("{}", format_new_comment(entry, now));
    }
    Ok(())
}

pub async fn show_root(ctx: &AppContext, id: ItemId) -> Result<()> {
    let item = ctx.fetcher.get(id).await?;
    let root = ctx.resolver.resolve_root(&item).await?;

    if root.id == item.id {
        println!("{} is its own root: {}", id, root.display_title());
    } else {
        println!("{} belongs to {}: {}", id, root.id, root.display_title());
    }
    Ok(())
}

pub async fn show_user(ctx: &AppContext, name: &str, submissions: usize) -> Result<()> {
    let user = ctx.user(name).await?;
    print!("{}", format_user(&user, ctx.cache.now(), submissions));
    Ok(())
}

pub fn search(ctx: &AppContext, query: &str, limit: usize) -> Result<()> {
    let items = ctx.search(query, limit)?;

    if items.is_empty() {
        println!(
            "No matches for \"{}\" among {} indexed items",
            query,
            ctx.indexed_count()?
        );
        return Ok(());
    }

    for item in &items {
        let label = match &item.title {
            Some(title) => title.clone(),
            None => snippet(&item.display_text(), SNIPPET_CHARS),
        };
        println!("{:>10} {:<8} {:<15} {}", item.id, item.kind.as_str(), item.by, label);
    }
    Ok(())
}

pub async fn refresh(ctx: &AppContext, once: bool) -> Result<()> {
    let mut refresher = ctx.refresher()?;

    if once {
        let report = refresher.tick().await;
        print_report(&report);
        return Ok(());
    }

    let interval = ctx.config.refresher.interval()?;
    let handle = refresher.spawn();
    println!(
        "Refreshing every {}, press Ctrl-C to stop",
        format_interval(interval.as_secs())
    );
    tokio::signal::ctrl_c().await?;
    println!("Stopping...");
    handle.shutdown().await;
    Ok(())
}

fn print_report(report: &TickReport) {
    println!(
        "{}: {} stories, {} pages primed, {} new comments in {:.1}s",
        report.category,
        report.stories,
        report.pages_primed,
        report.comments,
        report.elapsed.as_secs_f64()
    );
    for error in &report.errors {
        eprintln!("  Error: {}", error);
    }
}

fn format_story(story: &Item, now: DateTime<Utc>) -> String {
    let mut line = format!("{:>3}. {}", story.rank, story.display_title());
    if let Some(host) = story
        .url
        .as_deref()
        .and_then(|u| url::Url::parse(u).ok())
        .and_then(|u| u.host_str().map(str::to_string))
    {
        line.push_str(&format!(" ({})", host));
    }
    line.push_str(&format!(
        "\n     {} points by {} {} | {} comments",
        story.score,
        story.by,
        age(story, now),
        story.descendants
    ));
    line
}

fn format_new_comment(entry: &CommentWithStory, now: DateTime<Utc>) -> String {
    let on = entry
        .story
        .as_ref()
        .map(|s| s.display_title().to_string())
        .unwrap_or_else(|| "(unknown story)".to_string());
    format!(
        "{} {} on {}\n  {}",
        entry.comment.by,
        age(&entry.comment, now),
        on,
        snippet(&entry.comment.display_text(), SNIPPET_CHARS)
    )
}

fn format_user(user: &User, now: DateTime<Utc>, submissions: usize) -> String {
    let mut out = format!("user:    {}\nkarma:   {}\n", user.id, user.karma);
    if let Some(created) = user.created_at() {
        let secs = (now - created).num_seconds().max(0) as u64;
        out.push_str(&format!(
            "created: {} ({})\n",
            created.format("%Y-%m-%d"),
            format_age(Duration::from_secs(secs))
        ));
    }
    let about = user.display_about();
    if !about.trim().is_empty() {
        out.push_str(&format!("about:   {}\n", snippet(&about, SNIPPET_CHARS * 2)));
    }
    out.push_str(&format!("submitted: {} items\n", user.submitted.len()));
    for id in user.submitted.iter().take(submissions) {
        out.push_str(&format!("  {}\n", id));
    }
    out
}

/// First `max` characters of `text` on a single line.
fn snippet(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        return flat;
    }
    let cut: String = flat.chars().take(max).collect();
    format!("{}...", cut.trim_end())
}

fn age(item: &Item, now: DateTime<Utc>) -> String {
    let Some(created) = item.created_at() else {
        return String::new();
    };
    let secs = (now - created).num_seconds().max(0) as u64;
    format_age(Duration::from_secs(secs))
}

fn format_age(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let (n, unit) = match secs {
        0..=59 => return "just now".to_string(),
        60..=3599 => (secs / 60, "minute"),
        3600..=86_399 => (secs / 3600, "hour"),
        _ => (secs / 86_400, "day"),
    };
    if n == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", n, unit)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::domain::ItemKind;

    #[test]
    fn test_snippet() {
        assert_eq!(snippet("short\n\ntext", 20), "short text");
        assert_eq!(snippet("abcdef ghij", 7), "abcdef...");
        assert_eq!(snippet("", 5), "");
    }

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(Duration::from_secs(5)), "just now");
        assert_eq!(format_age(Duration::from_secs(60)), "1 minute ago");
        assert_eq!(format_age(Duration::from_secs(7200)), "2 hours ago");
        assert_eq!(format_age(Duration::from_secs(3 * 86_400)), "3 days ago");
    }

    #[test]
    fn test_format_story() {
        let now = Utc::now();
        let mut story = Item::new(1, ItemKind::Story);
        story.rank = 7;
        story.title = Some("Show HN: canopy".into());
        story.url = Some("https://example.com/post".into());
        story.by = "pg".into();
        story.score = 42;
        story.descendants = 3;
        story.time = now.timestamp() - 7200;

        let text = format_story(&story, now);
        assert!(text.starts_with("  7. Show HN: canopy (example.com)"));
        assert!(text.contains("42 points by pg 2 hours ago | 3 comments"));
    }

    #[test]
    fn test_format_comment_without_story() {
        let mut comment = Item::new(2, ItemKind::Comment);
        comment.by = "tptacek".into();
        comment.text = Some("It&#x27;s fine.".into());
        let entry = CommentWithStory {
            comment,
            story: None,
        };
        let text = format_new_comment(&entry, Utc::now());
        assert!(text.contains("on (unknown story)"));
        assert!(text.ends_with("It's fine."));
    }

    #[test]
    fn test_format_user() {
        let now = Utc::now();
        let user = User {
            id: "pg".into(),
            created: now.timestamp() - 3 * 86_400,
            karma: 157236,
            about: Some("Bug fixer &amp; essayist".into()),
            submitted: vec![30, 20, 10],
        };

        let text = format_user(&user, now, 2);
        assert!(text.starts_with("user:    pg\nkarma:   157236\n"));
        assert!(text.contains("(3 days ago)"));
        assert!(text.contains("about:   Bug fixer & essayist\n"));
        assert!(text.contains("submitted: 3 items\n  30\n  20\n"));
        assert!(!text.contains("  10\n"));
    }

    #[test]
    fn test_load_config_applies_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[fetcher]\nmax_concurrency = 4").unwrap();

        let config = load_config(Some(file.path()), None).unwrap();
        assert_eq!(config.fetcher.max_concurrency, 4);

        let config = load_config(Some(file.path()), Some(8)).unwrap();
        assert_eq!(config.fetcher.max_concurrency, 8);
    }
}
