//! Background refresh loop.
//!
//! Each tick takes the next category from a fixed rotation, reassembles its
//! first page bypassing the cache, primes the comment tree of every story on
//! that page and rescans for new comments. Foreground requests then find
//! fresh entries in the cache instead of paying for the fetches themselves.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::assembler::PageAssembler;
use crate::domain::Category;
use crate::scanner::ActivityScanner;
use crate::thread::ThreadBuilder;

/// Comment trees primed at once within a tick.
const PRIME_CONCURRENCY: usize = 4;

#[derive(Debug, Clone)]
pub struct RefreshSettings {
    pub interval: Duration,
    pub categories: Vec<Category>,
    pub per_page: usize,
    pub comments_limit: usize,
    pub comments_deadline: Duration,
    /// Run a tick immediately instead of waiting for the first interval
    pub refresh_on_start: bool,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(120),
            categories: Category::ROTATION.to_vec(),
            per_page: 30,
            comments_limit: 30,
            comments_deadline: Duration::from_secs(30),
            refresh_on_start: false,
        }
    }
}

/// Outcome of a single tick.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub category: Category,
    pub stories: usize,
    pub pages_primed: usize,
    pub comments: usize,
    pub errors: Vec<String>,
    pub elapsed: Duration,
}

impl TickReport {
    fn new(category: Category) -> Self {
        Self {
            category,
            stories: 0,
            pages_primed: 0,
            comments: 0,
            errors: Vec::new(),
            elapsed: Duration::ZERO,
        }
    }
}

pub struct Refresher {
    assembler: Arc<PageAssembler>,
    threads: Arc<ThreadBuilder>,
    scanner: Arc<ActivityScanner>,
    settings: RefreshSettings,
    cursor: usize,
}

impl Refresher {
    pub fn new(
        assembler: Arc<PageAssembler>,
        threads: Arc<ThreadBuilder>,
        scanner: Arc<ActivityScanner>,
        mut settings: RefreshSettings,
    ) -> Self {
        if settings.categories.is_empty() {
            settings.categories = Category::ROTATION.to_vec();
        }
        Self {
            assembler,
            threads,
            scanner,
            settings,
            cursor: 0,
        }
    }

    /// Next category in the rotation, wrapping at the end.
    pub fn next_category(&mut self) -> Category {
        let category = self.settings.categories[self.cursor % self.settings.categories.len()];
        self.cursor = (self.cursor + 1) % self.settings.categories.len();
        category
    }

    /// Run one refresh. Failures are recorded in the report, never returned.
    pub async fn tick(&mut self) -> TickReport {
        let started = Instant::now();
        let category = self.next_category();
        let mut report = TickReport::new(category);

        match self
            .assembler
            .assemble_page(category, 1, self.settings.per_page, true)
            .await
        {
            Ok(stories) => {
                report.stories = stories.len();

                let threads = &self.threads;
                let results: Vec<_> = stream::iter(stories)
                    .map(|mut story| async move {
                        let id = story.id;
                        story.rank = 0;
                        (id, threads.build_tree(story).await)
                    })
                    .buffer_unordered(PRIME_CONCURRENCY)
                    .collect()
                    .await;

                for (id, result) in results {
                    match result {
                        Ok(_) => report.pages_primed += 1,
                        Err(e) => report.errors.push(format!("item page {}: {}", id, e)),
                    }
                }
            }
            Err(e) => report.errors.push(format!("{}: {}", category, e)),
        }

        match self
            .scanner
            .scan_recent_comments(
                self.settings.comments_limit,
                true,
                self.settings.comments_deadline,
            )
            .await
        {
            Ok(comments) => report.comments = comments.len(),
            Err(e) => report.errors.push(format!("new comments: {}", e)),
        }

        report.elapsed = started.elapsed();
        report
    }

    /// Tick on the configured interval until `stop` flips to true or its
    /// sender goes away. A tick already in progress is allowed to finish.
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) {
        tracing::info!(
            "Background refresher started (interval: {:?}, categories: {})",
            self.settings.interval,
            self.settings.categories.len()
        );

        let mut timer = interval(self.settings.interval.max(Duration::from_millis(1)));
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        timer.tick().await;

        let mut due = self.settings.refresh_on_start;
        loop {
            if *stop.borrow() {
                break;
            }

            if due {
                let report = self.tick().await;
                log_report(&report);
            }

            tokio::select! {
                _ = timer.tick() => due = true,
                changed = stop.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    due = false;
                }
            }
        }

        tracing::info!("Background refresher stopped");
    }

    /// Run the loop on its own task.
    pub fn spawn(self) -> RefresherHandle {
        let (stop, rx) = watch::channel(false);
        let task = tokio::spawn(self.run(rx));
        RefresherHandle { stop, task }
    }
}

fn log_report(report: &TickReport) {
    if report.errors.is_empty() {
        tracing::info!(
            "Refreshed {}: {} stories, {} pages primed, {} new comments ({:.1}s)",
            report.category,
            report.stories,
            report.pages_primed,
            report.comments,
            report.elapsed.as_secs_f64()
        );
    } else {
        tracing::warn!(
            "Refreshed {} with {} errors: {} stories, {} pages primed, {} new comments ({:.1}s)",
            report.category,
            report.errors.len(),
            report.stories,
            report.pages_primed,
            report.comments,
            report.elapsed.as_secs_f64()
        );
        for error in &report.errors {
            tracing::warn!("  {}", error);
        }
    }
}

/// Handle to a spawned [`Refresher`].
pub struct RefresherHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RefresherHandle {
    /// Ask the loop to stop at its next tick boundary.
    pub fn stop(&self) {
        let _ = self.stop.send(true);
    }

    /// Stop and wait for the in-flight tick, if any, to drain.
    pub async fn shutdown(self) {
        self.stop();
        if let Err(e) = self.task.await {
            tracing::error!("Refresher task failed: {}", e);
        }
    }
}
