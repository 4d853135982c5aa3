use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use canopy::app::AppContext;
use canopy::cli::{commands, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = commands::load_config(cli.config.as_deref(), cli.max_concurrency)?;
    if let Commands::Refresh {
        interval: Some(interval),
        ..
    } = &cli.command
    {
        config.refresher.interval = interval.clone();
    }

    let ctx = AppContext::new(config)?;

    match cli.command {
        Commands::Stories {
            category,
            page,
            per_page,
            refresh,
        } => {
            commands::show_stories(&ctx, category, page, per_page, refresh).await?;
        }
        Commands::Item { id, refresh } => {
            commands::show_item(&ctx, id, refresh).await?;
        }
        Commands::Comments { limit, refresh } => {
            let limit = limit.unwrap_or(ctx.config.scanner.limit);
            commands::show_new_comments(&ctx, limit, refresh).await?;
        }
        Commands::Root { id } => {
            commands::show_root(&ctx, id).await?;
        }
        Commands::User { name, submissions } => {
            commands::show_user(&ctx, &name, submissions).await?;
        }
        Commands::Search { query, limit } => {
            commands::search(&ctx, &query, limit)?;
        }
        Commands::Refresh { once, .. } => {
            commands::refresh(&ctx, once).await?;
        }
    }

    Ok(())
}
