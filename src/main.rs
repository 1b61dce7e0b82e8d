use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use watchlist_sync::{
    config::Config,
    models::{CatalogFilter, ContentType, ItemId, WatchStatus},
    services::{refresh::RefreshAllOutcome, search::QueryOrigin},
    SyncEngine,
};

#[derive(Parser)]
#[command(name = "watchlist-sync")]
#[command(about = "Keep a local view of a shared movie and series watchlist in sync")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the derived catalog view
    Catalog {
        /// Only items with this watch status
        #[arg(long, value_enum)]
        status: Option<StatusArg>,

        /// Only items added by this contributor
        #[arg(long)]
        added_by: Option<String>,

        /// Remote catalog search instead of a filtered listing
        #[arg(long, conflicts_with_all = ["status", "added_by"])]
        search: Option<String>,
    },
    /// Check every series for new seasons
    RefreshAll,
    /// Sync one series' season count with the metadata provider
    Refresh { id: String },
    /// List active new-season notifications
    Notifications,
    /// Dismiss a notification
    Dismiss { id: String },
    /// Fetch recommendations
    Recommend {
        #[arg(long)]
        added_by: Option<String>,
    },
    /// Search the external metadata provider
    Lookup {
        #[arg(long, value_enum, default_value = "movie")]
        kind: KindArg,
        title: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusArg {
    Watched,
    Unwatched,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Movie,
    Series,
}

impl From<StatusArg> for WatchStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Watched => WatchStatus::Watched,
            StatusArg::Unwatched => WatchStatus::Unwatched,
        }
    }
}

impl From<KindArg> for ContentType {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Movie => ContentType::Movie,
            KindArg::Series => ContentType::Series,
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "watchlist_sync=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let engine = SyncEngine::from_config(&config)?;

    match cli.command {
        Commands::Catalog {
            status,
            added_by,
            search,
        } => {
            match search {
                Some(query) => engine.catalog.search(&query).await?,
                None => {
                    engine
                        .catalog
                        .set_filter(CatalogFilter {
                            watch_status: status.map(WatchStatus::from),
                            added_by,
                        })
                        .await?
                }
            }
            print_json(&engine.view().await)?;
        }
        Commands::RefreshAll => {
            engine.bootstrap().await?;
            match engine.refresh.refresh_all().await? {
                RefreshAllOutcome::AlreadyRunning => println!("A refresh is already running"),
                RefreshAllOutcome::Updated(_) | RefreshAllOutcome::NoChanges(_) => {
                    for notice in engine.state.notices().await {
                        println!("{}", notice.message);
                    }
                }
            }
        }
        Commands::Refresh { id } => {
            engine.catalog.reload().await?;
            let item = engine.refresh.refresh_series(&ItemId::from(id)).await?;
            print_json(&item)?;
        }
        Commands::Notifications => {
            print_json(&engine.notifications.fetch().await?)?;
        }
        Commands::Dismiss { id } => {
            engine.notifications.fetch().await?;
            let outcome = engine.dismiss_notification(&id).await?;
            tracing::info!(notification_id = %id, ?outcome, "Dismiss finished");
            print_json(&engine.state.inner.read().await.notifications)?;
        }
        Commands::Recommend { added_by } => {
            print_json(&engine.recommendations.fetch(added_by).await)?;
        }
        Commands::Lookup { kind, title } => {
            engine.search.set_target(kind.into()).await;
            engine.search.query(&title, QueryOrigin::Manual).await;
            engine.search.wait_idle().await;
            print_json(&engine.search.snapshot().await.results)?;
        }
    }

    Ok(())
}
