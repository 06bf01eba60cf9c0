use anyhow::Result;
use clap::Args;
use routeglass::GlassConfig;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Arguments for the Serve command
#[derive(Args)]
pub struct ServeArgs {
    /// Interval between two stats log lines, e.g. "1m" (default: the refresh interval)
    #[clap(long)]
    pub stats_interval: Option<String>,
}

pub async fn run(config: &GlassConfig, args: ServeArgs) -> Result<()> {
    let stats_interval = match args.stats_interval {
        Some(s) => humantime::parse_duration(s.as_str())
            .map_err(|e| anyhow::anyhow!("Invalid stats interval '{}': {}", s, e))?,
        None => config.refresh_interval,
    }
    .max(Duration::from_secs(1));

    let store = super::build_store(config)?;
    let shutdown = CancellationToken::new();
    let handles = store.start(shutdown.clone());
    info!("Serving {} sources", handles.len());

    let mut ticker = tokio::time::interval(stats_interval);
    // The first tick fires immediately, before any refresh finished
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                let stats = store.stats().await;
                for source in &stats.sources {
                    info!(
                        "{}: {} imported, {} filtered, {} ({} errors)",
                        source.id,
                        source.routes.imported,
                        source.routes.filtered,
                        source.state.status,
                        source.state.error_count
                    );
                }
                info!(
                    "total: {} imported, {} filtered",
                    stats.total_routes.imported, stats.total_routes.filtered
                );
            }
        }
    }

    info!("Shutting down");
    shutdown.cancel();
    for handle in handles {
        if let Err(e) = handle.await {
            warn!("Refresh task failed: {}", e);
        }
    }
    Ok(())
}
