//! quill - CosmWasm `x/wasm` indexer.
//!
//! # Usage
//!
//! ```bash
//! # Follow the chain head from the current block
//! quill --lcd-url http://localhost:1317
//!
//! # Index a fixed range
//! DATABASE_URL=postgres://localhost/quill quill --start-height 100 --end-height 200
//! ```

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::signal;
use tokio::sync::watch;
use tracing::{Instrument, debug, error, info, info_span, warn};
use tracing_subscriber::{EnvFilter, fmt};

use quill_core::error::IndexerError;
use quill_core::metrics::init_metrics;
use quill_core::ports::TxSource;
use quill_core::services::{IndexerConfig, IndexerService};
use quill_cosmos::{CosmosClient, CosmosClientConfig};
use quill_handlers::wasm::DEFAULT_PARAMS_REFRESH_INTERVAL;
use quill_handlers::{BundleRegistry, WasmBundle};
use quill_storage::{Database, DatabaseConfig};

/// quill CLI - CosmWasm indexer.
#[derive(Parser, Debug)]
#[command(name = "quill")]
#[command(about = "quill - CosmWasm x/wasm indexer")]
#[command(version)]
struct Cli {
    /// Cosmos SDK LCD (REST) URL.
    #[arg(long, env = "LCD_URL", default_value = "http://127.0.0.1:1317")]
    lcd_url: String,

    /// PostgreSQL database URL.
    #[arg(long, env = "DATABASE_URL", default_value = "postgres://localhost/quill")]
    database_url: String,

    /// First height to index. Defaults to the chain head at startup.
    #[arg(long, env = "START_HEIGHT")]
    start_height: Option<u64>,

    /// Last height to index (inclusive). Follows the chain head when absent.
    #[arg(long, env = "END_HEIGHT")]
    end_height: Option<u64>,

    /// Seconds between polls while waiting for new blocks.
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value = "6")]
    poll_interval_secs: u64,

    /// Blocks between two wasm params snapshots (0 disables them).
    #[arg(long, env = "PARAMS_REFRESH_INTERVAL", default_value_t = DEFAULT_PARAMS_REFRESH_INTERVAL)]
    params_refresh_interval: u64,

    /// Prometheus metrics port.
    #[arg(long, env = "METRICS_PORT", default_value = "9090")]
    metrics_port: u16,

    /// Enable JSON log output.
    #[arg(long, env = "JSON_LOGS")]
    json_logs: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Run database migrations and exit.
    #[arg(long)]
    migrate_only: bool,

    /// Truncate all indexed wasm data and exit. Schema is preserved.
    #[arg(long)]
    purge: bool,

    /// Skip confirmation prompt for destructive operations (like --purge).
    #[arg(long, short = 'y')]
    yes: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json_logs);

    let metrics_enabled = install_metrics_exporter(cli.metrics_port);

    // ─────────────────────────────────────────────────────────────────────────
    // 🚀 STARTUP
    // ─────────────────────────────────────────────────────────────────────────
    info!("🚀 Starting quill indexer");
    debug!(lcd_url = %cli.lcd_url, "LCD endpoint");
    debug!(database_url = %mask_password(&cli.database_url), "Database endpoint");

    // ─────────────────────────────────────────────────────────────────────────
    // 🗄️ DATABASE
    // ─────────────────────────────────────────────────────────────────────────
    info!("🗄️  Connecting to database...");
    let db = Database::connect(&DatabaseConfig::for_indexer(&cli.database_url))
        .await
        .context("Failed to connect to database")?;

    db.migrate().await.context("Failed to run migrations")?;

    // ─────────────────────────────────────────────────────────────────────────
    // 📡 CHAIN CONNECTION
    // ─────────────────────────────────────────────────────────────────────────
    info!("📡 Connecting to Cosmos node...");
    let cosmos_client = CosmosClient::connect(CosmosClientConfig {
        lcd_url: cli.lcd_url.clone(),
        ..Default::default()
    })
    .await
    .context("Failed to connect to Cosmos node")?;
    let cosmos_client = Arc::new(cosmos_client);

    let head = cosmos_client
        .latest_height()
        .await
        .context("Failed to read chain head")?;
    info!(chain_id = %cosmos_client.chain_id(), head, "🔗 Chain connected");

    // ─────────────────────────────────────────────────────────────────────────
    // 📦 HANDLER BUNDLES
    // ─────────────────────────────────────────────────────────────────────────
    let mut bundle_registry = BundleRegistry::new();
    bundle_registry.register(Box::new(
        WasmBundle::new(db.pool().clone(), cosmos_client.clone())
            .with_params_refresh_interval(cli.params_refresh_interval),
    ));

    bundle_registry
        .run_migrations(db.pool())
        .await
        .context("Failed to run bundle migrations")?;
    info!("🗄️  Database ready (migrations applied)");

    if cli.migrate_only {
        info!("🛑 --migrate-only flag set, exiting");
        return Ok(());
    }

    if cli.purge {
        return handle_purge(&db, &bundle_registry, cli.yes).await;
    }

    let handlers = Arc::new(bundle_registry.into_handler_registry());

    let indexer_config = IndexerConfig {
        start_height: cli.start_height.unwrap_or(head),
        end_height: cli.end_height,
        poll_interval: Duration::from_secs(cli.poll_interval_secs.max(1)),
    };
    let indexer = IndexerService::new(indexer_config, cosmos_client, handlers);

    // ─────────────────────────────────────────────────────────────────────────
    // ⚡ INDEXER START
    // ─────────────────────────────────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut indexer_handle =
        tokio::spawn(async move { indexer.run(shutdown_rx).await }.instrument(info_span!("indexer")));

    info!("✅ quill ready");
    if metrics_enabled {
        info!("   📊 Metrics:  http://localhost:{}/metrics", cli.metrics_port);
    } else {
        info!("   📊 Metrics:  disabled");
    }
    info!("   Press Ctrl+C to stop");

    let outcome = tokio::select! {
        result = &mut indexer_handle => result,
        _ = shutdown_signal() => {
            // ─────────────────────────────────────────────────────────────────
            // 🛑 SHUTDOWN
            // ─────────────────────────────────────────────────────────────────
            info!("🛑 Shutting down...");
            let _ = shutdown_tx.send(true);

            match tokio::time::timeout(Duration::from_secs(30), &mut indexer_handle).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("⚠️  Indexer shutdown timed out");
                    indexer_handle.abort();
                    Ok(Err(IndexerError::ShutdownRequested))
                }
            }
        }
    };

    db.close().await;

    match outcome.context("Indexer task panicked")? {
        Ok(()) | Err(IndexerError::ShutdownRequested) => {
            info!("🛑 Shutdown complete");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "❌ Indexer stopped");
            bail!(e)
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .init();
    }
}

/// Install the Prometheus exporter. Failures don't stop the indexer.
fn install_metrics_exporter(port: u16) -> bool {
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            init_metrics();
            true
        }
        Err(e) => {
            warn!("⚠️  Failed to start metrics exporter: {}. Continuing without metrics.", e);
            false
        }
    }
}

/// Mask password in database URL for logging.
fn mask_password(url_str: &str) -> String {
    match url::Url::parse(url_str) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("****"));
            }
            url.to_string()
        }
        Err(_) => url_str.to_string(),
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Handle the --purge command.
async fn handle_purge(
    db: &Database,
    bundle_registry: &BundleRegistry,
    skip_confirmation: bool,
) -> Result<()> {
    let bundle_tables = bundle_registry.tables_to_purge();

    warn!("⚠️  PURGE MODE: This will delete ALL indexed data!");
    warn!("   - Tables: {}", bundle_tables.join(", "));
    warn!("   - Schema and migrations will be preserved");

    if !skip_confirmation {
        print!("\n🔴 Are you sure you want to purge all data? [y/N] ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            info!("❌ Purge cancelled");
            return Ok(());
        }
    }

    info!("🗑️  Purging database...");

    let purged = bundle_registry
        .purge_tables(db.pool())
        .await
        .context("Failed to purge bundle tables")?;

    db.close().await;

    info!("✅ Database purged successfully");
    info!("   🧹 Purged {} table(s)", purged);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_password() {
        assert_eq!(
            mask_password("postgres://quill:secret@db:5432/quill"),
            "postgres://quill:****@db:5432/quill"
        );
        assert_eq!(mask_password("postgres://localhost/quill"), "postgres://localhost/quill");
        assert_eq!(mask_password("not a url"), "not a url");
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["quill"]).unwrap();
        assert_eq!(cli.start_height, None);
        assert_eq!(cli.params_refresh_interval, DEFAULT_PARAMS_REFRESH_INTERVAL);
        assert!(!cli.purge);
    }

    #[test]
    fn test_cli_range() {
        let cli = Cli::try_parse_from(["quill", "--start-height", "10", "--end-height", "20", "-y"]).unwrap();
        assert_eq!((cli.start_height, cli.end_height), (Some(10), Some(20)));
        assert!(cli.yes);
    }
}
