mod cli;

use playout::{
    config::{self, Config},
    dispatch::{RenderDispatch, VtClient},
    registry::ChannelRegistry,
    scheduler::Scheduler,
    server::{self, AppContext},
};
use playout_common::ChannelId;
use playout_db::{get_conn, init_pool, queries};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn open_db(config: &Config) -> Result<playout_db::DbPool> {
    let db_path = config.database.path.to_string_lossy();
    tracing::info!("Initializing database at {}", db_path);
    init_pool(&db_path).with_context(|| format!("Failed to open database at {}", db_path))
}

async fn start_server(config: Config) -> Result<()> {
    tracing::info!("Starting playout");

    let pool = open_db(&config)?;

    let vt = VtClient::new(&config.dispatch)?;
    if config.dispatch.check_on_start {
        vt.health_check()
            .await
            .with_context(|| format!("Render worker at {} is not healthy", config.dispatch.endpoint))?;
        tracing::info!("Render worker at {} is up", config.dispatch.endpoint);
    }
    let dispatch: Arc<dyn RenderDispatch> = Arc::new(vt);

    let registry = ChannelRegistry::new(pool.clone(), dispatch.clone(), config.channels.clone());
    registry.load().await.context("Failed to load channels")?;

    let scheduler = Scheduler::new(pool.clone(), dispatch, config.scheduler.clone());

    let shutdown = CancellationToken::new();
    let scheduler_handle = {
        let scheduler = scheduler.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { scheduler.run(shutdown).await })
    };
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            server::shutdown_signal().await;
            shutdown.cancel();
        });
    }

    let ctx = AppContext {
        db: pool,
        registry,
        scheduler,
        config: Arc::new(config),
    };
    let server_result = server::start_server(ctx, shutdown.clone()).await;

    // Cleanup
    tracing::info!("Shutting down...");
    shutdown.cancel();
    let _ = scheduler_handle.await;

    server_result
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "playout=trace,playout_av=debug,playout_db=debug,tower_http=debug".to_string()
        } else {
            "playout=info,playout_av=info,playout_db=info,tower_http=info".to_string()
        }
    });

    // stdout is reserved for command output
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let mut config = config::load_config_or_default(cli.config.as_deref())?;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }

            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(config))
        }
        Commands::Plan { channel, json } => plan_channel(cli.config.as_deref(), &channel, json),
        Commands::Islands { channel, json } => show_islands(cli.config.as_deref(), &channel, json),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("playout {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn plan_channel(config_path: Option<&Path>, short_name: &str, json: bool) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let pool = open_db(&config)?;
    let conn = get_conn(&pool)?;

    let id = ChannelId::from(short_name);
    let channel = queries::channels::get_channel(&conn, &id)?
        .with_context(|| format!("Channel not found: {}", short_name))?;
    let plans = playout_av::plan_channel(&channel.ingest, channel.dvr, &channel.outputs);

    if json {
        println!("{}", serde_json::to_string_pretty(&plans)?);
        return Ok(());
    }

    println!("Channel: {} ({})", channel.short_name, channel.name);
    println!("Ingest: {} [{}]", channel.ingest.url, channel.ingest.protocol);
    if plans.is_empty() {
        println!("No outputs configured.");
    }
    for plan in &plans {
        println!("\nOutput: {} -> {}", plan.name, plan.destination);
        match plan.plan() {
            Some(encode) => println!("  {}", encode.to_task_args().normalized()),
            None => println!("  error: {}", plan.error().unwrap_or_default()),
        }
    }
    Ok(())
}

fn show_islands(config_path: Option<&Path>, short_name: &str, json: bool) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let pool = open_db(&config)?;
    let conn = get_conn(&pool)?;

    let health = queries::schedule_entries::health(&conn, &ChannelId::from(short_name))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&health)?);
        return Ok(());
    }

    if health.unscheduled {
        println!("{}: nothing scheduled", short_name);
        return Ok(());
    }

    println!("{}: {} islands, {} gaps", short_name, health.islands.len(), health.gaps.len());
    for island in &health.islands {
        println!(
            "  island {} -> {} ({} entries)",
            island.start.to_rfc3339(),
            island.end.to_rfc3339(),
            island.entries.len()
        );
    }
    for gap in &health.gaps {
        println!(
            "  gap    {} -> {} ({}s)",
            gap.start.to_rfc3339(),
            gap.end.to_rfc3339(),
            gap.seconds
        );
    }
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            config::load_config(p)?
        }
        None => {
            println!("No config file specified, using defaults");
            Config::default()
        }
    };

    println!("✓ Configuration is valid");
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Database: {}", config.database.path.display());
    println!(
        "  Scheduler: lookahead {}, reload every {}s",
        config.scheduler.queue_size, config.scheduler.reload_interval_secs
    );
    println!("  Render worker: {}", config.dispatch.endpoint);
    Ok(())
}
