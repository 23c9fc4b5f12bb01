use clap::Parser;
use recap_core::RecapConfig;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use recap_server::server;
use recap_server::subsystems::{analyze, summarize};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "recap.toml")]
    config: String,

    #[arg(long)]
    health: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience — production uses real env vars)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Init logging
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    // Load config
    let config = match RecapConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Connect to DB
    let pool = match recap_core::db::create_pool(&config.database).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };

    if args.health {
        match recap_core::db::health_check(&pool).await {
            Ok(v) => println!("✅ PostgreSQL connected: {}", v),
            Err(e) => {
                println!("❌ PostgreSQL connection failed: {}", e);
                std::process::exit(1);
            }
        }

        println!("✅ Recap DB health check passed");
        return Ok(());
    }

    if let Err(e) = recap_core::db::run_migrations(&pool).await {
        eprintln!("Failed to run migrations: {}", e);
        std::process::exit(1);
    }

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl+C");
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    // Spawn the periodic analysis loop
    match summarize::create_backend(&config.llm) {
        Ok(backend) => {
            let repo = recap_core::MessageRepository::new(pool.clone());
            let summarizer = summarize::Summarizer::new(Arc::new(backend), &config.llm);
            let analysis_config = config.analysis.clone();
            let analysis_shutdown = tx.subscribe();
            tokio::spawn(analyze::run_analysis_loop(
                repo,
                summarizer,
                analysis_config,
                analysis_shutdown,
            ));
        }
        Err(e) => {
            tracing::warn!(
                "Analysis loop skipped: failed to create completion backend: {}",
                e
            );
        }
    }

    // Spawn HTTP REST API server if enabled
    if config.http.enabled {
        let http_pool = pool.clone();
        let http_config = config.clone();
        let http_shutdown = tx.subscribe();
        tokio::spawn(async move {
            if let Err(e) =
                recap_server::http::start_http_server(http_pool, http_config, http_shutdown).await
            {
                tracing::error!("HTTP server error: {}", e);
            }
        });
    }

    let socket_path = config.service.socket_path.clone();
    server::run_bridge_server(&socket_path, pool, config, tx.subscribe()).await?;

    Ok(())
}
