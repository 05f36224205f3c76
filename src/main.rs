use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use petsync::sync::SyncService;
use petsync::{api, config, store, AppState};

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cfg = config::load()?;
    let args = cli::Cli::parse();

    let result = match args.command {
        Some(cli::Commands::Serve { port }) => {
            let port = port.unwrap_or(cfg.port);
            run_server(cfg, port).await
        }
        Some(command) => run_command(cfg, command).await,
        None => {
            let port = cfg.port;
            run_server(cfg, port).await
        }
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

/// Logs go to stderr so command output on stdout stays valid JSON.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "petsync=debug,tower_http=debug".into()),
    );
    let json = matches!(
        std::env::var("PETSYNC_LOG_JSON").as_deref(),
        Ok("1") | Ok("true")
    );

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn build_service(cfg: &config::Config) -> anyhow::Result<SyncService> {
    let store = store::open(cfg.database_url.as_deref()).await?;
    SyncService::from_config(cfg, store)
}

async fn run_server(cfg: config::Config, port: u16) -> anyhow::Result<()> {
    let sync = build_service(&cfg).await?;
    let state = Arc::new(AppState { sync });
    let app = api::app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("petsync listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn run_command(cfg: config::Config, command: cli::Commands) -> anyhow::Result<()> {
    let sync = build_service(&cfg).await?;

    match command {
        cli::Commands::Import { command } => {
            let result = match command {
                cli::ImportCommands::Org { org_id } => {
                    sync.import_from_organization(org_id.as_deref()).await?
                }
                cli::ImportCommands::Search(args) => sync.import_from_search(&args.into()).await?,
                cli::ImportCommands::Animal { id } => sync.import_animal(id).await?,
            };
            print_json(&result)
        }
        cli::Commands::Upload { dog_id, method } => {
            let result = sync.upload_dog(dog_id, method).await?;
            print_json(&result)?;
            if !result.success {
                anyhow::bail!("upload failed");
            }
            Ok(())
        }
        cli::Commands::UploadPending => {
            let result = sync.upload_pending().await?;
            print_json(&result)
        }
        cli::Commands::TestConnection => print_json(&sync.test_connection().await),
        cli::Commands::Status => print_json(&sync.summary().await?),
        cli::Commands::Serve { .. } => anyhow::bail!("serve is not a one-shot command"),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
