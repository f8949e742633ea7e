mod config;
mod credentials;
mod db;
mod docs_client;
mod documents;
mod errors;
mod models;
mod routes;
mod skills;
mod state;
mod submission;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::credentials::provider_from_source;
use crate::docs_client::GoogleDocsClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::submission::log::PgSubmissionLog;
use crate::submission::workflow::SubmissionWorkflow;

#[derive(Parser)]
#[command(name = "docgen")]
#[command(about = "Fills CV and cover-letter templates and exports them as PDF")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API (default)
    Serve,
    /// Apply pending database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}=info", env!("CARGO_PKG_NAME")))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Migrations need only DATABASE_URL; serving validates the full config.
    match cli.command.unwrap_or(Command::Serve) {
        Command::Migrate => db::run_migrations(&Config::database_url_from_env()?).await,
        Command::Serve => serve(Config::from_env()?).await,
    }
}

async fn serve(config: Config) -> Result<()> {
    info!("Starting docgen v{}", env!("CARGO_PKG_VERSION"));

    let pool = db::create_pool(&config.database_url)?;
    let log = Arc::new(PgSubmissionLog::new(pool));

    let credentials = provider_from_source(&config.credentials)
        .context("Failed to initialize document service credentials")?;
    let docs = GoogleDocsClient::new(
        credentials,
        &config.docs_api_base,
        &config.drive_api_base,
    )
    .context("Failed to build document service client")?;
    info!("Document service client initialized ({})", config.docs_api_base);

    for target in &config.documents {
        info!(
            "Rendering {} from template {} to {}",
            target.kind, target.template, target.output_filename
        );
    }

    let workflow = SubmissionWorkflow::new(
        Arc::new(docs),
        log.clone(),
        config.documents.clone(),
        config.output_dir.clone(),
    );

    let state = AppState {
        workflow: Arc::new(workflow),
        log,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
