use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use todo_api::app::{app, AppState};
use todo_api::config;
use todo_api::database::{connect_store, DatabaseManager};

#[derive(Parser)]
#[command(name = "todo-api")]
#[command(about = "Multi-user to-do list JSON API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    #[command(about = "Run the HTTP server (default)")]
    Serve {
        #[arg(long, help = "Port to listen on, overriding SERVER_PORT")]
        port: Option<u16>,
    },

    #[command(about = "Apply the database schema and exit")]
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL
    let _ = dotenvy::dotenv();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();

    let default_filter = if config.api.enable_request_logging {
        "info,todo_api=debug,tower_http=debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();

    info!("Starting Todo API in {:?} mode", config.environment);

    match Cli::parse().command.unwrap_or(Command::Serve { port: None }) {
        Command::Serve { port } => serve(port.unwrap_or(config.server.port)).await,
        Command::Migrate => {
            let pool = DatabaseManager::connect(&config.database).await?;
            DatabaseManager::migrate(&pool).await?;
            info!("Schema applied");
            Ok(())
        }
    }
}

async fn serve(port: u16) -> anyhow::Result<()> {
    let config = config::config();
    let store = connect_store(&config.database).await?;

    let bind_addr = format!("{}:{}", config.server.host, port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Todo API listening on http://{}", bind_addr);

    axum::serve(listener, app(AppState::new(store)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
