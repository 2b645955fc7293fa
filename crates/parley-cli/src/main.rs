mod config;

use clap::{Parser, Subcommand};
use config::ParleyConfig;
use parley_gateway::{ContextRegistry, GatewayServer};
use parley_inference::{InferenceBackend, InferenceClient};
use parley_security::{Sanitizer, StaticCredentials};
use parley_session::{SessionPicker, StoreScope, TieredSessionStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "parley", about = "Parley: a small web chat client for a hosted model")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "parley.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web gateway
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Print the stored sessions of a user, as shown in the picker
    Sessions {
        #[arg(short, long)]
        user: String,
    },
    /// Send one prompt to the inference endpoint and print the reply
    Ask { prompt: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is normal.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let cli = Cli::parse();
    let config = ParleyConfig::load(&cli.config).await?;

    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or(config.server.host);
            let port = port.unwrap_or(config.server.port);

            let store = Arc::new(TieredSessionStore::from_config(&config.storage).await?);
            let backend = Arc::new(InferenceClient::new(&config.inference)?);
            info!(
                url = %backend.url(),
                signed = backend.is_signed(),
                "Inference endpoint configured"
            );

            let app = GatewayServer::build_with_registry(
                Arc::new(StaticCredentials::builtin()),
                store,
                backend,
                Sanitizer::new(config.server.max_prompt_length),
                ContextRegistry::with_idle_timeout(Duration::from_secs(
                    config.server.idle_timeout_secs,
                )),
            );

            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            info!("Parley gateway listening on {addr}");
            axum::serve(listener, app).await?;
        }
        Commands::Sessions { user } => {
            let store = Arc::new(TieredSessionStore::from_config(&config.storage).await?);
            let entries = SessionPicker::new(store)
                .entries(&StoreScope::user(user.as_str()))
                .await;
            if entries.is_empty() {
                println!("No sessions stored for {user}.");
            } else {
                for entry in &entries {
                    println!("{}", entry.label);
                }
                println!("\nTotal: {} session(s)", entries.len());
            }
        }
        Commands::Ask { prompt } => {
            let prompt = Sanitizer::new(config.server.max_prompt_length)
                .check(&prompt)?;
            let client = InferenceClient::new(&config.inference)?;
            println!("{}", client.ask(&prompt).await);
        }
    }

    Ok(())
}
