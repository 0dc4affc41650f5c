//! gembridge - OpenAI-compatible proxy for the Google Generative Language API
//!
//! A small proxy that lets OpenAI-format clients talk to Gemini, trying a
//! priority-ordered list of backend model endpoints per request.

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gembridge::Config;

#[derive(Parser)]
#[command(name = "gembridge")]
#[command(about = "OpenAI-compatible proxy for the Google Generative Language API")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the proxy server
    Serve {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.toml")]
        config: String,

        /// Override listen address
        #[arg(short, long)]
        listen: Option<String>,
    },

    /// Validate configuration file
    Check {
        /// Path to configuration file
        #[arg(short, long, default_value = "config.toml")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gembridge=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config, listen } => {
            tracing::info!(config = %config, "Loading configuration");
            let mut config = Config::load_or_default(&config)?;

            if let Some(addr) = listen {
                tracing::info!(listen = %addr, "Override listen address");
                config.server.listen = addr;
            }

            if config.resolve_api_key().is_none() {
                tracing::warn!(
                    "No API key configured; chat requests will fail until \
                     GEMINI_API_KEY is set"
                );
            }

            gembridge::proxy::run_server(config).await
        }

        Commands::Check { config } => {
            tracing::info!(config = %config, "Checking configuration");
            let config = Config::from_file(&config)?;
            tracing::info!(
                candidates = config.candidates.len(),
                listen = %config.server.listen,
                "Configuration is valid"
            );
            Ok(())
        }
    }
}
