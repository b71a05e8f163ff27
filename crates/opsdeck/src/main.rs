//! Opsdeck - operational dashboard backend
//!
//! Single binary that provides:
//! - Database telemetry range queries backed by hourly object-store partitions
//! - Workload inspection and live log streaming
//! - Registry-push redeploy webhook
//! - Namespace-scoped bearer-token authentication

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

mod server;

use opsdeck_common::Config;
use opsdeck_security::JwtAuth;
use server::AppServer;

#[derive(Parser)]
#[command(name = "opsdeck")]
#[command(author, version, about = "Opsdeck - operational dashboard backend", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the dashboard server
    Server {
        /// Configuration file path
        #[arg(short, long, default_value = "/etc/opsdeck/opsdeck.toml")]
        config: String,
    },

    /// Mint a namespace-scoped bearer token
    Token {
        /// Namespace the token grants access to
        #[arg(short, long)]
        namespace: String,

        /// Configuration file path
        #[arg(short, long, default_value = "/etc/opsdeck/opsdeck.toml")]
        config: String,
    },

    /// Show version information
    Version,
}

#[actix_web::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("opsdeck=info".parse()?),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Server { config } => {
            info!("Starting Opsdeck server...");

            let config = Config::load(&config).await?;
            opsdeck_common::metrics::init()?;

            let server = AppServer::new(config).await?;
            server.run().await?;
        }

        Commands::Token { namespace, config } => {
            // Fall back to the environment-driven defaults when no config
            // file is present.
            let config = Config::load(&config).await.unwrap_or_default();
            let auth = JwtAuth::new(&config.security.jwt_secret)?;
            println!("{}", auth.generate_token(&namespace)?);
        }

        Commands::Version => {
            println!("Opsdeck version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
