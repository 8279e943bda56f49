//! essentials CLI
//!
//! Serves the Military Essentials website and validates its configuration files.
//!
//! ## Commands
//!
//! - `serve`: run the static file server until Ctrl-C or SIGTERM
//! - `check-config <path>`: parse a site configuration (TOML or JSON) and print the result
//!
//! Server settings are layered: built-in defaults, then `--config <file>`, then the `PORT`,
//! `SITE_ENV`/`NODE_ENV` and `SITE_ROOT` environment variables, then command-line flags.

use clap::{Parser, Subcommand};
use essentials_site::{
    config::{ServerConfig, SiteConfig},
    server,
};
use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

#[derive(Parser)]
#[command(name = "essentials")]
#[command(author, version, about = "Serve and check the Military Essentials website", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the site directory over HTTP
    Serve {
        /// Directory containing index.html and the static assets
        #[arg(long)]
        root: Option<PathBuf>,

        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Deployment environment, e.g. `development` or `production`
        #[arg(long)]
        env: Option<String>,

        /// Server configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Parse a site configuration file and print the effective settings
    CheckConfig {
        /// Path to a `.toml` or `.json` site configuration
        path: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            root,
            host,
            port,
            env,
            config,
        } => {
            let mut settings = match config {
                Some(path) => ServerConfig::from_toml_path(path)?,
                None => ServerConfig::default(),
            }
            .with_env()?;
            if let Some(root) = root {
                settings.root = root;
            }
            if let Some(host) = host {
                settings.host = host;
            }
            if let Some(port) = port {
                settings.port = port;
            }
            if let Some(env) = env {
                settings.environment = env;
            }

            if !settings.root.join("index.html").is_file() {
                tracing::warn!(
                    "{} has no index.html, page routes will answer 500",
                    settings.root.display()
                );
            }

            // ctrlc's termination feature covers SIGTERM as well as SIGINT
            let running = Arc::new(AtomicBool::new(true));
            let r = running.clone();
            ctrlc::set_handler(move || {
                println!("\nShutting down...");
                r.store(false, Ordering::SeqCst);
            })?;

            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(async move {
                let shutdown = async move {
                    while running.load(Ordering::SeqCst) {
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                };
                println!(
                    "\n🚀 Military Essentials running at http://{}:{}",
                    settings.host, settings.port
                );
                println!("📁 Serving: {}", settings.root.display());
                println!("🌍 Environment: {}\n", settings.environment);
                server::serve(settings, shutdown).await
            })?;
        }

        Commands::CheckConfig { path } => {
            let is_json = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("json"))
                .unwrap_or(false);
            let config = if is_json {
                SiteConfig::from_json_str(&std::fs::read_to_string(&path)?)?
            } else {
                SiteConfig::from_toml_path(&path)?
            };
            println!("✓ {} is valid", path.display());
            println!("{}", toml::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
