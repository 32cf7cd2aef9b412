//! Command-line interface for linkgraph.
//!
//! # Available Commands
//!
//! - `context` - Show the metadata of a resource type: dialect, associations
//!   and operations
//! - `action` - Invoke an operation and resolve a selection on its result
//!
//! # Global Options
//!
//! - `--verbose` - Enable debug logging (`RUST_LOG` overrides it)
//! - `--config` - Path to a custom config file
//!
//! # Example
//!
//! ```bash
//! linkgraph context um.user
//! linkgraph action um.user query --param organization_id=42 \
//!     --schema 'first_name, organization { name }' --unfurl
//! ```

mod action;
mod context;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Once;
use tracing_subscriber::EnvFilter;

use crate::client::Client;
use crate::config::ClientConfig;

static LOGGING: Once = Once::new();

/// Runtime configuration derived from the global flags.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Default log filter; `None` defers to the config's `verbose`
    pub log_level: Option<String>,
    /// Explicit configuration file
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    /// Install the tracing subscriber. `RUST_LOG` wins over the flag and `verbose`.
    pub fn init_logging(&self, verbose: bool) {
        let level = match (&self.log_level, verbose) {
            (Some(level), _) => level.clone(),
            (None, true) => "debug".to_string(),
            (None, false) => "warn".to_string(),
        };
        LOGGING.call_once(|| {
            let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
            let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
        });
    }

    /// Load the client configuration, forcing `verbose` when debug logging is on.
    pub async fn load_client_config(&self) -> Result<ClientConfig> {
        let mut config = ClientConfig::load_with_optional(self.config_path.clone()).await?;
        if self.log_level.as_deref() == Some("debug") {
            config.verbose = true;
        }
        Ok(config)
    }
}

#[derive(Parser)]
#[command(
    name = "linkgraph",
    about = "Resolve association graphs of linked resources",
    version,
    long_about = "linkgraph invokes resource operations and resolves nested associations of the results with batched backend calls."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the configuration file (default: ~/.linkgraph/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the metadata of a resource type
    Context(context::ContextCommand),

    /// Invoke an operation and resolve associations of its result
    Action(action::ActionCommand),
}

impl Cli {
    /// Run the parsed command.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    /// Global flags as a [`CliConfig`].
    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        CliConfig {
            log_level: self.verbose.then(|| "debug".to_string()),
            config_path: self.config.clone(),
        }
    }

    /// Run the parsed command with an explicit configuration.
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        let client_config = config.load_client_config().await?;
        config.init_logging(client_config.verbose);
        let client = Client::new(client_config)?;

        match self.command {
            Commands::Context(cmd) => cmd.execute(&client).await,
            Commands::Action(cmd) => cmd.execute(&client).await,
        }
    }
}
