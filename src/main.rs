//! Telemetry Agent - Main Entry Point
//!
//! Loads the configuration, connects to the broker and publishes sensor
//! readings until a `stop` command arrives on the control topic.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use telemetry_agent::agent::{Supervisor, TelemetryAgent};
use telemetry_agent::config::AgentConfig;
use telemetry_agent::error::AgentError;
use telemetry_agent::observability::init_default_logging;
use telemetry_agent::transport::MqttTransport;
use tracing::{error, info};

/// Default configuration locations, tried in order
const DEFAULT_CONFIG_PATHS: [&str; 2] = ["telemetry-agent.toml", "config/telemetry-agent.toml"];

/// Command-driven MQTT telemetry agent
#[derive(Parser)]
#[command(name = "telemetry-agent")]
#[command(about = "Publishes sensor telemetry over MQTT and obeys remote control commands")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the agent until a stop command is received
    Run,
    /// Validate configuration
    Config {
        /// Print the effective configuration
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_default_logging(cli.verbose);

    info!("Starting telemetry agent v{}", env!("CARGO_PKG_VERSION"));

    let config = match load_configuration(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Run => run_agent(config).await,
        Commands::Config { show } => handle_config_command(&config, show),
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        process::exit(1);
    }

    info!("Application shutdown complete");
}

fn load_configuration(config_path: Option<&Path>) -> Result<AgentConfig, AgentError> {
    if let Some(path) = config_path {
        info!("Loading configuration from: {}", path.display());
        return Ok(AgentConfig::load_from_file(path)?);
    }

    for path_str in DEFAULT_CONFIG_PATHS {
        let path = Path::new(path_str);
        if path.exists() {
            info!("Loading configuration from: {}", path.display());
            return Ok(AgentConfig::load_from_file(path)?);
        }
    }

    Err(AgentError::internal_error(
        "No configuration file found. Provide one with -c/--config or create telemetry-agent.toml",
    ))
}

async fn run_agent(config: AgentConfig) -> Result<(), AgentError> {
    info!(
        agent_id = %config.agent.id,
        host = %config.mqtt.host,
        port = config.mqtt.port,
        "Application starting"
    );

    let transport = Arc::new(
        MqttTransport::new(&config).map_err(|e| AgentError::TransportError(Box::new(e)))?,
    );
    let agent = TelemetryAgent::from_config(&config, transport.clone());

    let summary = Supervisor::new(transport, agent).run().await?;
    info!(
        published = summary.published,
        publish_failures = summary.publish_failures,
        "Telemetry agent exited cleanly"
    );
    Ok(())
}

fn handle_config_command(config: &AgentConfig, show: bool) -> Result<(), AgentError> {
    info!("Configuration is valid");

    if show {
        let rendered = toml::to_string_pretty(config)
            .map_err(|e| AgentError::internal_error(format!("Failed to render config: {e}")))?;
        println!("{rendered}");
    }

    Ok(())
}
