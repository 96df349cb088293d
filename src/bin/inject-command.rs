//! Telemetry Agent Command Injection Utility
//!
//! Publishes a single control command to a running agent, using the same
//! configuration file and TLS material as the agent itself.
//!
//! ## Usage
//!
//! ```bash
//! # Pause publishing
//! inject-command -c telemetry-agent.toml pause
//!
//! # Resume and stop
//! inject-command -c telemetry-agent.toml resume
//! inject-command -c telemetry-agent.toml stop
//!
//! # Unknown commands are logged and ignored by the agent
//! inject-command -c telemetry-agent.toml reboot
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::process;
use telemetry_agent::config::AgentConfig;
use telemetry_agent::observability::init_default_logging;
use telemetry_agent::protocol::{Command, ControlDecoder};
use telemetry_agent::transport::{MqttTransport, Transport};
use tokio::time::{sleep, Duration};
use tracing::{error, info};

#[derive(Parser)]
#[command(
    name = "inject-command",
    about = "Send a control command (stop, pause, resume) to a telemetry agent"
)]
struct Args {
    /// Command to send
    command: String,

    /// Configuration file path
    #[arg(short, long, value_name = "FILE", default_value = "telemetry-agent.toml")]
    config: PathBuf,

    /// Control topic (defaults to the configured one)
    #[arg(long)]
    topic: Option<String>,

    /// Time to let the broker acknowledge before disconnecting
    #[arg(long, default_value = "500")]
    linger_ms: u64,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_default_logging(args.verbose);

    if let Err(e) = inject(args).await {
        error!("Failed to inject command: {}", e);
        process::exit(1);
    }
}

async fn inject(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AgentConfig::load_from_file(&args.config)?;
    // Never take over the agent's own session
    config.mqtt.client_id = Some(format!("inject-command-{}", uuid::Uuid::new_v4().simple()));

    let topic = args.topic.unwrap_or_else(|| config.mqtt.control_topic.clone());
    let command = Command::parse(&args.command);

    let client = MqttTransport::new(&config)?;
    client.connect().await?;

    client.publish(&topic, ControlDecoder::encode(&command)).await?;
    info!(topic = %topic, command = %command, "Command published");

    sleep(Duration::from_millis(args.linger_ms)).await;
    client.disconnect().await?;
    Ok(())
}
