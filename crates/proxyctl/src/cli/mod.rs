//! cli subcommands for proxyctl.
//!
//! - `proxyctl serve` - run the master control plane
//! - `proxyctl agent` - run the node-side agent against a master

mod agent;
mod serve;

pub use agent::AgentCommand;
pub use serve::ServeCommand;

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// proxyctl - proxy fleet control plane
#[derive(Parser, Debug)]
#[command(name = "proxyctl")]
#[command(about = "Proxy fleet control plane", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// top-level commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// run the master control plane
    Serve(ServeCommand),

    /// run the node-side agent
    Agent(AgentCommand),
}

/// initialize logging from an optional level override.
fn init_logging(log_level: Option<&str>) -> Result<()> {
    let level = match log_level.unwrap_or("info").to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
