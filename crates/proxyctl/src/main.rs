//! proxyctl - proxy fleet control plane

use clap::Parser;
use color_eyre::eyre::Result;
use proxyctl::cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    match cli.command {
        Command::Serve(cmd) => cmd.run().await,
        Command::Agent(cmd) => cmd.run().await,
    }
}
