//! the `serve` subcommand - runs the master control plane.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use color_eyre::eyre::{Context, Result};
use tokio::net::TcpListener;
use tracing::{debug, info};

use proxyctl_db::ProxyctlDb;
use proxyctl_types::Config;

use crate::{AccountEnforcer, AppState, create_app};

/// default config file search paths (in order of priority).
const CONFIG_SEARCH_PATHS: &[&str] = &["/etc/proxyctl/config.toml", "./config.toml"];

/// run the proxyctl master
#[derive(Args, Debug)]
pub struct ServeCommand {
    /// path to config file (toml format)
    #[arg(short, long, env = "PROXYCTL_CONFIG")]
    config: Option<PathBuf>,

    /// database file path or sqlite:// url
    #[arg(long, env = "PROXYCTL_DATABASE_URL")]
    database_url: Option<String>,

    /// address to listen on
    #[arg(long, env = "PROXYCTL_LISTEN_ADDR")]
    listen_addr: Option<String>,

    /// seconds between policy enforcement runs (0 disables)
    #[arg(long, env = "PROXYCTL_POLICY_INTERVAL")]
    policy_interval: Option<u64>,

    /// seconds to wait for a node's apply acknowledgment
    #[arg(long, env = "PROXYCTL_ACK_TIMEOUT")]
    ack_timeout: Option<u64>,

    /// log level
    #[arg(long, env = "PROXYCTL_LOG_LEVEL")]
    log_level: Option<String>,
}

impl ServeCommand {
    /// find and load a config file, returning none if no file is found.
    fn load_config_file(config_path: Option<&PathBuf>) -> Result<Option<Config>> {
        // an explicit path must exist
        if let Some(path) = config_path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file: {path:?}"))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("failed to parse config file: {path:?}"))?;
            return Ok(Some(config));
        }

        for path_str in CONFIG_SEARCH_PATHS {
            let path = PathBuf::from(path_str);
            if path.exists() {
                debug!("found config file at {path:?}");
                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read config file: {path:?}"))?;
                let config: Config = toml::from_str(&content)
                    .with_context(|| format!("failed to parse config file: {path:?}"))?;
                return Ok(Some(config));
            }
        }

        Ok(None)
    }

    /// convert cli arguments into a config struct, merging with the
    /// config file if present.
    ///
    /// priority order: defaults -> config file -> cli flags
    fn into_config(self) -> Result<Config> {
        let mut config = match Self::load_config_file(self.config.as_ref())? {
            Some(file_config) => {
                info!("loaded configuration from file");
                file_config
            }
            None => {
                debug!("no config file found, using defaults");
                Config::default()
            }
        };

        if let Some(database_url) = self.database_url {
            config.database.connection_string = database_url;
        }
        if let Some(listen_addr) = self.listen_addr {
            config.listen_addr = listen_addr;
        }
        if let Some(interval) = self.policy_interval {
            config.policy.interval_secs = interval;
        }
        if let Some(ack_timeout) = self.ack_timeout {
            config.push.ack_timeout_secs = ack_timeout;
        }

        Ok(config)
    }

    /// run the serve command
    pub async fn run(self) -> Result<()> {
        super::init_logging(self.log_level.as_deref())?;

        info!("starting proxyctl master...");
        let config = self.into_config()?;
        info!("database: {}", config.database.connection_string);
        info!("listen address: {}", config.listen_addr);

        // ensure the sqlite parent directory exists
        let db_path = std::path::Path::new(
            config
                .database
                .connection_string
                .trim_start_matches("sqlite:"),
        );
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                info!("creating database directory: {parent:?}");
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create database directory: {parent:?}"))?;
            }
        }

        let db = ProxyctlDb::new(&config.database)
            .await
            .context("failed to initialize database")?;
        info!("database initialized");

        let state = AppState::new(db.clone(), config.clone());

        // the policy timer runs independently of any push trigger
        let enforcer = AccountEnforcer::new(db, state.pusher.clone());
        let _policy_task =
            enforcer.spawn_enforcer(Duration::from_secs(config.policy.interval_secs));

        let app = create_app(state);
        let listener = TcpListener::bind(&config.listen_addr)
            .await
            .with_context(|| format!("failed to bind {}", config.listen_addr))?;
        info!("listening on {}", config.listen_addr);

        axum::serve(listener, app)
            .await
            .context("http server failed")?;
        Ok(())
    }
}
