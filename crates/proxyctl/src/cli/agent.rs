//! the `agent` subcommand - runs the node side of the channel.
//!
//! the agent dials the master, registers with the node's name and
//! pre-shared secret, applies pushed configuration documents through
//! the engine supervisor, and reports traffic gathered from the
//! engine's stats api. it reconnects with a fixed backoff whenever the
//! channel drops.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use color_eyre::eyre::{Context, Result, bail, eyre};
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use proxyctl_engine::{EngineSupervisor, StatsClient};
use proxyctl_proto::{ClientCounters, MasterFrame, NodeFrame};
use proxyctl_types::EngineConfig;

/// delay between reconnect attempts.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// run the node-side agent
#[derive(Args, Debug)]
pub struct AgentCommand {
    /// master websocket base url (e.g. ws://master:9080)
    #[arg(long, env = "PROXYCTL_MASTER_URL")]
    master: String,

    /// this node's name as registered on the master
    #[arg(long, env = "PROXYCTL_NODE_NAME")]
    name: String,

    /// this node's pre-shared secret
    #[arg(long, env = "PROXYCTL_NODE_SECRET")]
    secret: String,

    /// path to the proxy engine binary
    #[arg(long, env = "PROXYCTL_ENGINE_BINARY")]
    engine_binary: Option<PathBuf>,

    /// where to write the applied configuration document
    #[arg(long, env = "PROXYCTL_ENGINE_CONFIG")]
    engine_config: Option<PathBuf>,

    /// locally-bound port of the engine's stats api
    #[arg(long, env = "PROXYCTL_ENGINE_API_PORT")]
    api_port: Option<u16>,

    /// seconds between traffic reports (0 disables)
    #[arg(long, env = "PROXYCTL_REPORT_INTERVAL")]
    report_interval: Option<u64>,

    /// log level
    #[arg(long, env = "PROXYCTL_LOG_LEVEL")]
    log_level: Option<String>,
}

impl AgentCommand {
    fn engine_config(&self) -> EngineConfig {
        let mut config = EngineConfig::default();
        if let Some(binary) = &self.engine_binary {
            config.binary_path = binary.clone();
        }
        if let Some(path) = &self.engine_config {
            config.config_path = path.clone();
        }
        if let Some(port) = self.api_port {
            config.api_port = port;
        }
        if let Some(interval) = self.report_interval {
            config.report_interval_secs = interval;
        }
        config
    }

    /// run the agent command
    pub async fn run(self) -> Result<()> {
        super::init_logging(self.log_level.as_deref())?;

        let engine = self.engine_config();
        let supervisor = EngineSupervisor::new(engine.clone());
        let stats = StatsClient::new(engine.api_port);
        let endpoint = format!("{}/node/ws", self.master.trim_end_matches('/'));

        info!(master = %endpoint, node = %self.name, "starting proxyctl agent");

        loop {
            match run_session(
                &endpoint,
                &self.name,
                &self.secret,
                &supervisor,
                &stats,
                engine.report_interval_secs,
            )
            .await
            {
                Ok(()) => info!("channel closed, reconnecting"),
                Err(e) => warn!(error = %e, "channel failed, reconnecting"),
            }
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    }
}

/// one connected session: handshake, then apply pushes and report
/// traffic until the channel drops.
async fn run_session(
    endpoint: &str,
    name: &str,
    secret: &str,
    supervisor: &EngineSupervisor,
    stats: &StatsClient,
    report_interval_secs: u64,
) -> Result<()> {
    let (ws, _response) = connect_async(endpoint)
        .await
        .with_context(|| format!("failed to connect to {endpoint}"))?;
    let (mut sink, mut stream) = ws.split();

    let hello = NodeFrame::Hello {
        name: name.to_string(),
        secret: secret.to_string(),
    };
    sink.send(Message::Text(hello.to_json()?.into())).await?;

    // the master answers the handshake before anything else
    let first = stream
        .next()
        .await
        .ok_or_else(|| eyre!("connection closed during handshake"))??;
    let Message::Text(text) = first else {
        bail!("unexpected handshake response frame");
    };
    match MasterFrame::from_json(&text)? {
        MasterFrame::HelloOk { node_id } => {
            info!(node_id, "registered with master");
        }
        MasterFrame::HelloRejected { reason } => {
            bail!("master rejected registration: {reason}");
        }
        MasterFrame::ConfigPush { .. } => bail!("config push before handshake completed"),
    }

    let mut report_timer =
        tokio::time::interval(Duration::from_secs(report_interval_secs.max(1)));
    report_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            message = stream.next() => match message {
                None => return Ok(()),
                Some(Err(e)) => return Err(e.into()),
                Some(Ok(Message::Close(_))) => return Ok(()),
                Some(Ok(Message::Text(text))) => {
                    match MasterFrame::from_json(&text) {
                        Ok(MasterFrame::ConfigPush { push_id, config }) => {
                            info!(push_id, "applying pushed configuration");
                            // the document is always the complete desired
                            // state; apply replaces the running config
                            let (applied, reason) = match supervisor.apply(config.get()).await {
                                Ok(()) => (true, None),
                                Err(e) => {
                                    warn!(push_id, error = %e, "failed to apply configuration");
                                    (false, Some(e.to_string()))
                                }
                            };
                            let ack = NodeFrame::Ack { push_id, applied, reason };
                            sink.send(Message::Text(ack.to_json()?.into())).await?;
                        }
                        Ok(_) => debug!("ignoring unexpected master frame"),
                        Err(e) => debug!(error = %e, "undecodable frame from master"),
                    }
                }
                Some(Ok(_)) => {}
            },
            _ = report_timer.tick(), if report_interval_secs > 0 => {
                match stats.query(true).await {
                    Ok(snapshot) => {
                        let clients = snapshot
                            .clients
                            .into_iter()
                            .map(|c| ClientCounters { email: c.email, up: c.up, down: c.down })
                            .collect();
                        let frame = NodeFrame::Traffic {
                            up: snapshot.up,
                            down: snapshot.down,
                            clients,
                        };
                        sink.send(Message::Text(frame.to_json()?.into())).await?;
                    }
                    // the engine may simply not be running yet
                    Err(e) => debug!(error = %e, "traffic query failed"),
                }
            },
        }
    }
}
