//! supervisor state machine for the proxy engine child process.
//!
//! the supervisor is an explicit owned structure, one per engine
//! instance; all state lives behind a single mutex so independent
//! supervisors never interfere with each other.

use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use proxyctl_types::EngineConfig;

use crate::{Error, Result};

/// lifecycle states of the supervised engine process.
///
/// transitions: `Stopped → Starting → Running → (Stopping → Stopped |
/// Crashed)`; a crashed engine returns to `Starting` on the next start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineState {
    /// no child process exists.
    #[default]
    Stopped,
    /// the config is being written and the child spawned.
    Starting,
    /// the child process is alive.
    Running,
    /// a deliberate stop is in progress.
    Stopping,
    /// the child exited without being asked to.
    Crashed,
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EngineState::Stopped => "stopped",
            EngineState::Starting => "starting",
            EngineState::Running => "running",
            EngineState::Stopping => "stopping",
            EngineState::Crashed => "crashed",
        };
        f.write_str(s)
    }
}

/// outcome of a terminated engine process, with platform masking
/// already applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitResult {
    /// whether the termination counts as a normal stop.
    pub clean: bool,
    /// human-readable form of the exit status.
    pub description: String,
}

impl ExitResult {
    /// classify an observed exit status.
    ///
    /// on windows, stopping the engine kills the process and the kill
    /// manifests as "exit status 1"; that is a normal stop there, not a
    /// crash. no other platform masks anything.
    fn from_status(status: ExitStatus) -> Self {
        let masked = cfg!(windows) && status.code() == Some(1);
        Self {
            clean: status.success() || masked,
            description: status.to_string(),
        }
    }

    /// record a deliberate stop; whatever status the kill produced, the
    /// termination was requested and is clean by definition.
    fn stopped(status: ExitStatus) -> Self {
        Self {
            clean: true,
            description: status.to_string(),
        }
    }
}

struct Inner {
    state: EngineState,
    child: Option<Child>,
    last_error: Option<String>,
    last_exit: Option<ExitResult>,
}

/// supervises one proxy engine child process.
///
/// cheap to clone; clones share the same child. applying a new
/// configuration while running is a stop/rewrite/start cycle - the
/// engine has no live-reload path.
#[derive(Clone)]
pub struct EngineSupervisor {
    config: EngineConfig,
    launch_args: Arc<Vec<String>>,
    inner: Arc<Mutex<Inner>>,
}

impl EngineSupervisor {
    /// create a supervisor for the engine described by `config`.
    pub fn new(config: EngineConfig) -> Self {
        let config_path = config.config_path.to_string_lossy().into_owned();
        Self::with_launch_args(config, vec!["run".to_string(), "-c".to_string(), config_path])
    }

    /// create a supervisor with explicit launch arguments instead of
    /// the engine's default `run -c <config>` invocation.
    pub fn with_launch_args(config: EngineConfig, launch_args: Vec<String>) -> Self {
        Self {
            config,
            launch_args: Arc::new(launch_args),
            inner: Arc::new(Mutex::new(Inner {
                state: EngineState::Stopped,
                child: None,
                last_error: None,
                last_exit: None,
            })),
        }
    }

    /// write the configuration document and start the engine.
    pub async fn start(&self, document: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        poll_child(&mut inner);
        if inner.state == EngineState::Running {
            return Err(Error::AlreadyRunning);
        }

        inner.state = EngineState::Starting;
        inner.last_error = None;

        if let Err(e) = self.write_config(document).await {
            inner.state = EngineState::Stopped;
            inner.last_error = Some(e.to_string());
            return Err(e);
        }

        let mut command = Command::new(&self.config.binary_path);
        command
            .args(self.launch_args.iter())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        match command.spawn() {
            Ok(child) => {
                info!(binary = %self.config.binary_path.display(), "engine started");
                inner.child = Some(child);
                inner.state = EngineState::Running;
                Ok(())
            }
            Err(e) => {
                inner.state = EngineState::Stopped;
                inner.last_error = Some(e.to_string());
                Err(Error::Spawn(e))
            }
        }
    }

    /// stop the engine and wait for the child to exit.
    pub async fn stop(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        poll_child(&mut inner);

        let Some(mut child) = inner.child.take() else {
            return Err(Error::NotRunning);
        };
        inner.state = EngineState::Stopping;

        // the child may have exited between poll and kill
        if let Err(e) = child.start_kill() {
            debug!(error = %e, "kill signal failed, child likely already gone");
        }
        let status = child.wait().await?;

        inner.last_exit = Some(ExitResult::stopped(status));
        inner.state = EngineState::Stopped;
        info!("engine stopped");
        Ok(())
    }

    /// apply a new configuration document.
    ///
    /// while running this is a stop/rewrite/start cycle; otherwise it
    /// simply starts the engine with the new document.
    pub async fn apply(&self, document: &str) -> Result<()> {
        match self.stop().await {
            Ok(()) | Err(Error::NotRunning) => {}
            Err(e) => return Err(e),
        }
        self.start(document).await
    }

    /// whether the child process is currently alive.
    ///
    /// polls the child, so an engine that crashed since the last call is
    /// detected here.
    pub async fn is_running(&self) -> bool {
        let mut inner = self.inner.lock().await;
        poll_child(&mut inner);
        inner.state == EngineState::Running
    }

    /// current lifecycle state.
    pub async fn state(&self) -> EngineState {
        let mut inner = self.inner.lock().await;
        poll_child(&mut inner);
        inner.state
    }

    /// the most recent error (spawn failure or crash), if any.
    pub async fn last_error(&self) -> Option<String> {
        let mut inner = self.inner.lock().await;
        poll_child(&mut inner);
        inner.last_error.clone()
    }

    /// the most recent exit result, with platform masking applied.
    pub async fn last_exit_result(&self) -> Option<ExitResult> {
        let mut inner = self.inner.lock().await;
        poll_child(&mut inner);
        inner.last_exit.clone()
    }

    async fn write_config(&self, document: &str) -> Result<()> {
        if let Some(parent) = self.config.config_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(Error::WriteConfig)?;
        }
        tokio::fs::write(&self.config.config_path, document)
            .await
            .map_err(Error::WriteConfig)
    }
}

/// reap an exited child, classifying the termination.
fn poll_child(inner: &mut Inner) {
    if inner.state != EngineState::Running {
        return;
    }
    let Some(child) = inner.child.as_mut() else {
        inner.state = EngineState::Stopped;
        return;
    };

    match child.try_wait() {
        Ok(None) => {}
        Ok(Some(status)) => {
            let result = ExitResult::from_status(status);
            inner.child = None;
            if result.clean {
                inner.state = EngineState::Stopped;
            } else {
                warn!(status = %result.description, "engine exited unexpectedly");
                inner.last_error = Some(format!("engine exited: {}", result.description));
                inner.state = EngineState::Crashed;
            }
            inner.last_exit = Some(result);
        }
        Err(e) => {
            warn!(error = %e, "failed to poll engine process");
        }
    }
}
