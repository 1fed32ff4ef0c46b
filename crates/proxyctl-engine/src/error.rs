//! engine supervision error types.

use thiserror::Error;

/// errors that can occur while supervising the engine process.
#[derive(Debug, Error)]
pub enum Error {
    /// start was called while the engine is running.
    #[error("engine is already running")]
    AlreadyRunning,

    /// stop was called while the engine is not running.
    #[error("engine is not running")]
    NotRunning,

    /// the configuration document could not be written.
    #[error("failed to write engine config: {0}")]
    WriteConfig(#[source] std::io::Error),

    /// the engine binary could not be spawned.
    #[error("failed to spawn engine process: {0}")]
    Spawn(#[source] std::io::Error),

    /// other i/o failure while managing the child process.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// the stats query against the engine's control api failed.
    #[error("stats query failed: {0}")]
    Stats(#[from] reqwest::Error),
}
