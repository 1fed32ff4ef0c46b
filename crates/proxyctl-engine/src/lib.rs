//! proxy engine supervision for proxyctl nodes.
//!
//! this crate owns the lifecycle of one proxy engine child process:
//! - [`process`]: the supervisor state machine (start/stop/apply, crash
//!   detection, exit masking)
//! - [`stats`]: the traffic statistics client querying the engine's
//!   locally-bound control api
//!
//! the master never runs the engine itself; supervisors live on nodes
//! (or wherever the master directly operates one).

#![warn(missing_docs)]

mod error;
mod process;
mod stats;

pub use error::Error;
pub use process::{EngineState, EngineSupervisor, ExitResult};
pub use stats::{ClientTrafficStat, StatsClient, TrafficSnapshot};

/// result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;
