//! Swarmbed Node
//!
//! Supervises an externally-launched p2pd daemon as a controllable node:
//! the process lifecycle (spawn, readiness wait, escalating shutdown), a
//! lazily-created mutually-exclusive control client, and peer-connection
//! orchestration between two supervised nodes.

mod handle;
mod node;
mod process;

pub use handle::{ClientGuard, ClientHandle};
pub use node::{Node, SwarmNode, NODE_KIND};
pub use process::DaemonSupervisor;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NodeError {
    #[error("daemon is already running (pid {0})")]
    AlreadyRunning(u32),

    #[error("failed to spawn daemon: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("daemon with pid {pid} failed to come online")]
    NotReady { pid: u32 },

    #[error("timed out waiting for process to exit")]
    ShutdownTimeout,

    #[error("failed to signal daemon: {0}")]
    Signal(#[source] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] swarmbed_core::ConfigError),

    #[error("Control client error: {0}")]
    Control(#[from] swarmbed_control::ControlError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, NodeError>;
