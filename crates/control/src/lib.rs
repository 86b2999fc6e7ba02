//! Swarmbed Control Client
//!
//! Control-plane client for a running daemon: line-delimited JSON-RPC 2.0
//! over the daemon's Unix control socket. One client owns one live
//! connection plus a private callback socket; mutual exclusion across
//! callers is handled a level up, by the node's client handle.

mod client;
mod protocol;

pub use client::ControlClient;
pub use protocol::{ConnectParams, IdentifyResult, RpcError, RpcRequest, RpcResponse};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ControlError {
    #[error("Daemon is not running")]
    DaemonNotRunning,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Daemon error {code}: {message}")]
    Daemon { code: i32, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ControlError>;
