//! Spawn two daemons in temporary directories, wait for them to come
//! online, introduce them to each other, then tear both down.
//!
//! Usage: `cargo run --example two_nodes -- /path/to/p2pd`

use std::path::Path;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use swarmbed_core::{DhtMode, NodeConfig};
use swarmbed_node::{Node, SwarmNode};

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,swarmbed=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

fn node(command: &str, dir: &Path) -> Node {
    let mut config = NodeConfig::new(command, dir);
    config.dht_mode = DhtMode::Client;
    Node::new(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let command = std::env::args()
        .nth(1)
        .context("usage: two_nodes <path-to-p2pd>")?;

    let dir_a = tempfile::tempdir()?;
    let dir_b = tempfile::tempdir()?;

    let mut a = node(&command, dir_a.path());
    let mut b = node(&command, dir_b.path());

    a.start(true, &[]).await?;
    b.start(true, &[]).await?;

    tracing::info!("node a: {}", a.describe().await);
    tracing::info!("node b: {}", b.describe().await);

    a.connect(&b).await?;
    tracing::info!("nodes connected");

    a.stop().await?;
    b.stop().await?;

    Ok(())
}
