//! Supervised daemon node

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use libp2p::Multiaddr;
use tracing::debug;

use swarmbed_core::{daemon_args, paths, NodeConfig};

use crate::handle::ClientHandle;
use crate::process::DaemonSupervisor;
use crate::Result;

/// Implementation kind reported by [`Node::kind`].
pub const NODE_KIND: &str = "p2pd";

/// Capability contract a supervised node exposes to its peers.
///
/// Both sides of a pairwise connect speak this interface, so any two
/// implementations can be introduced to each other.
#[async_trait]
pub trait SwarmNode: Send + Sync {
    /// The daemon-assigned peer identity.
    async fn peer_id(&self) -> Result<String>;

    /// Address of the node's control API.
    async fn api_addr(&self) -> Result<String>;

    /// The daemon's reachable swarm addresses.
    async fn swarm_addrs(&self) -> Result<Vec<String>>;

    /// Introduce this node to `remote` as a network peer.
    async fn connect(&self, remote: &dyn SwarmNode) -> Result<()>;
}

/// A supervised p2pd daemon plus its control-plane client.
pub struct Node {
    config: NodeConfig,
    supervisor: DaemonSupervisor,
    clients: ClientHandle,
}

impl Node {
    /// Node over `config`, not yet started.
    pub fn new(config: NodeConfig) -> Self {
        let supervisor = DaemonSupervisor::new(&config.dir);
        let clients = ClientHandle::new(&config.dir);
        Self {
            config,
            supervisor,
            clients,
        }
    }

    /// Node from a string attribute map (see [`NodeConfig::from_attrs`]).
    pub fn from_attrs(dir: impl Into<PathBuf>, attrs: &HashMap<String, String>) -> Result<Self> {
        Ok(Self::new(NodeConfig::from_attrs(dir, attrs)?))
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Node working directory.
    pub fn dir(&self) -> &Path {
        &self.config.dir
    }

    pub fn is_running(&self) -> bool {
        self.supervisor.is_running()
    }

    pub fn pid(&self) -> Option<u32> {
        self.supervisor.pid()
    }

    /// Implementation kind identifier.
    pub fn kind(&self) -> &'static str {
        NODE_KIND
    }

    /// Start the daemon. `extra_args` are appended verbatim after the
    /// configuration-derived argument list.
    pub async fn start(&mut self, wait: bool, extra_args: &[String]) -> Result<u32> {
        let mut args = daemon_args(&self.config);
        args.extend_from_slice(extra_args);
        self.supervisor
            .start(&self.config.command, &args, wait)
            .await
    }

    /// Stop the node: tear the control client down first, then drive the
    /// daemon through signal escalation. No control-plane call can race a
    /// process that is being killed.
    pub async fn stop(&mut self) -> Result<()> {
        self.clients.close().await?;
        self.supervisor.stop().await
    }

    /// Human-readable identity: `p2pd{<peer-id-prefix>}` when the daemon
    /// answers, the bare kind otherwise.
    pub async fn describe(&self) -> String {
        match self.peer_id().await {
            Ok(peer_id) => {
                let prefix: String = peer_id.chars().take(12).collect();
                format!("{}{{{}}}", NODE_KIND, prefix)
            }
            Err(_) => NODE_KIND.to_string(),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", NODE_KIND, self.config.dir.display())
    }
}

#[async_trait]
impl SwarmNode for Node {
    async fn peer_id(&self) -> Result<String> {
        let mut client = self.clients.acquire().await?;
        let identity = client.identify().await?;
        Ok(identity.peer_id)
    }

    async fn api_addr(&self) -> Result<String> {
        Ok(paths::control_socket_path(&self.config.dir)
            .to_string_lossy()
            .into_owned())
    }

    async fn swarm_addrs(&self) -> Result<Vec<String>> {
        let mut client = self.clients.acquire().await?;
        let identity = client.identify().await?;
        Ok(identity.addrs)
    }

    /// Acquires the local control client, fetches the remote's identity,
    /// keeps the addresses that parse as multiaddrs, and issues a single
    /// connect request. A malformed address is skipped, not fatal; an
    /// empty surviving list is still sent.
    async fn connect(&self, remote: &dyn SwarmNode) -> Result<()> {
        let mut client = self.clients.acquire().await?;

        let peer = remote.peer_id().await?;
        let addr_strs = remote.swarm_addrs().await?;

        let mut addrs = Vec::with_capacity(addr_strs.len());
        for raw in &addr_strs {
            match raw.parse::<Multiaddr>() {
                Ok(addr) => addrs.push(addr.to_string()),
                Err(err) => debug!("skipping unparseable swarm address {:?}: {}", raw, err),
            }
        }

        client.connect_peer(&peer, &addrs).await?;
        Ok(())
    }
}
