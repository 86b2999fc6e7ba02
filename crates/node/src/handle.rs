//! Lazily-created, mutually-exclusive control client

use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

use swarmbed_control::ControlClient;
use swarmbed_core::paths;

use crate::Result;

/// Shared slot for a node's control client.
///
/// One lock covers creation, use and teardown: acquirers serialize on the
/// mutex, and the first to find the slot empty connects the client. At
/// most one client ever exists per handle.
pub struct ClientHandle {
    control_path: PathBuf,
    listen_path: PathBuf,
    slot: Mutex<Option<ControlClient>>,
}

impl ClientHandle {
    /// Handle over the control socket layout under `dir`.
    pub fn new(dir: &Path) -> Self {
        Self {
            control_path: paths::control_socket_path(dir),
            listen_path: paths::client_socket_path(dir),
            slot: Mutex::new(None),
        }
    }

    /// Lock the slot, connecting the client first if none exists yet.
    ///
    /// The returned guard holds the lock until dropped, so every exit
    /// path of the caller releases it.
    pub async fn acquire(&self) -> Result<ClientGuard<'_>> {
        let mut slot = self.slot.lock().await;
        if slot.is_none() {
            debug!(
                "connecting control client at {}",
                self.control_path.display()
            );
            let client = ControlClient::connect(&self.control_path, &self.listen_path).await?;
            *slot = Some(client);
        }
        Ok(ClientGuard { slot })
    }

    /// Close and clear the client if one exists; idempotent otherwise.
    /// A close failure propagates.
    pub async fn close(&self) -> Result<()> {
        let mut slot = self.slot.lock().await;
        if let Some(client) = slot.take() {
            client.close().await?;
        }
        Ok(())
    }
}

/// Exclusive access to a node's control client; dropping it releases the
/// underlying lock.
pub struct ClientGuard<'a> {
    slot: MutexGuard<'a, Option<ControlClient>>,
}

impl Deref for ClientGuard<'_> {
    type Target = ControlClient;

    fn deref(&self) -> &ControlClient {
        self.slot
            .as_ref()
            .expect("guard is only built over a connected client")
    }
}

impl DerefMut for ClientGuard<'_> {
    fn deref_mut(&mut self) -> &mut ControlClient {
        self.slot
            .as_mut()
            .expect("guard is only built over a connected client")
    }
}
