//! On-disk layout of a node directory.
//!
//! Every file the harness or the daemon touches lives directly under the
//! node's working directory; these helpers are the single source of truth
//! for the names.

use std::path::{Path, PathBuf};

/// Control socket the daemon listens on once it is ready.
pub fn control_socket_path(dir: &Path) -> PathBuf {
    dir.join("p2pd.sock")
}

/// Private socket the control client binds for daemon callbacks.
pub fn client_socket_path(dir: &Path) -> PathBuf {
    dir.join("p2pclient.sock")
}

/// Pid file written on start and removed on stop.
pub fn pid_path(dir: &Path) -> PathBuf {
    dir.join("p2pd.pid")
}

/// Redirected stdout of the daemon process.
pub fn stdout_path(dir: &Path) -> PathBuf {
    dir.join("p2pd.stdout")
}

/// Redirected stderr of the daemon process.
pub fn stderr_path(dir: &Path) -> PathBuf {
    dir.join("p2pd.stderr")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_is_flat_under_dir() {
        let dir = Path::new("/nodes/n1");
        assert_eq!(control_socket_path(dir), Path::new("/nodes/n1/p2pd.sock"));
        assert_eq!(client_socket_path(dir), Path::new("/nodes/n1/p2pclient.sock"));
        assert_eq!(pid_path(dir), Path::new("/nodes/n1/p2pd.pid"));
        assert_eq!(stdout_path(dir), Path::new("/nodes/n1/p2pd.stdout"));
        assert_eq!(stderr_path(dir), Path::new("/nodes/n1/p2pd.stderr"));
    }
}
