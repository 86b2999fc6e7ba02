//! Daemon process lifecycle

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::time;
use tracing::{debug, info, warn};

use swarmbed_core::paths;

use crate::{NodeError, Result};

/// Interval between readiness probes of the control socket.
const READY_POLL_INTERVAL: Duration = Duration::from_millis(400);

/// Number of readiness probes before giving up (~20s total).
const READY_ATTEMPTS: u32 = 50;

/// How long each escalation step waits for the process to exit.
const EXIT_WAIT: Duration = Duration::from_secs(5);

/// Supervises at most one live daemon process.
///
/// `start` and `stop` take `&mut self`: lifecycle transitions have a
/// single owner and never run concurrently.
pub struct DaemonSupervisor {
    dir: PathBuf,
    child: Option<Child>,
}

impl DaemonSupervisor {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            child: None,
        }
    }

    /// Directory the daemon runs in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_running(&self) -> bool {
        self.child.is_some()
    }

    /// Pid of the live process, if any.
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(|child| child.id())
    }

    /// Spawn the daemon and optionally wait for its control socket.
    ///
    /// Stdout and stderr are redirected into log files in the node
    /// directory and the pid is recorded in the pid file. With `wait`,
    /// the control socket path is polled at a fixed interval; if it never
    /// appears the call fails but the process stays registered, so the
    /// caller must `stop` before trying again. The poll loop consults no
    /// cancellation signal; the bounded attempt count is the only exit
    /// besides success.
    pub async fn start(&mut self, command: &Path, args: &[String], wait: bool) -> Result<u32> {
        if let Some(child) = &self.child {
            return Err(NodeError::AlreadyRunning(child.id().unwrap_or(0)));
        }

        let stdout =
            std::fs::File::create(paths::stdout_path(&self.dir)).map_err(NodeError::Spawn)?;
        let stderr =
            std::fs::File::create(paths::stderr_path(&self.dir)).map_err(NodeError::Spawn)?;

        let child = Command::new(command)
            .args(args)
            .current_dir(&self.dir)
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .spawn()
            .map_err(NodeError::Spawn)?;

        let pid = child.id().ok_or_else(|| {
            NodeError::Spawn(std::io::Error::new(
                std::io::ErrorKind::Other,
                "process exited before its pid could be read",
            ))
        })?;

        // Register before touching the pid file, so even a write failure
        // leaves the process reachable through stop().
        self.child = Some(child);

        std::fs::write(paths::pid_path(&self.dir), pid.to_string())?;
        info!("started daemon {} with pid {}", command.display(), pid);

        if wait {
            self.wait_ready(pid).await?;
        }

        Ok(pid)
    }

    async fn wait_ready(&self, pid: u32) -> Result<()> {
        let socket = paths::control_socket_path(&self.dir);
        for _ in 0..READY_ATTEMPTS {
            if socket.exists() {
                debug!("daemon pid {} is ready at {}", pid, socket.display());
                return Ok(());
            }
            time::sleep(READY_POLL_INTERVAL).await;
        }
        Err(NodeError::NotReady { pid })
    }

    /// Drive the process through escalating shutdown.
    ///
    /// An exit watcher is spawned before the first signal so an exit is
    /// observed no matter when it happens. Signals go out in the order
    /// TERM, TERM, QUIT, KILL; each step races the watcher against a
    /// timer and only a timeout advances to the next signal. A signal
    /// delivery failure aborts immediately with that error. The pid file
    /// is removed unconditionally once the escalation has run.
    ///
    /// Stopping when nothing is live is a no-op.
    pub async fn stop(&mut self) -> Result<()> {
        let mut child = match self.child.take() {
            Some(child) => child,
            None => return Ok(()),
        };

        let Some(pid) = child.id() else {
            // Already reaped; nothing left to signal.
            let _ = std::fs::remove_file(paths::pid_path(&self.dir));
            return Ok(());
        };

        let (exit_tx, mut exit_rx) = mpsc::channel(1);
        tokio::spawn(async move {
            let status = child.wait().await;
            debug!("daemon exited: {:?}", status);
            let _ = exit_tx.send(()).await;
        });

        let result = escalate(pid, &mut exit_rx).await;

        let _ = std::fs::remove_file(paths::pid_path(&self.dir));

        match &result {
            Ok(()) => info!("daemon pid {} stopped", pid),
            Err(err) => warn!("daemon pid {} did not shut down cleanly: {}", pid, err),
        }

        result
    }
}

/// TERM, TERM, QUIT, then KILL; a timeout on the final step is fatal.
async fn escalate(pid: u32, exited: &mut mpsc::Receiver<()>) -> Result<()> {
    for signal in [libc::SIGTERM, libc::SIGTERM, libc::SIGQUIT] {
        match signal_and_wait(pid, signal, exited).await {
            Err(NodeError::ShutdownTimeout) => continue,
            other => return other,
        }
    }
    signal_and_wait(pid, libc::SIGKILL, exited).await
}

/// Send `signal`, then race the exit notification against the step timer;
/// the first to fire wins.
async fn signal_and_wait(
    pid: u32,
    signal: libc::c_int,
    exited: &mut mpsc::Receiver<()>,
) -> Result<()> {
    send_signal(pid, signal)?;
    match time::timeout(EXIT_WAIT, exited.recv()).await {
        Ok(_) => Ok(()),
        Err(_) => Err(NodeError::ShutdownTimeout),
    }
}

fn send_signal(pid: u32, signal: libc::c_int) -> Result<()> {
    let rc = unsafe { libc::kill(pid as i32, signal) };
    if rc != 0 {
        return Err(NodeError::Signal(std::io::Error::last_os_error()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_running_before_start() {
        let supervisor = DaemonSupervisor::new("/n1");
        assert!(!supervisor.is_running());
        assert!(supervisor.pid().is_none());
    }

    #[tokio::test]
    async fn test_stop_without_start_is_a_noop() {
        let mut supervisor = DaemonSupervisor::new("/n1");
        supervisor.stop().await.unwrap();
        assert!(!supervisor.is_running());
    }

    #[tokio::test]
    async fn test_spawn_failure_registers_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut supervisor = DaemonSupervisor::new(dir.path());
        let err = supervisor
            .start(Path::new("/nonexistent/p2pd"), &[], false)
            .await
            .unwrap_err();
        assert!(matches!(err, NodeError::Spawn(_)));
        assert!(!supervisor.is_running());
        assert!(!paths::pid_path(dir.path()).exists());
    }

    #[tokio::test]
    async fn test_start_writes_pid_file_and_stop_removes_it() {
        let dir = tempfile::tempdir().unwrap();
        let mut supervisor = DaemonSupervisor::new(dir.path());

        let pid = supervisor
            .start(Path::new("/bin/sleep"), &["1000".to_string()], false)
            .await
            .unwrap();

        let pid_file = paths::pid_path(dir.path());
        let recorded = std::fs::read_to_string(&pid_file).unwrap();
        assert_eq!(recorded, pid.to_string());
        assert!(paths::stdout_path(dir.path()).exists());
        assert!(paths::stderr_path(dir.path()).exists());

        supervisor.stop().await.unwrap();
        assert!(!pid_file.exists());
        assert!(!supervisor.is_running());
    }

    #[tokio::test]
    async fn test_start_while_running_fails_without_spawning() {
        let dir = tempfile::tempdir().unwrap();
        let mut supervisor = DaemonSupervisor::new(dir.path());

        let pid = supervisor
            .start(Path::new("/bin/sleep"), &["1000".to_string()], false)
            .await
            .unwrap();

        let err = supervisor
            .start(Path::new("/bin/sleep"), &["1000".to_string()], false)
            .await
            .unwrap_err();
        assert!(matches!(err, NodeError::AlreadyRunning(p) if p == pid));

        supervisor.stop().await.unwrap();
    }
}
