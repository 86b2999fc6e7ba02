//! Control client implementation

use std::path::{Path, PathBuf};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufStream};
use tokio::net::{UnixListener, UnixStream};
use tracing::debug;

use crate::protocol::{ConnectParams, IdentifyResult, RpcRequest, RpcResponse};
use crate::{ControlError, Result};

/// Control-plane client bound to a daemon's control socket.
///
/// Holds one live connection for its whole lifetime, plus a private
/// listening socket the daemon can open callback streams on. Requests are
/// serialized by the `&mut self` receivers; callers that share a client
/// wrap it in a lock.
pub struct ControlClient {
    stream: BufStream<UnixStream>,
    /// Kept bound until close so the callback path stays reserved.
    listener: UnixListener,
    listen_path: PathBuf,
    request_id: u64,
}

impl ControlClient {
    /// Connect to the daemon's control socket and bind the private
    /// client-side callback socket next to it.
    pub async fn connect(control_path: &Path, listen_path: &Path) -> Result<Self> {
        let stream = UnixStream::connect(control_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound
                || e.kind() == std::io::ErrorKind::ConnectionRefused
            {
                ControlError::DaemonNotRunning
            } else {
                ControlError::ConnectionFailed(e.to_string())
            }
        })?;

        let listener = UnixListener::bind(listen_path)
            .map_err(|e| ControlError::ConnectionFailed(e.to_string()))?;

        debug!("control client connected to {}", control_path.display());

        Ok(Self {
            stream: BufStream::new(stream),
            listener,
            listen_path: listen_path.to_path_buf(),
            request_id: 0,
        })
    }

    fn next_id(&mut self) -> u64 {
        self.request_id += 1;
        self.request_id
    }

    /// Send one JSON-RPC request and wait for its response line.
    async fn send_request(
        &mut self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value> {
        let request = RpcRequest::new(method, params, self.next_id());
        let request_json = serde_json::to_string(&request)?;
        debug!("sending request: {}", request_json);

        self.stream.write_all(request_json.as_bytes()).await?;
        self.stream.write_all(b"\n").await?;
        self.stream.flush().await?;

        let mut response_str = String::new();
        self.stream.read_line(&mut response_str).await?;
        if response_str.is_empty() {
            return Err(ControlError::ConnectionFailed(
                "daemon closed the control connection".to_string(),
            ));
        }
        debug!("received response: {}", response_str.trim());

        let response: RpcResponse = serde_json::from_str(&response_str)
            .map_err(|e| ControlError::InvalidResponse(e.to_string()))?;

        if let Some(error) = response.error {
            return Err(ControlError::Daemon {
                code: error.code,
                message: error.message,
            });
        }

        Ok(response.result.unwrap_or(serde_json::Value::Null))
    }

    /// Query the daemon's identity: its peer id and swarm addresses.
    pub async fn identify(&mut self) -> Result<IdentifyResult> {
        let result = self.send_request("identify", None).await?;
        serde_json::from_value(result).map_err(|e| ControlError::InvalidResponse(e.to_string()))
    }

    /// Ask the daemon to dial a peer at the given addresses.
    pub async fn connect_peer(&mut self, peer: &str, addrs: &[String]) -> Result<()> {
        let params = ConnectParams {
            peer: peer.to_string(),
            addrs: addrs.to_vec(),
        };
        self.send_request("connect", Some(serde_json::to_value(params)?))
            .await?;
        Ok(())
    }

    /// Path of the private callback socket this client is bound to.
    pub fn listen_path(&self) -> &Path {
        &self.listen_path
    }

    /// Shut the connection down and unlink the callback socket.
    pub async fn close(mut self) -> Result<()> {
        self.stream.shutdown().await?;
        drop(self.listener);
        let _ = std::fs::remove_file(&self.listen_path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::{AsyncWriteExt, BufReader};
    use tokio::net::UnixListener;

    /// Accept one connection and answer every request line with `response`
    /// (echoing the request id back).
    fn serve_one(listener: UnixListener, response: serde_json::Value) {
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (reader, mut writer) = stream.into_split();
            let mut lines = BufReader::new(reader).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let request: serde_json::Value = serde_json::from_str(&line).unwrap();
                let mut response = response.clone();
                response["id"] = request["id"].clone();
                writer
                    .write_all(format!("{}\n", response).as_bytes())
                    .await
                    .unwrap();
            }
        });
    }

    #[tokio::test]
    async fn test_connect_without_daemon_socket() {
        let dir = tempfile::tempdir().unwrap();
        let err = ControlClient::connect(
            &dir.path().join("p2pd.sock"),
            &dir.path().join("p2pclient.sock"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ControlError::DaemonNotRunning));
    }

    #[tokio::test]
    async fn test_identify_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let control = dir.path().join("p2pd.sock");
        let listener = UnixListener::bind(&control).unwrap();
        serve_one(
            listener,
            serde_json::json!({
                "jsonrpc": "2.0",
                "result": {
                    "peer_id": "QmPeer",
                    "addrs": ["/ip4/127.0.0.1/tcp/4001"],
                },
            }),
        );

        let mut client = ControlClient::connect(&control, &dir.path().join("p2pclient.sock"))
            .await
            .unwrap();
        let identity = client.identify().await.unwrap();
        assert_eq!(identity.peer_id, "QmPeer");
        assert_eq!(identity.addrs, vec!["/ip4/127.0.0.1/tcp/4001"]);
    }

    #[tokio::test]
    async fn test_daemon_error_is_surfaced() {
        let dir = tempfile::tempdir().unwrap();
        let control = dir.path().join("p2pd.sock");
        let listener = UnixListener::bind(&control).unwrap();
        serve_one(
            listener,
            serde_json::json!({
                "jsonrpc": "2.0",
                "error": {"code": -32601, "message": "Method not found"},
            }),
        );

        let mut client = ControlClient::connect(&control, &dir.path().join("p2pclient.sock"))
            .await
            .unwrap();
        let err = client.identify().await.unwrap_err();
        assert!(matches!(err, ControlError::Daemon { code: -32601, .. }));
    }

    #[tokio::test]
    async fn test_close_unlinks_callback_socket() {
        let dir = tempfile::tempdir().unwrap();
        let control = dir.path().join("p2pd.sock");
        let listener = UnixListener::bind(&control).unwrap();
        serve_one(listener, serde_json::json!({"jsonrpc": "2.0", "result": null}));

        let listen_path = dir.path().join("p2pclient.sock");
        let client = ControlClient::connect(&control, &listen_path).await.unwrap();
        assert!(listen_path.exists());

        client.close().await.unwrap();
        assert!(!listen_path.exists());
    }
}
