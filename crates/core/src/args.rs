//! Daemon argument construction

use crate::config::{DhtMode, NodeConfig};
use crate::paths;

/// Translate a node configuration into the daemon's argument list.
///
/// The order is fixed: dht flag, bootstrap flags, then the conn-manager
/// group with `-sock` closing it. The daemon's flag parser is
/// order-sensitive within that group, so this must not be reshuffled.
pub fn daemon_args(config: &NodeConfig) -> Vec<String> {
    let mut args = Vec::new();

    match config.dht_mode {
        DhtMode::Full => args.push("-dht".to_string()),
        DhtMode::Client => args.push("-dhtClient".to_string()),
        DhtMode::Off => {}
    }

    if config.bootstrap {
        args.push("-b".to_string());
    }

    if !config.bootstrap_peers.is_empty() {
        args.push("-bootstrapPeers".to_string());
        args.push(config.bootstrap_peers.clone());
    }

    if let Some(cm) = &config.conn_manager {
        args.push("-connManager".to_string());

        if let Some(grace) = cm.grace_period {
            args.push("-connGrace".to_string());
            args.push(grace.to_string());
        }

        if let Some(high) = cm.high_watermark {
            args.push("-connHi".to_string());
            args.push(high.to_string());
        }

        if let Some(low) = cm.low_watermark {
            args.push("-connLo".to_string());
            args.push(low.to_string());
        }

        args.push("-sock".to_string());
        args.push(
            paths::control_socket_path(&config.dir)
                .to_string_lossy()
                .into_owned(),
        );
    }

    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnManagerConfig;

    #[test]
    fn test_dht_full_bootstrap_peers() {
        let mut config = NodeConfig::new("p2pd", "/n1");
        config.dht_mode = DhtMode::Full;
        config.bootstrap = true;
        config.bootstrap_peers = "p1,p2".to_string();

        assert_eq!(
            daemon_args(&config),
            vec!["-dht", "-b", "-bootstrapPeers", "p1,p2"]
        );
    }

    #[test]
    fn test_dht_client_flag() {
        let mut config = NodeConfig::new("p2pd", "/n1");
        config.dht_mode = DhtMode::Client;
        assert_eq!(daemon_args(&config), vec!["-dhtClient"]);
    }

    #[test]
    fn test_dht_off_emits_nothing() {
        let config = NodeConfig::new("p2pd", "/n1");
        assert!(daemon_args(&config).is_empty());
    }

    #[test]
    fn test_conn_manager_group_order_and_sock_last() {
        let mut config = NodeConfig::new("p2pd", "/n1");
        config.conn_manager = Some(ConnManagerConfig {
            low_watermark: Some(10),
            high_watermark: Some(50),
            grace_period: Some(30),
        });

        assert_eq!(
            daemon_args(&config),
            vec![
                "-connManager",
                "-connGrace",
                "30",
                "-connHi",
                "50",
                "-connLo",
                "10",
                "-sock",
                "/n1/p2pd.sock",
            ]
        );
    }

    #[test]
    fn test_conn_manager_unset_fields_are_skipped() {
        let mut config = NodeConfig::new("p2pd", "/n1");
        config.conn_manager = Some(ConnManagerConfig {
            high_watermark: Some(50),
            ..Default::default()
        });

        assert_eq!(
            daemon_args(&config),
            vec!["-connManager", "-connHi", "50", "-sock", "/n1/p2pd.sock"]
        );
    }

    #[test]
    fn test_no_conn_manager_no_sock_flag() {
        let mut config = NodeConfig::new("p2pd", "/n1");
        config.bootstrap = true;
        assert_eq!(daemon_args(&config), vec!["-b"]);
    }
}
