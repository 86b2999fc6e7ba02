use std::num::ParseIntError;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("conn manager {field} provided without enabling conn manager")]
    ConnManagerNotEnabled { field: &'static str },

    #[error("parsing {field}: {source}")]
    InvalidNumber {
        field: &'static str,
        #[source]
        source: ParseIntError,
    },

    #[error("unknown dht mode: {0}")]
    UnknownDhtMode(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_conn_manager_not_enabled() {
        let err = ConfigError::ConnManagerNotEnabled {
            field: "low watermark",
        };
        assert_eq!(
            err.to_string(),
            "conn manager low watermark provided without enabling conn manager"
        );
    }

    #[test]
    fn test_error_display_unknown_dht_mode() {
        let err = ConfigError::UnknownDhtMode("server".to_string());
        assert_eq!(err.to_string(), "unknown dht mode: server");
    }

    #[test]
    fn test_invalid_number_keeps_source() {
        let source = "ten".parse::<u32>().unwrap_err();
        let err = ConfigError::InvalidNumber {
            field: "grace period",
            source,
        };
        assert!(err.to_string().starts_with("parsing grace period:"));
    }
}
