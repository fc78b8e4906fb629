use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::io::eth2can::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_CHUNK_SIZE};
use crate::io::{CanFilter, IoError};

/// Connection settings for one eth2can adapter.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Eth2CanConfig {
    pub host: String,
    pub port: u16,
    /// Handed to the bus layer unmodified
    #[serde(default)]
    pub can_filters: Vec<CanFilter>,
    #[serde(default = "default_connect_timeout_sec")]
    pub connect_timeout_sec: f64,
    #[serde(default = "default_read_chunk_size")]
    pub read_chunk_size: usize,
    /// Zero-pad outbound data to the full 8-byte field
    #[serde(default = "default_pad_payload")]
    pub pad_payload: bool,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_connect_timeout_sec() -> f64 {
    DEFAULT_CONNECT_TIMEOUT.as_secs_f64()
}
fn default_read_chunk_size() -> usize {
    DEFAULT_READ_CHUNK_SIZE
}
fn default_pad_payload() -> bool {
    true
}

impl Eth2CanConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            can_filters: Vec::new(),
            connect_timeout_sec: default_connect_timeout_sec(),
            read_chunk_size: default_read_chunk_size(),
            pad_payload: default_pad_payload(),
            verbose: false,
            log_dir: None,
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, IoError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| IoError::configuration(format!("Failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), IoError> {
        if self.host.trim().is_empty() {
            return Err(IoError::configuration("host must not be empty"));
        }
        if self.port == 0 {
            return Err(IoError::configuration("port must not be 0"));
        }
        if !self.connect_timeout_sec.is_finite() || self.connect_timeout_sec <= 0.0 {
            return Err(IoError::configuration(format!(
                "connect_timeout_sec must be positive, got {}",
                self.connect_timeout_sec
            )));
        }
        if self.read_chunk_size == 0 {
            return Err(IoError::configuration("read_chunk_size must be at least 1"));
        }
        Ok(())
    }

    /// Upper bound for the connect retry loop
    pub fn connect_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.connect_timeout_sec).unwrap_or(DEFAULT_CONNECT_TIMEOUT)
    }
}

/// Load and validate a TOML configuration file.
pub fn load_config(path: &Path) -> Result<Eth2CanConfig, IoError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        IoError::configuration(format!("Failed to read {}: {}", path.display(), e))
    })?;
    Eth2CanConfig::from_toml_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_minimal_toml() {
        let config = Eth2CanConfig::from_toml_str(
            r#"
host = "192.168.1.10"
port = 4001
"#,
        )
        .unwrap();

        assert_eq!(config, Eth2CanConfig::new("192.168.1.10", 4001));
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.read_chunk_size, 1024);
        assert!(config.pad_payload);
    }

    #[test]
    fn test_full_toml_with_filters() {
        let config = Eth2CanConfig::from_toml_str(
            r#"
host = "adapter.local"
port = 20001
connect_timeout_sec = 2.5
read_chunk_size = 256
pad_payload = false
verbose = true
log_dir = "/tmp/eth2can"

[[can_filters]]
can_id = 0x100
can_mask = 0x7F0

[[can_filters]]
can_id = 0x18
can_mask = 0xFF
extended = false
"#,
        )
        .unwrap();

        assert_eq!(config.connect_timeout(), Duration::from_millis(2500));
        assert_eq!(config.read_chunk_size, 256);
        assert!(!config.pad_payload);
        assert!(config.verbose);
        assert_eq!(config.log_dir, Some(PathBuf::from("/tmp/eth2can")));
        assert_eq!(config.can_filters.len(), 2);
        assert_eq!(config.can_filters[0].can_id, 0x100);
        assert_eq!(config.can_filters[1].extended, Some(false));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = Eth2CanConfig::new("h", 1);
        config.connect_timeout_sec = 0.0;
        assert!(matches!(config.validate(), Err(IoError::Configuration(_))));

        assert!(Eth2CanConfig::new("", 1).validate().is_err());
        assert!(Eth2CanConfig::new("h", 0).validate().is_err());

        let mut config = Eth2CanConfig::new("h", 1);
        config.read_chunk_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_host_is_parse_error() {
        let err = Eth2CanConfig::from_toml_str("port = 1").unwrap_err();
        assert!(err.to_string().contains("Failed to parse TOML"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config(Path::new("/nonexistent/eth2can.toml")).unwrap_err();
        assert!(matches!(err, IoError::Configuration(_)));
    }
}
