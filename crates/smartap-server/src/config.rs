//! Server configuration

use serde::Deserialize;
use std::path::PathBuf;

/// Runtime configuration, typically filled from CLI flags.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Listen port. The firmware dials port 443 with no way to change it,
    /// so production deployments either bind 443 or NAT-redirect to it.
    #[serde(default = "default_port")]
    pub port: u16,

    /// PEM certificate chain path
    pub cert_path: PathBuf,

    /// PEM private key path
    pub key_path: PathBuf,

    /// Directory for JSONL traffic captures; disabled when unset
    #[serde(default)]
    pub analysis_dir: Option<PathBuf>,
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    smartap_core::DEFAULT_PORT
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_minimal_json() {
        let cfg: ServerConfig = serde_json::from_str(
            r#"{"cert_path": "/etc/smartap/cert.pem", "key_path": "/etc/smartap/key.pem"}"#,
        )
        .unwrap();
        assert_eq!(cfg.addr(), "0.0.0.0:443");
        assert!(cfg.analysis_dir.is_none());
    }
}
