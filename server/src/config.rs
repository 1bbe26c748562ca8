//! Server configuration — file, then `ARCHIVUM_`-prefixed environment,
//! then CLI flags (§6 "Config", extended with server-only keys per
//! SPEC_FULL §8).

use archivum_core::{ArchivumError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    pub database_url: String,
    pub bind_host: String,
    pub bind_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            database_url: "sqlite://archivum.db".to_string(),
            bind_host: "0.0.0.0".to_string(),
            bind_port: 8080,
        }
    }
}

impl ServerConfig {
    pub fn load(file: Option<&Path>) -> Result<ServerConfig> {
        let mut cfg = match file {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| ArchivumError::Io {
                    path: path.to_path_buf(),
                    source: e,
                })?;
                serde_yaml::from_str(&text)
                    .map_err(|e| ArchivumError::Config(format!("invalid config at {path:?}: {e}")))?
            }
            None => ServerConfig::default(),
        };
        cfg.apply_env();
        Ok(cfg)
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("ARCHIVUM_DATABASE_URL") {
            self.database_url = v;
        }
        if let Ok(v) = std::env::var("ARCHIVUM_BIND_HOST") {
            self.bind_host = v;
        }
        if let Ok(v) = std::env::var("ARCHIVUM_BIND_PORT") {
            if let Ok(p) = v.parse() {
                self.bind_port = p;
            }
        }
    }
}
