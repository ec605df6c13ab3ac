use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use tracing::{info, warn};

/// Where the snapshot is kept between restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Json,
    Sqlite,
    Memory,
}

impl FromStr for StorageKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => bail!("unknown storage kind '{}' (expected json, sqlite or memory)", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub storage: StorageKind,
    pub data_path: PathBuf,
    pub sweep_interval: Duration,
    pub master_token: Option<String>,
    pub frontend_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let storage: StorageKind = parse_or(&lookup, "CLANDESTINE_STORAGE", StorageKind::Json)?;
        let default_path = match storage {
            StorageKind::Sqlite => "clandestine.db",
            StorageKind::Json | StorageKind::Memory => "clandestine.json",
        };

        let port = match lookup("CLANDESTINE_PORT").or_else(|| lookup("PORT")) {
            Some(raw) => raw
                .parse()
                .map_err(|e| anyhow!("invalid CLANDESTINE_PORT '{}': {}", raw, e))?,
            None => 3000,
        };

        let sweep_secs: u64 = parse_or(&lookup, "CLANDESTINE_SWEEP_INTERVAL_SECS", 300)?;
        if sweep_secs == 0 {
            bail!("CLANDESTINE_SWEEP_INTERVAL_SECS must be greater than zero");
        }

        let master_token = lookup("MASTER_INVITE_TOKEN").filter(|t| !t.is_empty());
        if master_token.is_none() {
            warn!("MASTER_INVITE_TOKEN is unset; invitation generation is disabled");
        }

        Ok(Self {
            host: lookup("CLANDESTINE_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            storage,
            data_path: lookup("CLANDESTINE_DATA_PATH")
                .unwrap_or_else(|| default_path.into())
                .into(),
            sweep_interval: Duration::from_secs(sweep_secs),
            master_token,
            // Browsers send the origin without a trailing slash.
            frontend_url: lookup("FRONTEND_URL")
                .map(|url| url.trim_end_matches('/').to_owned())
                .unwrap_or_else(|| "http://localhost:5173".into()),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow!("invalid {} '{}': {}", key, raw, e)),
        None => {
            info!("{} not set, using default: {}", key, default);
            Ok(default)
        }
    }
}

impl Display for StorageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::Sqlite => "sqlite",
            Self::Memory => "memory",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.storage, StorageKind::Json);
        assert_eq!(cfg.data_path, PathBuf::from("clandestine.json"));
        assert_eq!(cfg.sweep_interval, Duration::from_secs(300));
        assert_eq!(cfg.master_token, None);
        assert_eq!(cfg.frontend_url, "http://localhost:5173");
    }

    #[test]
    fn sqlite_gets_its_own_default_path() {
        let cfg = config(&[("CLANDESTINE_STORAGE", "SQLite")]).unwrap();
        assert_eq!(cfg.storage, StorageKind::Sqlite);
        assert_eq!(cfg.data_path, PathBuf::from("clandestine.db"));
    }

    #[test]
    fn port_falls_back_to_plain_port() {
        assert_eq!(config(&[("PORT", "8080")]).unwrap().port, 8080);
        let both = config(&[("PORT", "8080"), ("CLANDESTINE_PORT", "9090")]).unwrap();
        assert_eq!(both.port, 9090);
    }

    #[test]
    fn empty_master_token_counts_as_unset() {
        assert_eq!(config(&[("MASTER_INVITE_TOKEN", "")]).unwrap().master_token, None);
        assert_eq!(
            config(&[("MASTER_INVITE_TOKEN", "s3cret")]).unwrap().master_token.as_deref(),
            Some("s3cret")
        );
    }

    #[test]
    fn frontend_url_drops_trailing_slash() {
        let cfg = config(&[("FRONTEND_URL", "https://x.org/")]).unwrap();
        assert_eq!(cfg.frontend_url, "https://x.org");
    }

    #[test]
    fn rejects_bad_values() {
        assert!(config(&[("CLANDESTINE_PORT", "eighty")]).is_err());
        assert!(config(&[("CLANDESTINE_STORAGE", "postgres")]).is_err());
        assert!(config(&[("CLANDESTINE_SWEEP_INTERVAL_SECS", "0")]).is_err());
        assert!(config(&[("CLANDESTINE_SWEEP_INTERVAL_SECS", "-5")]).is_err());
    }
}
