use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

use dotenvy::dotenv;
use thiserror::Error;

const DEFAULT_DATABASE_PATH: &str = "clients.db";
const DEFAULT_TABLE: &str = "clients";

fn default_max_file_size() -> usize {
    // 10 MB in bytes
    10 * 1024 * 1024
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load {0}: variable is not set")]
    Missing(&'static str),
    #[error("Invalid value {value:?} for {name}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Where client records live.
#[derive(Clone, PartialEq)]
pub enum StoreBackend {
    Sqlite { path: PathBuf },
    Supabase { url: String, key: String },
    Memory,
}

impl fmt::Debug for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Sqlite { path } => f.debug_struct("Sqlite").field("path", path).finish(),
            StoreBackend::Supabase { url, .. } => f
                .debug_struct("Supabase")
                .field("url", url)
                .finish_non_exhaustive(),
            StoreBackend::Memory => f.write_str("Memory"),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub max_file_size: usize,
    pub access_password: String,
    pub table: String,
    pub backend: StoreBackend,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_addr", &self.bind_addr)
            .field("max_file_size", &self.max_file_size)
            .field("table", &self.table)
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file first
        dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let access_password = var("DEMO_PASSWORD").ok_or(ConfigError::Missing("DEMO_PASSWORD"))?;

        let bind_addr = match var("BIND_ADDR") {
            Some(raw) => raw.trim().parse::<SocketAddr>().map_err(|e| {
                ConfigError::Invalid {
                    name: "BIND_ADDR",
                    value: raw.clone(),
                    reason: e.to_string(),
                }
            })?,
            None => SocketAddr::from(([127, 0, 0, 1], 8090)),
        };

        let max_file_size = match var("MAX_FILE_SIZE") {
            Some(raw) => raw.trim().parse::<usize>().map_err(|e| {
                ConfigError::Invalid {
                    name: "MAX_FILE_SIZE",
                    value: raw.clone(),
                    reason: e.to_string(),
                }
            })?,
            None => default_max_file_size(),
        };

        let table = var("CLIENTS_TABLE").unwrap_or_else(|| DEFAULT_TABLE.to_string());
        if !is_valid_table_name(&table) {
            return Err(ConfigError::Invalid {
                name: "CLIENTS_TABLE",
                value: table,
                reason: "expected letters, digits and underscores, not starting with a digit"
                    .to_string(),
            });
        }

        let backend = match var("STORE_BACKEND").as_deref().map(str::trim) {
            None | Some("sqlite") => StoreBackend::Sqlite {
                path: var("DATABASE_PATH")
                    .unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string())
                    .into(),
            },
            Some("supabase") => StoreBackend::Supabase {
                url: var("SUPABASE_URL").ok_or(ConfigError::Missing("SUPABASE_URL"))?,
                key: var("SUPABASE_KEY").ok_or(ConfigError::Missing("SUPABASE_KEY"))?,
            },
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "STORE_BACKEND",
                    value: other.to_string(),
                    reason: "expected one of sqlite, supabase, memory".to_string(),
                })
            }
        };

        Ok(Config {
            bind_addr,
            max_file_size,
            access_password,
            table,
            backend,
        })
    }
}

// Table names are spliced into SQL and REST paths, so only plain identifiers pass.
fn is_valid_table_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
