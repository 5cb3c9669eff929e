//! Record store abstraction over the single table of client records.
//!
//! The search and import services only ever talk to [`RecordStore`]; which
//! backend sits behind it is decided once at startup by [`connect`].

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{Config, StoreBackend};
use crate::models::{ClientRecord, NewClientRecord};

pub mod memory;
pub mod postgrest;
pub mod sqlite;

pub use memory::MemoryStore;
pub use postgrest::PostgrestStore;
pub use sqlite::SqliteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),
    #[error("request to record store failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("record store rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("could not encode or decode a stored record: {0}")]
    Codec(String),
}

/// Record fields that filters can address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Identifier,
    Name,
}

impl Field {
    pub fn column(self) -> &'static str {
        match self {
            Field::Identifier => "cpf",
            Field::Name => "name",
        }
    }

    pub fn value_of(self, record: &ClientRecord) -> &str {
        match self {
            Field::Identifier => &record.identifier,
            Field::Name => &record.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    All,
    /// Exact, case-sensitive equality.
    Equals { field: Field, value: String },
    /// Case-insensitive substring containment.
    Contains { field: Field, value: String },
}

impl Filter {
    pub fn matches(&self, record: &ClientRecord) -> bool {
        match self {
            Filter::All => true,
            Filter::Equals { field, value } => field.value_of(record) == value,
            Filter::Contains { field, value } => {
                fold_case(field.value_of(record)).contains(&fold_case(value))
            }
        }
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn query(&self, filter: &Filter) -> Result<Vec<ClientRecord>, StoreError>;

    async fn insert(&self, record: &NewClientRecord) -> Result<(), StoreError>;
}

/// Opens the backend named in the configuration.
pub async fn connect(config: &Config) -> Result<Arc<dyn RecordStore>, StoreError> {
    tracing::info!("Connecting to record store: {:?}", config.backend);
    let store: Arc<dyn RecordStore> = match &config.backend {
        StoreBackend::Sqlite { path } => Arc::new(SqliteStore::open(path, &config.table).await?),
        StoreBackend::Supabase { url, key } => {
            Arc::new(PostgrestStore::new(url, key, &config.table))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory record store; records are lost on shutdown");
            Arc::new(MemoryStore::new())
        }
    };
    Ok(store)
}

pub(crate) fn fold_case(value: &str) -> String {
    value.to_lowercase()
}
