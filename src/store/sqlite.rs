use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::params_from_iter;
use tokio_rusqlite::Connection;
use tracing::{debug, error, info};

use super::{fold_case, Field, Filter, RecordStore, StoreError};
use crate::models::{ClientRecord, ContractDetails, NewClientRecord};

/// Client records in a local SQLite file.
///
/// Contract details are kept as JSON text. `name_folded` holds the lowercased
/// name so substring search is case-insensitive for non-ASCII names too.
pub struct SqliteStore {
    conn: Connection,
    table: String,
}

type RawRow = (String, String, String, String, String, String);

impl SqliteStore {
    pub async fn open(path: &Path, table: &str) -> Result<Self, StoreError> {
        info!("Opening SQLite record store at {}", path.display());
        let conn = Connection::open(path.to_path_buf()).await.map_err(|e| {
            error!("Failed to open SQLite database: {}", e);
            StoreError::Database(e.to_string())
        })?;
        Self::with_connection(conn, table).await
    }

    pub async fn open_in_memory(table: &str) -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Self::with_connection(conn, table).await
    }

    async fn with_connection(conn: Connection, table: &str) -> Result<Self, StoreError> {
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                cpf TEXT NOT NULL,
                name TEXT NOT NULL,
                name_folded TEXT NOT NULL,
                status TEXT NOT NULL,
                contract_details TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_{table}_cpf ON {table} (cpf);"
        );
        debug!("Create table SQL: {}", ddl);

        conn.call(move |conn| {
            conn.execute_batch(&ddl)?;
            Ok(())
        })
        .await
        .map_err(|e| {
            error!("Failed to create table: {}", e);
            StoreError::Database(e.to_string())
        })?;

        Ok(Self {
            conn,
            table: table.to_string(),
        })
    }
}

fn where_clause(filter: &Filter) -> (String, Option<String>) {
    match filter {
        Filter::All => (String::new(), None),
        Filter::Equals { field, value } => {
            (format!("WHERE {} = ?1", field.column()), Some(value.clone()))
        }
        Filter::Contains { field, value } => {
            let column = match field {
                Field::Identifier => "lower(cpf)",
                Field::Name => "name_folded",
            };
            // instr() rather than LIKE: no wildcard escaping, and '' matches every row
            (format!("WHERE instr({column}, ?1) > 0"), Some(fold_case(value)))
        }
    }
}

fn decode_row(row: RawRow) -> Result<ClientRecord, StoreError> {
    let (identifier, name, status, details, created_at, updated_at) = row;
    let contract_details: ContractDetails =
        serde_json::from_str(&details).map_err(|e| StoreError::Codec(e.to_string()))?;
    Ok(ClientRecord {
        identifier,
        name,
        status,
        contract_details,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreError::Codec(format!("bad timestamp {raw:?}: {e}")))
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn query(&self, filter: &Filter) -> Result<Vec<ClientRecord>, StoreError> {
        let (clause, param) = where_clause(filter);
        let sql = format!(
            "SELECT cpf, name, status, contract_details, created_at, updated_at \
             FROM {} {} ORDER BY id",
            self.table, clause
        );
        debug!("Query SQL: {}", sql);

        let rows: Vec<RawRow> = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params_from_iter(param.iter()), |row| {
                        Ok((
                            row.get(0)?,
                            row.get(1)?,
                            row.get(2)?,
                            row.get(3)?,
                            row.get(4)?,
                            row.get(5)?,
                        ))
                    })?
                    .collect::<Result<Vec<RawRow>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(|e| {
                error!("Failed to query client records: {}", e);
                StoreError::Database(e.to_string())
            })?;

        rows.into_iter().map(decode_row).collect()
    }

    async fn insert(&self, record: &NewClientRecord) -> Result<(), StoreError> {
        let details = serde_json::to_string(&record.contract_details)
            .map_err(|e| StoreError::Codec(e.to_string()))?;
        let sql = format!(
            "INSERT INTO {} \
             (cpf, name, name_folded, status, contract_details, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            self.table
        );
        let identifier = record.identifier.clone();
        let name = record.name.clone();
        let name_folded = fold_case(&record.name);
        let status = record.status.clone();
        let now = Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| {
                conn.execute(
                    &sql,
                    rusqlite::params![identifier, name, name_folded, status, details, now],
                )?;
                Ok(())
            })
            .await
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}
