use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use super::{Filter, RecordStore, StoreError};
use crate::models::{ClientRecord, NewClientRecord};

/// Process-local store; contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<ClientRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn query(&self, filter: &Filter) -> Result<Vec<ClientRecord>, StoreError> {
        Ok(self
            .records
            .read()
            .iter()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect())
    }

    async fn insert(&self, record: &NewClientRecord) -> Result<(), StoreError> {
        self.records.write().push(record.clone().into_record(Utc::now()));
        Ok(())
    }
}
