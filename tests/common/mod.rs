#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request},
    Router,
};
use serde_json::Value;

use old_contracts::{
    build_router,
    config::Config,
    logging,
    models::{ClientRecord, ContractDetails, NewClientRecord},
    services::auth::StaticSecret,
    store::{Filter, MemoryStore, RecordStore, StoreError},
    AppState,
};

pub const PASSWORD: &str = "ProCorpoCttsAntigos";
pub const BOUNDARY: &str = "old-contracts-test-boundary";

/// Memory store that counts every call made against it.
#[derive(Default)]
pub struct CountingStore {
    pub inner: MemoryStore,
    pub queries: AtomicUsize,
    pub inserts: AtomicUsize,
}

impl CountingStore {
    pub fn calls(&self) -> usize {
        self.queries.load(Ordering::SeqCst) + self.inserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for CountingStore {
    async fn query(&self, filter: &Filter) -> Result<Vec<ClientRecord>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.inner.query(filter).await
    }

    async fn insert(&self, record: &NewClientRecord) -> Result<(), StoreError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.inner.insert(record).await
    }
}

pub fn test_config() -> Config {
    Config::from_lookup(|name: &str| match name {
        "DEMO_PASSWORD" => Some(PASSWORD.to_string()),
        "STORE_BACKEND" => Some("memory".to_string()),
        _ => None,
    })
    .expect("test config is valid")
}

pub async fn seeded_store(rows: &[(&str, &str)]) -> Arc<CountingStore> {
    let store = Arc::new(CountingStore::default());
    for (identifier, name) in rows {
        store
            .inner
            .insert(&NewClientRecord {
                identifier: identifier.to_string(),
                name: name.to_string(),
                status: "ativo".to_string(),
                contract_details: ContractDetails {
                    cliente: name.to_string(),
                    ..ContractDetails::default()
                },
            })
            .await
            .expect("seed insert");
    }
    store
}

pub fn setup_app(store: Arc<CountingStore>) -> Router {
    logging::init_test_logging();
    let state = AppState::new(test_config(), store, Arc::new(StaticSecret::new(PASSWORD)));
    build_router(Arc::new(state))
}

pub fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn upload_request(uri: &str, field: &str, file_name: &str, payload: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(
        b"Content-Type: application/vnd.openxmlformats-officedocument.spreadsheetml.sheet\r\n\r\n",
    );
    body.extend_from_slice(payload);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}
