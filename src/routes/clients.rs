use axum::{
    extract::{Multipart, Query, State},
    http::Method,
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::{
    error::AppError,
    models::{ClientRecord, ImportReport},
    services::{auth, importer, search},
    store::Filter,
    AppState,
};

const UPLOAD_FIELD: &str = "file";

pub fn routes() -> Router<Arc<AppState>> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/search_client", post(search_client))
        .route("/import_excel", post(import_excel))
        .route("/all_clients", get(all_clients))
        .layer(cors)
}

#[derive(Deserialize)]
pub struct SearchRequest {
    search_term: String,
    password: String,
}

#[derive(Deserialize)]
pub struct PasswordQuery {
    password: Option<String>,
}

async fn search_client(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<Vec<ClientRecord>>, AppError> {
    auth::require(state.auth.as_ref(), Some(&request.password))?;

    if request.search_term.trim().is_empty() {
        return Err(AppError::InvalidInput(
            "search_term must not be empty".to_string(),
        ));
    }

    let start = std::time::Instant::now();
    let hits = search::resolve(state.store.as_ref(), &request.search_term).await?;
    tracing::info!(
        "Search finished with {:?} match, {} records, took {:?}",
        hits.tier,
        hits.records.len(),
        start.elapsed()
    );

    Ok(Json(hits.records))
}

async fn import_excel(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PasswordQuery>,
    mut multipart: Multipart,
) -> Result<Json<ImportReport>, AppError> {
    auth::require(state.auth.as_ref(), query.password.as_deref())?;

    let (file_name, payload) = read_upload(&mut multipart).await?;
    tracing::info!(
        "Received file: {}, size: {}KB",
        file_name.as_deref().unwrap_or("<unnamed>"),
        payload.len() / 1024
    );

    let report = importer::import_workbook(state.store.as_ref(), payload, file_name).await?;
    Ok(Json(report))
}

async fn all_clients(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PasswordQuery>,
) -> Result<Json<Vec<ClientRecord>>, AppError> {
    auth::require(state.auth.as_ref(), query.password.as_deref())?;

    let records = state.store.query(&Filter::All).await?;
    tracing::info!("Listing {} client records", records.len());
    Ok(Json(records))
}

async fn read_upload(multipart: &mut Multipart) -> Result<(Option<String>, Bytes), AppError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(UPLOAD_FIELD) {
            let file_name = field.file_name().map(str::to_owned);
            let payload = field.bytes().await?;
            return Ok((file_name, payload));
        }
    }
    Err(AppError::InvalidInput(format!(
        "multipart field `{}` is missing",
        UPLOAD_FIELD
    )))
}
