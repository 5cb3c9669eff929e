use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use tracing::{debug, error};

use super::{Filter, RecordStore, StoreError};
use crate::models::{ClientRecord, NewClientRecord};

/// Client records behind a PostgREST endpoint (the hosted Supabase table).
pub struct PostgrestStore {
    client: Client,
    base_url: String,
    api_key: String,
    table: String,
}

impl PostgrestStore {
    pub fn new(base_url: &str, api_key: &str, table: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            table: table.to_string(),
        }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.table)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }
}

/// Query-string pairs selecting `filter` in PostgREST syntax.
pub fn filter_params(filter: &Filter) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];
    match filter {
        Filter::All => {}
        Filter::Equals { field, value } => {
            params.push((field.column().to_string(), format!("eq.{}", value)));
        }
        Filter::Contains { field, value } => {
            params.push((
                field.column().to_string(),
                format!("ilike.*{}*", escape_like(value)),
            ));
        }
    }
    params
}

/// Backslash-escapes the LIKE metacharacters so the term matches literally.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

async fn ensure_success(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    error!("Record store answered {}: {}", status, body);
    Err(StoreError::Rejected {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl RecordStore for PostgrestStore {
    async fn query(&self, filter: &Filter) -> Result<Vec<ClientRecord>, StoreError> {
        debug!("Querying {} with {:?}", self.table, filter);
        let response = self
            .authorize(self.client.get(self.table_url()))
            .query(&filter_params(filter))
            .send()
            .await?;
        let body = ensure_success(response).await?.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| StoreError::Codec(e.to_string()))
    }

    async fn insert(&self, record: &NewClientRecord) -> Result<(), StoreError> {
        let response = self
            .authorize(self.client.post(self.table_url()))
            .header("Prefer", "return=minimal")
            .json(record)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}
