use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A stored client record, as returned by search and listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRecord {
    #[serde(rename = "cpf", default, deserialize_with = "lenient_text")]
    pub identifier: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub status: String,
    #[serde(default, deserialize_with = "lenient_details")]
    pub contract_details: ContractDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload: a record before the store has stamped it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewClientRecord {
    #[serde(rename = "cpf")]
    pub identifier: String,
    pub name: String,
    pub status: String,
    pub contract_details: ContractDetails,
}

impl NewClientRecord {
    pub fn into_record(self, stamped_at: DateTime<Utc>) -> ClientRecord {
        ClientRecord {
            identifier: self.identifier,
            name: self.name,
            status: self.status,
            contract_details: self.contract_details,
            created_at: stamped_at,
            updated_at: stamped_at,
        }
    }
}

/// Contract attributes carried over from the sales spreadsheet.
///
/// Every field defaults, so rows with missing columns and stored rows with
/// missing keys both deserialize.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractDetails {
    #[serde(deserialize_with = "lenient_text")]
    pub id: String,
    #[serde(deserialize_with = "lenient_text")]
    pub data_venda: String,
    #[serde(deserialize_with = "lenient_text")]
    pub unidade: String,
    #[serde(deserialize_with = "lenient_text")]
    pub cliente: String,
    #[serde(deserialize_with = "lenient_number")]
    pub valor_liquido: f64,
    #[serde(deserialize_with = "lenient_text")]
    pub procedimento_produto: String,
    #[serde(deserialize_with = "lenient_number")]
    pub quantidade: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub valor_tabela_item: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub desconto_item_percentual: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub valor_desconto_item: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub valor_liquido_item: f64,
    #[serde(deserialize_with = "lenient_text")]
    pub mes_venda: String,
    #[serde(deserialize_with = "lenient_text")]
    pub ano_venda: String,
    #[serde(deserialize_with = "lenient_text")]
    pub telefone: String,
}

/// Outcome of one bulk import.
///
/// `success` reports that the batch ran to completion; per-row failures live
/// in `errors`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    pub success: bool,
    pub rows_imported: usize,
    pub errors: Vec<String>,
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        // `2021.0` renders as `2021`, matching how the importer writes it
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => format!("{}", f),
            _ => n.to_string(),
        },
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64().unwrap_or_default(),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .unwrap_or_default(),
        _ => 0.0,
    })
}

// Older rows hold the details as a JSON-encoded string instead of an object.
fn lenient_details<'de, D>(deserializer: D) -> Result<ContractDetails, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(raw) => serde_json::from_str(&raw).unwrap_or_default(),
        value @ Value::Object(_) => serde_json::from_value(value).unwrap_or_default(),
        _ => ContractDetails::default(),
    })
}
