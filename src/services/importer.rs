use bytes::Bytes;
use tracing::{debug, info, warn};

use super::excel::{self, cells, SheetRow};
use crate::error::AppError;
use crate::models::{ContractDetails, ImportReport, NewClientRecord};
use crate::store::RecordStore;

/// Source column headers of the sales export.
pub mod columns {
    pub const CPF: &str = "CPF";
    pub const STATUS: &str = "Status";
    pub const ID: &str = "ID";
    pub const DATA_VENDA: &str = "Data Venda";
    pub const UNIDADE: &str = "Unidade";
    pub const CLIENTE: &str = "Cliente";
    pub const VALOR_LIQUIDO: &str = "Valor Líquido";
    pub const PROCEDIMENTO_PRODUTO: &str = "Procedimento / Produto";
    pub const QUANTIDADE: &str = "Quantidade";
    pub const VALOR_TABELA_ITEM: &str = "Valor Tabela Item";
    pub const DESCONTO_ITEM: &str = "% Desconto Item";
    pub const VALOR_DESCONTO_ITEM: &str = "Valor Desconto Item";
    pub const VALOR_LIQUIDO_ITEM: &str = "Valor Líquido Item";
    pub const MES_VENDA: &str = "Mês Venda";
    pub const ANO_VENDA: &str = "Ano Venda";
    pub const TELEFONE: &str = "Telefone";
}

fn text_of(row: &SheetRow, column: &str) -> String {
    row.get(column).map(cells::text).unwrap_or_default()
}

fn number_of(row: &SheetRow, column: &str) -> f64 {
    row.get(column).map(cells::number).unwrap_or_default()
}

/// Maps one spreadsheet row onto a client record.
///
/// Absent columns become `""` or `0.0`; numeric columns that do not coerce
/// become `0.0`. Never fails.
pub fn normalize_row(row: &SheetRow) -> NewClientRecord {
    NewClientRecord {
        identifier: text_of(row, columns::CPF),
        name: text_of(row, columns::CLIENTE),
        status: text_of(row, columns::STATUS),
        contract_details: ContractDetails {
            id: text_of(row, columns::ID),
            data_venda: text_of(row, columns::DATA_VENDA),
            unidade: text_of(row, columns::UNIDADE),
            cliente: text_of(row, columns::CLIENTE),
            valor_liquido: number_of(row, columns::VALOR_LIQUIDO),
            procedimento_produto: text_of(row, columns::PROCEDIMENTO_PRODUTO),
            quantidade: number_of(row, columns::QUANTIDADE),
            valor_tabela_item: number_of(row, columns::VALOR_TABELA_ITEM),
            desconto_item_percentual: number_of(row, columns::DESCONTO_ITEM),
            valor_desconto_item: number_of(row, columns::VALOR_DESCONTO_ITEM),
            valor_liquido_item: number_of(row, columns::VALOR_LIQUIDO_ITEM),
            mes_venda: text_of(row, columns::MES_VENDA),
            ano_venda: text_of(row, columns::ANO_VENDA),
            telefone: text_of(row, columns::TELEFONE),
        },
    }
}

/// Stores each row on its own, in order, and collects per-row failures.
pub async fn import_rows(store: &dyn RecordStore, rows: &[SheetRow]) -> ImportReport {
    let mut rows_imported = 0;
    let mut errors = Vec::new();

    for row in rows {
        let record = normalize_row(row);
        match store.insert(&record).await {
            Ok(()) => {
                rows_imported += 1;
                debug!("Successfully imported row {}", row.number());
            }
            Err(e) => {
                let message = format!("Error in row {}: {}", row.number(), e);
                warn!("{}", message);
                errors.push(message);
            }
        }
    }

    if rows_imported == 0 && !errors.is_empty() {
        warn!("Every row of the batch failed ({} errors)", errors.len());
    }

    ImportReport {
        success: true,
        rows_imported,
        errors,
    }
}

/// Reads an uploaded workbook and imports its rows.
///
/// Only an unreadable workbook fails the whole call.
pub async fn import_workbook(
    store: &dyn RecordStore,
    payload: Bytes,
    file_name: Option<String>,
) -> Result<ImportReport, AppError> {
    let start = std::time::Instant::now();
    let rows = excel::read_workbook(payload, file_name).await?;
    info!("Read {} data rows in {:?}", rows.len(), start.elapsed());

    let report = import_rows(store, &rows).await;
    info!(
        "Imported {} of {} rows in {:?}",
        report.rows_imported,
        rows.len(),
        start.elapsed()
    );
    Ok(report)
}
