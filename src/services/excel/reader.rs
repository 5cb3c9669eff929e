use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use bytes::Bytes;
use calamine::{open_workbook_auto, Data, Range, Reader};

use super::cells;
use crate::error::AppError;

/// Distance between the header's 0-based row index and the sheet row number
/// of the first data row beneath it: one header row, and spreadsheets count
/// from 1.
pub const ROW_OFFSET: usize = 2;

const SUPPORTED_EXTENSIONS: [&str; 5] = ["xlsx", "xlsm", "xlsb", "xls", "ods"];
const DEFAULT_EXTENSION: &str = "xlsx";

/// One data row of the first worksheet, keyed by header text.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetRow {
    number: usize,
    cells: HashMap<String, Data>,
}

impl SheetRow {
    pub fn new(number: usize, cells: HashMap<String, Data>) -> Self {
        Self { number, cells }
    }

    /// Row number as the user sees it in the spreadsheet.
    pub fn number(&self) -> usize {
        self.number
    }

    /// `None` when the column is absent from the header row.
    pub fn get(&self, column: &str) -> Option<&Data> {
        self.cells.get(column)
    }
}

/// Parses an uploaded workbook into rows on a blocking thread.
pub async fn read_workbook(
    payload: Bytes,
    file_name: Option<String>,
) -> Result<Vec<SheetRow>, AppError> {
    tokio::task::spawn_blocking(move || {
        read_workbook_in(&std::env::temp_dir(), &payload, file_name.as_deref())
    })
    .await
    .map_err(|e| AppError::Internal(format!("spreadsheet parsing task failed: {}", e)))?
}

/// Spools `payload` into a temporary file under `dir` and reads its first
/// worksheet. The file is deleted on every return path.
pub fn read_workbook_in(
    dir: &Path,
    payload: &[u8],
    file_name: Option<&str>,
) -> Result<Vec<SheetRow>, AppError> {
    let suffix = format!(".{}", upload_extension(file_name));
    let mut spool = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(&suffix)
        .tempfile_in(dir)?;
    spool.write_all(payload)?;
    spool.flush()?;
    tracing::debug!("Spooled {} bytes to {}", payload.len(), spool.path().display());

    let mut workbook = open_workbook_auto(spool.path()).map_err(|e| {
        tracing::error!("Failed to open spreadsheet: {}", e);
        AppError::BatchParseFailure(e.to_string())
    })?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::BatchParseFailure("workbook has no worksheets".to_string()))?
        .map_err(|e| AppError::BatchParseFailure(e.to_string()))?;

    Ok(rows_from_range(&range))
}

/// Splits a worksheet range into header-keyed rows.
///
/// The first row of the range is the header. Each data row keeps its sheet
/// row number, so leading blank rows above the header and fully blank rows
/// skipped in between never shift the numbers reported to users. Blank and
/// error cells are filled with the integer zero. For a repeated header the
/// leftmost column wins.
pub fn rows_from_range(range: &Range<Data>) -> Vec<SheetRow> {
    let header_row = match range.start() {
        Some((row, _)) => row as usize,
        None => return Vec::new(),
    };

    let mut rows = range.rows();
    let headers: Vec<Option<String>> = match rows.next() {
        Some(first) => first
            .iter()
            .map(|cell| Some(cells::text(cell)).filter(|h| !h.is_empty()))
            .collect(),
        None => return Vec::new(),
    };

    rows.enumerate()
        .filter(|(_, row)| !row.iter().all(cells::is_missing))
        .map(|(position, row)| {
            let mut values = HashMap::with_capacity(headers.len());
            for (header, cell) in headers.iter().zip(row) {
                if let Some(header) = header {
                    values
                        .entry(header.clone())
                        .or_insert_with(|| fill_missing(cell));
                }
            }
            SheetRow::new(header_row + position + ROW_OFFSET, values)
        })
        .collect()
}

fn fill_missing(cell: &Data) -> Data {
    if cells::is_missing(cell) {
        Data::Int(0)
    } else {
        cell.clone()
    }
}

fn upload_extension(file_name: Option<&str>) -> String {
    file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use calamine::CellErrorType;

    pub(crate) fn range_of(rows: Vec<Vec<Data>>) -> Range<Data> {
        let height = rows.len().max(1) as u32;
        let width = rows.iter().map(Vec::len).max().unwrap_or(1).max(1) as u32;
        let mut range = Range::new((0, 0), (height - 1, width - 1));
        for (r, row) in rows.into_iter().enumerate() {
            for (c, cell) in row.into_iter().enumerate() {
                range.set_value((r as u32, c as u32), cell);
            }
        }
        range
    }

    fn s(value: &str) -> Data {
        Data::String(value.to_string())
    }

    #[test]
    fn header_row_keys_each_data_row() {
        let range = range_of(vec![
            vec![s("CPF"), s(" Cliente "), s("Quantidade")],
            vec![s("111"), s("Ana"), Data::Float(2.0)],
            vec![s("222"), s("Bia"), Data::Int(1)],
        ]);

        let rows = rows_from_range(&range);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].number(), 2);
        assert_eq!(rows[0].get("CPF"), Some(&s("111")));
        assert_eq!(rows[0].get("Cliente"), Some(&s("Ana")));
        assert_eq!(rows[1].number(), 3);
        assert_eq!(rows[1].get("Quantidade"), Some(&Data::Int(1)));
        assert_eq!(rows[1].get("Status"), None);
    }

    #[test]
    fn blank_and_error_cells_become_zero() {
        let range = range_of(vec![
            vec![s("CPF"), s("Cliente"), s("Valor Líquido")],
            vec![Data::Empty, s("Ana"), Data::Error(CellErrorType::NA)],
        ]);

        let rows = rows_from_range(&range);
        assert_eq!(rows[0].get("CPF"), Some(&Data::Int(0)));
        assert_eq!(rows[0].get("Valor Líquido"), Some(&Data::Int(0)));
    }

    #[test]
    fn blank_rows_are_skipped_without_renumbering_later_rows() {
        let range = range_of(vec![
            vec![s("CPF"), s("Cliente")],
            vec![s("111"), s("Ana")],
            vec![Data::Empty, Data::Empty],
            vec![s("222"), s("Bia")],
        ]);

        let rows = rows_from_range(&range);
        let numbers: Vec<usize> = rows.iter().map(SheetRow::number).collect();
        assert_eq!(numbers, [2, 4]);
        assert_eq!(rows[1].get("CPF"), Some(&s("222")));
    }

    #[test]
    fn numbers_follow_the_sheet_when_the_header_is_not_in_row_one() {
        // header in sheet row 3, as calamine reports when rows 1-2 are empty
        let mut range = Range::new((2, 0), (4, 1));
        range.set_value((2, 0), s("CPF"));
        range.set_value((2, 1), s("Cliente"));
        range.set_value((3, 0), s("111"));
        range.set_value((3, 1), s("Ana"));
        range.set_value((4, 0), s("222"));
        range.set_value((4, 1), s("Bia"));

        let rows = rows_from_range(&range);
        let numbers: Vec<usize> = rows.iter().map(SheetRow::number).collect();
        assert_eq!(numbers, [4, 5]);
        assert_eq!(rows[0].get("Cliente"), Some(&s("Ana")));
    }

    fn fixture() -> Vec<u8> {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/contracts.xlsx");
        std::fs::read(path).unwrap()
    }

    #[test]
    fn reads_the_first_sheet_of_a_real_workbook() {
        let dir = tempfile::tempdir().unwrap();

        let rows = read_workbook_in(dir.path(), &fixture(), Some("contracts.xlsx")).unwrap();

        let numbers: Vec<usize> = rows.iter().map(SheetRow::number).collect();
        assert_eq!(numbers, [2, 3, 5]);
        assert_eq!(rows[0].get("CPF"), Some(&s("12345678900")));
        assert_eq!(rows[0].get("Cliente"), Some(&s("Ana Souza")));
        assert_eq!(rows[0].get("Valor Líquido"), Some(&Data::Float(1500.5)));
        assert_eq!(rows[2].get("Status"), Some(&s("ativo")));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn unnamed_columns_are_dropped_and_first_duplicate_wins() {
        let range = range_of(vec![
            vec![s("CPF"), Data::Empty, s("CPF")],
            vec![s("111"), s("stray"), s("999")],
        ]);

        let rows = rows_from_range(&range);
        assert_eq!(rows[0].get("CPF"), Some(&s("111")));
        assert_eq!(rows[0].get(""), None);
    }

    #[test]
    fn header_only_sheet_has_no_rows() {
        let range = range_of(vec![vec![s("CPF"), s("Cliente")]]);
        assert!(rows_from_range(&range).is_empty());
        assert!(rows_from_range(&Range::<Data>::empty()).is_empty());
    }

    #[test]
    fn extension_follows_the_upload_name() {
        assert_eq!(upload_extension(Some("contracts.XLS")), "xls");
        assert_eq!(upload_extension(Some("contracts.ods")), "ods");
        assert_eq!(upload_extension(Some("contracts.csv")), "xlsx");
        assert_eq!(upload_extension(Some("contracts")), "xlsx");
        assert_eq!(upload_extension(None), "xlsx");
    }

    #[test]
    fn unreadable_payload_fails_the_batch_and_leaves_no_spool_file() {
        let dir = tempfile::tempdir().unwrap();

        let result =
            read_workbook_in(dir.path(), b"definitely not a workbook", Some("contracts.xlsx"));

        assert!(matches!(result, Err(AppError::BatchParseFailure(_))));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn async_reader_reports_parse_failures() {
        let result = read_workbook(Bytes::from_static(b"PK\x03\x04 broken"), None).await;
        assert!(matches!(result, Err(AppError::BatchParseFailure(_))));
    }
}
