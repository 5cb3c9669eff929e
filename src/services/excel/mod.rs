pub mod cells;
pub mod reader;

pub use reader::{read_workbook, rows_from_range, SheetRow, ROW_OFFSET};
