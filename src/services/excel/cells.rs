//! Cell coercion for imported spreadsheets.

use calamine::Data;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Empty cells and spreadsheet error values (`#N/A`, `#DIV/0!`, ...).
pub fn is_missing(cell: &Data) -> bool {
    matches!(cell, Data::Empty | Data::Error(_))
}

/// Trimmed text rendering of a cell.
pub fn text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        // f64's Display drops a zero fraction: 2021.0 -> "2021"
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|value| value.format(DATETIME_FORMAT).to_string())
            .unwrap_or_else(|| dt.as_f64().to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.trim().to_string(),
        Data::Error(_) | Data::Empty => String::new(),
    }
}

/// Numeric value of a cell, `0.0` when it has none.
pub fn number(cell: &Data) -> f64 {
    let value = match cell {
        Data::Float(f) => *f,
        Data::Int(i) => *i as f64,
        Data::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Data::String(s) => parse_number(s).unwrap_or_default(),
        _ => 0.0,
    };
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if let Ok(value) = raw.parse::<f64>() {
        return Some(value);
    }
    // decimal comma, as typed in pt-BR sheets: "12,5"
    if raw.matches(',').count() == 1 && !raw.contains('.') {
        return raw.replace(',', ".").parse::<f64>().ok();
    }
    None
}
