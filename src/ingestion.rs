//! Extraction of text and cell grids from uploaded document bytes.
//!
//! - PDF: `pdf-extract`, guarded against panics on malformed fonts
//! - Excel: `.xlsx` / `.xls` via `calamine` (first worksheet)
//! - CSV: `csv`

use crate::error::{AnalysisError, Result};
use crate::schema::{Cell, RawGrid};
use crate::utils::parse_value;
use calamine::{open_workbook_from_rs, Data, Reader, Xls, Xlsx};
use log::{debug, info, warn};
use std::io::Cursor;
use std::panic::AssertUnwindSafe;

/// Words that mark an offering-memo line as a property fact.
pub const PROPERTY_KEYWORDS: [&str; 14] = [
    "price", "sqft", "bedroom", "bath", "address", "property", "type", "year", "built", "lot",
    "garage", "tax", "zoning", "value",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadsheetFormat {
    Xlsx,
    Xls,
    Csv,
}

impl SpreadsheetFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "xlsx" | "xlsm" => Some(SpreadsheetFormat::Xlsx),
            "xls" => Some(SpreadsheetFormat::Xls),
            "csv" => Some(SpreadsheetFormat::Csv),
            _ => None,
        }
    }
}

/// Extracts the text of every page, joined in page order.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String> {
    debug!("Extracting PDF text from {} bytes", bytes.len());

    // pdf-extract can panic on malformed fonts and glyph tables
    let text = match std::panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem(bytes)
    })) {
        Ok(Ok(text)) => text,
        Ok(Err(e)) => {
            return Err(AnalysisError::Extraction(format!(
                "PDF extraction failed: {}",
                e
            )))
        }
        Err(_) => {
            return Err(AnalysisError::Extraction(
                "PDF extraction panicked, the file likely contains malformed fonts".to_string(),
            ))
        }
    };

    let text = clean_pdf_text(&text);
    if text.trim().is_empty() {
        return Err(AnalysisError::Extraction(
            "PDF contains no extractable text (scanned or image-only?)".to_string(),
        ));
    }

    info!("Extracted {} chars of PDF text", text.len());
    Ok(text)
}

/// Trims trailing whitespace per line and collapses runs of blank lines.
fn clean_pdf_text(raw: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    let mut previous_blank = true;

    for line in raw.lines() {
        let line = line.trim_end();
        let blank = line.trim().is_empty();
        if blank && previous_blank {
            continue;
        }
        lines.push(line);
        previous_blank = blank;
    }

    while lines.last().is_some_and(|l| l.trim().is_empty()) {
        lines.pop();
    }

    lines.join("\n")
}

/// Lines of an offering memo that mention a property keyword, trimmed, in order.
pub fn key_property_lines(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| {
            let lowered = line.to_lowercase();
            PROPERTY_KEYWORDS.iter().any(|k| lowered.contains(k))
        })
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

/// Reads the first worksheet (or the CSV table) into a grid.
pub fn extract_spreadsheet_grid(bytes: &[u8], format: SpreadsheetFormat) -> Result<RawGrid> {
    if bytes.is_empty() {
        return Err(AnalysisError::Extraction("spreadsheet is empty".to_string()));
    }

    let grid = match format {
        SpreadsheetFormat::Csv => read_csv_grid(bytes)?,
        SpreadsheetFormat::Xlsx => read_workbook_grid::<Xlsx<Cursor<Vec<u8>>>>(bytes)?,
        SpreadsheetFormat::Xls => read_workbook_grid::<Xls<Cursor<Vec<u8>>>>(bytes)?,
    };

    if grid.is_empty() {
        return Err(AnalysisError::Extraction(
            "spreadsheet contains no data".to_string(),
        ));
    }

    info!(
        "Extracted spreadsheet grid: {} rows x {} columns",
        grid.rows.len(),
        grid.width()
    );
    Ok(grid)
}

fn read_workbook_grid<R>(bytes: &[u8]) -> Result<RawGrid>
where
    R: Reader<Cursor<Vec<u8>>>,
    R::Error: std::fmt::Display,
{
    let mut workbook: R = open_workbook_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| AnalysisError::Extraction(format!("Failed to open workbook: {}", e)))?;

    let sheet_names = workbook.sheet_names();
    let first = sheet_names
        .first()
        .ok_or_else(|| AnalysisError::Extraction("Workbook has no worksheets".to_string()))?;

    if sheet_names.len() > 1 {
        warn!(
            "Workbook has {} worksheets, reading only '{}'",
            sheet_names.len(),
            first
        );
    }

    let range = workbook
        .worksheet_range(first)
        .map_err(|e| AnalysisError::Extraction(format!("Failed to read '{}': {}", first, e)))?;

    let rows = range
        .rows()
        .map(|row| row.iter().map(cell_from_data).collect())
        .collect();

    Ok(RawGrid::new(rows))
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::String(s) => Cell::Text(s.clone()),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::Error(_) => Cell::Empty,
        other => Cell::Text(other.to_string()),
    }
}

fn read_csv_grid(bytes: &[u8]) -> Result<RawGrid> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record
            .map_err(|e| AnalysisError::Extraction(format!("Malformed CSV: {}", e)))?;
        rows.push(record.iter().map(cell_from_csv_field).collect());
    }

    Ok(RawGrid::new(rows))
}

/// CSV fields stay text (labels keep their indentation); plain numbers become numbers.
fn cell_from_csv_field(field: &str) -> Cell {
    if field.trim().is_empty() {
        return Cell::Empty;
    }
    match field.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && field == field.trim() => Cell::Number(value),
        _ => Cell::Text(field.to_string()),
    }
}

/// Renders a grid as a header line plus one `column: value` line per data row.
///
/// The first non-blank row is taken as the header; blank cells show as `N/A`.
pub fn grid_to_text(grid: &RawGrid) -> String {
    let mut rows = grid
        .rows
        .iter()
        .filter(|row| row.iter().any(|c| !c.is_blank()));

    let Some(header_row) = rows.next() else {
        return String::new();
    };

    let headers = column_headers(header_row, grid.width());
    let mut parts = vec![
        "COLUMNS:".to_string(),
        headers.join(", "),
        String::new(),
        "DATA:".to_string(),
    ];

    for row in rows {
        let line = headers
            .iter()
            .enumerate()
            .map(|(col, header)| {
                let value = match row.get(col) {
                    Some(cell) if !cell.is_blank() => cell.to_string(),
                    _ => "N/A".to_string(),
                };
                format!("{}: {}", header, value)
            })
            .collect::<Vec<_>>()
            .join(" | ");
        parts.push(line);
    }

    parts.join("\n")
}

fn column_headers(header_row: &[Cell], width: usize) -> Vec<String> {
    (0..width)
        .map(|col| match header_row.get(col) {
            Some(cell) if !cell.is_blank() => cell.to_string().trim().to_string(),
            _ => format!("Column {}", col + 1),
        })
        .collect()
}

/// Sum of the first column whose header mentions "rent", if there is one.
pub fn total_rent(grid: &RawGrid) -> Option<f64> {
    let mut rows = grid
        .rows
        .iter()
        .filter(|row| row.iter().any(|c| !c.is_blank()));
    let header_row = rows.next()?;

    let rent_col = header_row.iter().position(|cell| {
        cell.as_text()
            .is_some_and(|text| text.to_lowercase().contains("rent"))
    })?;

    Some(
        rows.filter_map(|row| row.get(rent_col))
            .map(parse_value)
            .sum(),
    )
}

/// Rent roll analysis input: the rendered grid plus the total rent when a rent column exists.
pub fn rent_roll_text(grid: &RawGrid) -> String {
    let mut text = format!("=== RENT ROLL ===\n{}", grid_to_text(grid));
    if let Some(total) = total_rent(grid) {
        text.push_str(&format!("\n\nTotal Rent: ${}", format_currency(total)));
    }
    text
}

/// `1234567.891` becomes `1,234,567.89`.
pub fn format_currency(value: f64) -> String {
    let formatted = format!("{:.2}", value.abs());
    let (whole, cents) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, cents)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_row(cells: &[&str]) -> Vec<Cell> {
        cells
            .iter()
            .map(|c| {
                if c.is_empty() {
                    Cell::Empty
                } else {
                    Cell::from(*c)
                }
            })
            .collect()
    }

    #[test]
    fn test_csv_grid_keeps_label_indentation() {
        let csv = "Income,,\n  Rental Income,1000,\"1,200\"\n,,\n";
        let grid = extract_spreadsheet_grid(csv.as_bytes(), SpreadsheetFormat::Csv).unwrap();

        assert_eq!(grid.rows.len(), 3);
        assert_eq!(grid.rows[1][0], Cell::from("  Rental Income"));
        assert_eq!(grid.rows[1][1], Cell::Number(1000.0));
        assert_eq!(grid.rows[1][2], Cell::from("1,200"));
        assert_eq!(grid.rows[2][0], Cell::Empty);
    }

    #[test]
    fn test_empty_spreadsheet_is_an_extraction_error() {
        let result = extract_spreadsheet_grid(&[], SpreadsheetFormat::Xlsx);
        assert!(matches!(result, Err(AnalysisError::Extraction(_))));
    }

    #[test]
    fn test_blank_csv_is_an_extraction_error() {
        let result = extract_spreadsheet_grid(b",,\n , ,\n", SpreadsheetFormat::Csv);
        assert!(matches!(result, Err(AnalysisError::Extraction(_))));
    }

    #[test]
    fn test_garbage_workbook_is_an_extraction_error() {
        for format in [SpreadsheetFormat::Xlsx, SpreadsheetFormat::Xls] {
            let result = extract_spreadsheet_grid(b"definitely not a workbook", format);
            match result {
                Err(AnalysisError::Extraction(message)) => {
                    assert!(message.starts_with("Failed to open workbook"), "{:?}", format)
                }
                other => panic!("unexpected result for {:?}: {:?}", format, other),
            }
        }
    }

    #[test]
    fn test_garbage_pdf_is_an_extraction_error() {
        let result = extract_pdf_text(b"%PDF-1.4 truncated");
        assert!(matches!(result, Err(AnalysisError::Extraction(_))));
    }

    #[test]
    fn test_clean_pdf_text_collapses_blank_runs() {
        let cleaned = clean_pdf_text("\n\nPage 1   \n\n\n\nPage 2\n\n");
        assert_eq!(cleaned, "Page 1\n\nPage 2");
    }

    #[test]
    fn test_key_property_lines() {
        let text = "Welcome\n  Asking Price: $4,500,000 \nYear Built: 1987\nCall us today\nZoning: R-4";
        assert_eq!(
            key_property_lines(text),
            vec!["Asking Price: $4,500,000", "Year Built: 1987", "Zoning: R-4"]
        );
    }

    #[test]
    fn test_grid_to_text_layout() {
        let grid = RawGrid::new(vec![
            text_row(&["Unit", "Tenant", "Rent"]),
            text_row(&["101", "Smith", "$1,200"]),
            text_row(&["102", "", "$1,150"]),
        ]);

        let text = grid_to_text(&grid);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "COLUMNS:");
        assert_eq!(lines[1], "Unit, Tenant, Rent");
        assert_eq!(lines[3], "DATA:");
        assert_eq!(lines[4], "Unit: 101 | Tenant: Smith | Rent: $1,200");
        assert_eq!(lines[5], "Unit: 102 | Tenant: N/A | Rent: $1,150");
    }

    #[test]
    fn test_rent_roll_total() {
        let grid = RawGrid::new(vec![
            text_row(&["Unit", "Market Rent"]),
            text_row(&["101", "$1,200.50"]),
            text_row(&["102", "vacant"]),
            vec![Cell::from("103"), Cell::Number(1000.0)],
        ]);

        assert_eq!(total_rent(&grid), Some(2200.5));
        assert!(rent_roll_text(&grid).ends_with("Total Rent: $2,200.50"));
    }

    #[test]
    fn test_rent_roll_without_rent_column() {
        let grid = RawGrid::new(vec![text_row(&["Unit", "Tenant"]), text_row(&["1", "A"])]);
        assert_eq!(total_rent(&grid), None);
        assert!(!rent_roll_text(&grid).contains("Total Rent"));
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(0.0), "0.00");
        assert_eq!(format_currency(999.5), "999.50");
        assert_eq!(format_currency(1234567.891), "1,234,567.89");
        assert_eq!(format_currency(-12000.0), "-12,000.00");
    }
}
