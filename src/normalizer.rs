use crate::schema::{Cell, FinancialLineRecord, RawGrid};
use crate::utils::{clean_category_name, indentation_level, parse_value};
use log::{debug, trace};
use std::collections::BTreeMap;

/// Labels that mark report headers and metadata rather than financial lines.
///
/// Matched as case-insensitive substrings anywhere in the label, so a line such
/// as "Expense Allocation" is skipped by "Location" as well.
pub const METADATA_LABEL_PATTERNS: [&str; 7] = [
    "Twelve Month Trailing",
    "Created on",
    "Reporting Book",
    "As of Date",
    "Location",
    "Statement",
    "For the Period",
];

const MONTHS_PER_YEAR: usize = 12;

/// Turns a raw T12 grid into leveled line records.
///
/// The first column holds the label, columns 2..=13 the months and anything
/// past that a trailing total. Parent sections always precede their children,
/// so the output order is the only encoding of the hierarchy.
pub struct StatementNormalizer {
    skip_patterns: Vec<String>,
}

impl Default for StatementNormalizer {
    fn default() -> Self {
        Self {
            skip_patterns: METADATA_LABEL_PATTERNS
                .iter()
                .map(|p| p.to_lowercase())
                .collect(),
        }
    }
}

impl StatementNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds another metadata label to skip (matched case-insensitively as a substring).
    pub fn with_skip_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.skip_patterns.push(pattern.into().to_lowercase());
        self
    }

    pub fn normalize(&self, grid: &RawGrid) -> Vec<FinancialLineRecord> {
        let rows = compact_grid(grid);
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);

        let mut records = Vec::new();
        for (row_idx, row) in rows.iter().enumerate() {
            match self.normalize_row(row, width) {
                Some(record) => records.push(record),
                None => trace!("Skipping statement row {}", row_idx),
            }
        }

        debug!(
            "Normalized {} of {} statement rows into line records",
            records.len(),
            rows.len()
        );

        records
    }

    fn normalize_row(&self, row: &[Cell], width: usize) -> Option<FinancialLineRecord> {
        let label = row.first().and_then(Cell::as_text)?;
        if label.trim().is_empty() || self.is_metadata_label(label) {
            return None;
        }

        let month_columns = width.saturating_sub(1).min(MONTHS_PER_YEAR);
        let mut monthly_values = BTreeMap::new();
        for col in 1..=month_columns {
            let value = row.get(col).map(parse_value).unwrap_or(0.0);
            monthly_values.insert(col as u8, value);
        }

        if monthly_values.values().all(|v| *v == 0.0) {
            return None;
        }

        let total = if width > MONTHS_PER_YEAR + 1 {
            row.get(width - 1).map(parse_value).unwrap_or(0.0)
        } else {
            monthly_values.values().sum()
        };

        let category = clean_category_name(label);
        if category.is_empty() {
            return None;
        }

        Some(FinancialLineRecord {
            category,
            level: indentation_level(label),
            monthly_values,
            total,
        })
    }

    fn is_metadata_label(&self, label: &str) -> bool {
        let lowered = label.to_lowercase();
        self.skip_patterns.iter().any(|p| lowered.contains(p.as_str()))
    }
}

pub fn normalize_statement(grid: &RawGrid) -> Vec<FinancialLineRecord> {
    StatementNormalizer::default().normalize(grid)
}

/// Drops rows and columns that contain nothing but blank cells.
fn compact_grid(grid: &RawGrid) -> Vec<Vec<Cell>> {
    let width = grid.width();
    let kept_columns: Vec<usize> = (0..width)
        .filter(|col| {
            grid.rows
                .iter()
                .any(|row| row.get(*col).is_some_and(|cell| !cell.is_blank()))
        })
        .collect();

    grid.rows
        .iter()
        .filter(|row| row.iter().any(|cell| !cell.is_blank()))
        .map(|row| {
            kept_columns
                .iter()
                .map(|col| row.get(*col).cloned().unwrap_or(Cell::Empty))
                .collect()
        })
        .collect()
}

/// A statement line with the lines nested beneath it.
#[derive(Debug, Clone, PartialEq)]
pub struct LineNode {
    pub record: FinancialLineRecord,
    pub children: Vec<LineNode>,
}

/// Rebuilds the section tree implied by record order and `level`.
pub fn build_hierarchy(records: &[FinancialLineRecord]) -> Vec<LineNode> {
    let mut roots = Vec::new();
    let mut stack: Vec<LineNode> = Vec::new();

    for record in records {
        while stack
            .last()
            .is_some_and(|top| top.record.level >= record.level)
        {
            if let Some(done) = stack.pop() {
                attach(done, &mut stack, &mut roots);
            }
        }
        stack.push(LineNode {
            record: record.clone(),
            children: Vec::new(),
        });
    }

    while let Some(done) = stack.pop() {
        attach(done, &mut stack, &mut roots);
    }

    roots
}

fn attach(node: LineNode, stack: &mut [LineNode], roots: &mut Vec<LineNode>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => roots.push(node),
    }
}

/// Indented plain-text rendering of the statement, one line per record.
pub fn render_statement(records: &[FinancialLineRecord]) -> String {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push("T12 STATEMENT (monthly values, trailing total):".to_string());

    for record in records {
        let months = record
            .monthly_values
            .iter()
            .map(|(month, value)| format!("M{}: {:.2}", month, value))
            .collect::<Vec<_>>()
            .join(" | ");
        lines.push(format!(
            "{}{} | {} | Total: {:.2}",
            "  ".repeat(record.level as usize),
            record.category,
            months,
            record.total
        ));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(label: &str, values: &[f64]) -> Vec<Cell> {
        let mut cells = vec![Cell::from(label)];
        cells.extend(values.iter().map(|v| Cell::Number(*v)));
        cells
    }

    fn record(category: &str, level: u32, monthly: f64) -> FinancialLineRecord {
        FinancialLineRecord {
            category: category.to_string(),
            level,
            monthly_values: (1..=12).map(|m| (m, monthly)).collect(),
            total: monthly * 12.0,
        }
    }

    #[test]
    fn test_metadata_rows_are_excluded() {
        let grid = RawGrid::new(vec![
            row("Twelve Month Trailing Income Statement", &[2023.0; 12]),
            row("reporting book: accrual", &[1.0; 12]),
            row("As of Date 12/31/2023", &[1.0; 12]),
            row("Rental Income", &[1000.0; 12]),
        ]);

        let records = normalize_statement(&grid);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].category, "Rental Income");
    }

    #[test]
    fn test_every_metadata_pattern_matches_case_insensitively() {
        let cases = [
            ("TWELVE MONTH TRAILING Income Statement", true),
            ("created ON 01/05/2024 by admin", true),
            ("Reporting BOOK: Cash", true),
            ("as of date: 12/31/2023", true),
            ("LOCATION: Elm Court Apartments", true),
            ("Operating statement", true),
            ("for the period Jan-Dec 2023", true),
            ("  6500 - Expense Allocation", true),
            ("Tenant Relocation", true),
            ("Rental Income", false),
            ("Statutory Fees", false),
        ];

        let normalizer = StatementNormalizer::new();
        for (label, skipped) in cases {
            let grid = RawGrid::new(vec![row(label, &[10.0; 12])]);
            assert_eq!(
                normalizer.normalize(&grid).is_empty(),
                skipped,
                "label {:?}",
                label
            );
        }
    }

    #[test]
    fn test_level_and_account_code() {
        let grid = RawGrid::new(vec![row("  6000 - Rental Income", &[500.0; 12])]);

        let records = normalize_statement(&grid);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].level, 1);
        assert_eq!(records[0].category, "Rental Income");
        assert_eq!(records[0].total, 6000.0);
    }

    #[test]
    fn test_currency_strings_and_bad_cells() {
        let mut cells = vec![Cell::from("Parking")];
        cells.push(Cell::from("$1,000.00"));
        cells.push(Cell::from("N/A"));
        cells.push(Cell::from("oops"));
        cells.extend(std::iter::repeat(Cell::from("$100")).take(9));
        let grid = RawGrid::new(vec![cells]);

        let records = normalize_statement(&grid);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].monthly_values[&1], 1000.0);
        assert_eq!(records[0].monthly_values[&2], 0.0);
        assert_eq!(records[0].monthly_values[&3], 0.0);
        assert_eq!(records[0].total, 1900.0);
    }

    #[test]
    fn test_explicit_total_column_wins() {
        let mut values = vec![100.0; 12];
        values.push(9999.0);
        let grid = RawGrid::new(vec![row("Utilities", &values)]);

        let records = normalize_statement(&grid);
        assert_eq!(records[0].total, 9999.0);
        assert_eq!(records[0].monthly_values.len(), 12);
        assert_eq!(records[0].monthly_sum(), 1200.0);
    }

    #[test]
    fn test_empty_rows_and_columns_are_dropped() {
        let grid = RawGrid::new(vec![
            vec![Cell::Empty, Cell::Empty, Cell::Empty],
            vec![Cell::from("Insurance"), Cell::Empty, Cell::Number(50.0)],
            vec![Cell::from("   "), Cell::Empty, Cell::Empty],
        ]);

        let records = normalize_statement(&grid);
        assert_eq!(records.len(), 1);
        // The blank middle column is removed, so the value lands in month 1.
        assert_eq!(records[0].monthly_values.len(), 1);
        assert_eq!(records[0].monthly_values[&1], 50.0);
    }

    #[test]
    fn test_non_text_label_is_rejected() {
        let grid = RawGrid::new(vec![
            vec![Cell::Number(4000.0), Cell::Number(1.0)],
            row("Taxes", &[10.0]),
        ]);
        let records = normalize_statement(&grid);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].category, "Taxes");
    }

    #[test]
    fn test_custom_skip_pattern() {
        let grid = RawGrid::new(vec![row("Property: Elm Court", &[1.0; 12])]);
        let normalizer = StatementNormalizer::new().with_skip_pattern("property:");
        assert!(normalizer.normalize(&grid).is_empty());
    }

    #[test]
    fn test_build_hierarchy_from_levels() {
        let records = vec![
            record("Income", 0, 1100.0),
            record("Rental Income", 1, 1000.0),
            record("Laundry", 2, 50.0),
            record("Fees", 1, 100.0),
            record("Expenses", 0, 200.0),
            record("Repairs", 1, 200.0),
        ];

        let tree = build_hierarchy(&records);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].record.category, "Income");
        assert_eq!(tree[0].children.len(), 2);
        assert_eq!(tree[0].children[0].children[0].record.category, "Laundry");
        assert_eq!(tree[1].children[0].record.category, "Repairs");
    }

    #[test]
    fn test_render_statement_indents_children() {
        let text = render_statement(&[record("Income", 0, 10.0), record("Rent", 1, 10.0)]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("Income | M1: 10.00"));
        assert!(lines[2].starts_with("  Rent | "));
        assert!(lines[2].ends_with("Total: 120.00"));
    }
}
