use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A single spreadsheet cell as read from the source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    Empty,
}

impl Cell {
    /// Empty cells and whitespace-only text both count as blank.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(text) => text.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(value) => write!(f, "{}", value),
            Cell::Text(text) => f.write_str(text),
            Cell::Empty => Ok(()),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

/// Rows of cells in source order. Rows may have different lengths.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawGrid {
    pub rows: Vec<Vec<Cell>>,
}

impl RawGrid {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|row| row.iter().all(Cell::is_blank))
    }

    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

/// One cleaned line of a T12 statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialLineRecord {
    pub category: String,
    /// 0 for top-level sections, +1 per two leading spaces in the source label.
    pub level: u32,
    /// Month index (1..=12) to value.
    pub monthly_values: BTreeMap<u8, f64>,
    pub total: f64,
}

impl FinancialLineRecord {
    pub fn monthly_sum(&self) -> f64 {
        self.monthly_values.values().sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    pub index: usize,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkAnalysisResult {
    pub index: usize,
    /// Empty when every attempt for this chunk failed.
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    OfferingMemo,
    RentRoll,
    Financials,
}

impl DocumentType {
    pub const ALL: [DocumentType; 3] = [
        DocumentType::OfferingMemo,
        DocumentType::RentRoll,
        DocumentType::Financials,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::OfferingMemo => "offering_memo",
            DocumentType::RentRoll => "rent_roll",
            DocumentType::Financials => "financials",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            DocumentType::OfferingMemo => "Offering Memorandum",
            DocumentType::RentRoll => "Rent Roll",
            DocumentType::Financials => "T12 Financial Statement",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = AnalysisError;

    /// Accepts the canonical names and the short codes `om`, `rr` and `t12`.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "offering_memo" | "om" => Ok(DocumentType::OfferingMemo),
            "rent_roll" | "rr" => Ok(DocumentType::RentRoll),
            "financials" | "t12" => Ok(DocumentType::Financials),
            other => Err(AnalysisError::InvalidUpload(format!(
                "Invalid document type '{}'. Must be one of: offering_memo, rent_roll, financials",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentAnalysis {
    pub file_name: String,
    pub document_type: DocumentType,
    pub summary: String,
    pub raw_chunk_analyses: Vec<String>,
}

pub type InvestmentReport = String;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_type_parsing() {
        assert_eq!(
            "om".parse::<DocumentType>().unwrap(),
            DocumentType::OfferingMemo
        );
        assert_eq!(
            "Rent_Roll".parse::<DocumentType>().unwrap(),
            DocumentType::RentRoll
        );
        assert_eq!(
            "t12".parse::<DocumentType>().unwrap(),
            DocumentType::Financials
        );
        assert!("appraisal".parse::<DocumentType>().is_err());
    }

    #[test]
    fn test_document_type_serde_names() {
        let json = serde_json::to_string(&DocumentType::OfferingMemo).unwrap();
        assert_eq!(json, "\"offering_memo\"");

        let parsed: DocumentType = serde_json::from_str("\"rent_roll\"").unwrap();
        assert_eq!(parsed, DocumentType::RentRoll);
    }

    #[test]
    fn test_blank_cells() {
        assert!(Cell::Empty.is_blank());
        assert!(Cell::from("   ").is_blank());
        assert!(!Cell::from("Income").is_blank());
        assert!(!Cell::Number(0.0).is_blank());
    }

    #[test]
    fn test_grid_width_handles_ragged_rows() {
        let grid = RawGrid::new(vec![
            vec![Cell::from("a")],
            vec![Cell::from("b"), Cell::Number(1.0), Cell::Empty],
        ]);
        assert_eq!(grid.width(), 3);
        assert!(!grid.is_empty());
        assert!(RawGrid::default().is_empty());
    }
}
