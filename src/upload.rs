use crate::error::{AnalysisError, Result};
use crate::ingestion::SpreadsheetFormat;
use crate::schema::DocumentType;
use std::path::Path;

/// How the bytes of an upload are to be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Pdf,
    Spreadsheet(SpreadsheetFormat),
}

/// One uploaded file together with its declared document type.
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    pub file_name: String,
    pub document_type: DocumentType,
    pub bytes: Vec<u8>,
}

impl DocumentUpload {
    pub fn new(file_name: impl Into<String>, document_type: DocumentType, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            document_type,
            bytes,
        }
    }

    pub fn from_file(path: &Path, document_type: DocumentType) -> Result<Self> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| AnalysisError::InvalidUpload("Invalid file name".to_string()))?
            .to_string();
        let bytes = std::fs::read(path)?;
        Ok(Self::new(file_name, document_type, bytes))
    }

    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }

    pub fn mime_type(&self) -> String {
        mime_guess::from_path(&self.file_name)
            .first_or_octet_stream()
            .to_string()
    }

    /// Checks the upload's shape and that its extension matches the declared type.
    ///
    /// Offering memoranda must be PDFs; rent rolls and financials must be
    /// `.xlsx`, `.xls` or `.csv` spreadsheets.
    pub fn validate(&self) -> Result<SourceKind> {
        if self.file_name.trim().is_empty() {
            return Err(AnalysisError::InvalidUpload(
                "No filename provided".to_string(),
            ));
        }
        if self.bytes.is_empty() {
            return Err(AnalysisError::InvalidUpload(format!(
                "'{}' is empty",
                self.file_name
            )));
        }

        let extension = self.extension().unwrap_or_default();
        match self.document_type {
            DocumentType::OfferingMemo if extension == "pdf" => Ok(SourceKind::Pdf),
            DocumentType::OfferingMemo => Err(AnalysisError::UnsupportedFile {
                file: self.file_name.clone(),
                reason: format!(
                    "an Offering Memorandum must be a PDF file (got {})",
                    self.mime_type()
                ),
            }),
            DocumentType::RentRoll | DocumentType::Financials => {
                SpreadsheetFormat::from_extension(&extension)
                    .map(SourceKind::Spreadsheet)
                    .ok_or_else(|| AnalysisError::UnsupportedFile {
                        file: self.file_name.clone(),
                        reason: format!(
                            "a {} must be an Excel or CSV file (got {})",
                            self.document_type.display_name(),
                            self.mime_type()
                        ),
                    })
            }
        }
    }
}
