use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Data extraction failed: {0}")]
    Extraction(String),

    #[error("Unsupported file '{file}': {reason}")]
    UnsupportedFile { file: String, reason: String },

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("Completion request failed: {0}")]
    Completion(String),

    #[error("Synthesis failed: {0}")]
    Synthesis(String),

    #[error("Failed to process '{file}' during {stage}: {source}")]
    Document {
        file: String,
        stage: Stage,
        #[source]
        source: Box<AnalysisError>,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[cfg(feature = "gemini")]
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Pipeline stage a per-document failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validation,
    Extraction,
    Summary,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Validation => "validation",
            Stage::Extraction => "extraction",
            Stage::Summary => "summary",
        };
        f.write_str(name)
    }
}

impl AnalysisError {
    pub fn in_document(self, file: impl Into<String>, stage: Stage) -> Self {
        AnalysisError::Document {
            file: file.into(),
            stage,
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
