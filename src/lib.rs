//! # Property Deal Analyzer
//!
//! Turns real-estate deal documents into an AI-written investment analysis.
//!
//! ## Core Concepts
//!
//! - **T12 normalization**: irregular monthly operating statements (header rows,
//!   indentation as hierarchy, currency strings) become flat, leveled
//!   [`FinancialLineRecord`]s
//! - **Chunking**: extracted text is split on line boundaries into pieces whose
//!   estimated cost (characters / 4) stays under a limit
//! - **Dispatch**: chunks are analyzed concurrently under a cap, with
//!   exponential-backoff retries; a chunk that keeps failing degrades to an
//!   empty analysis instead of failing the batch
//! - **Synthesis**: chunk analyses are reduced to one summary per document, and
//!   the summaries to one cross-document investment report
//!
//! ## Example
//!
//! ```rust,ignore
//! use property_deal_analyzer::*;
//! use property_deal_analyzer::llm::GeminiClient;
//! use std::sync::Arc;
//!
//! let config = AnalysisConfig::from_env()?;
//! let client = GeminiClient::new(api_key, config.model.clone())?;
//! let analyzer = DealAnalyzer::new(Arc::new(client), config);
//!
//! let uploads = vec![
//!     DocumentUpload::from_file(Path::new("om.pdf"), DocumentType::OfferingMemo)?,
//!     DocumentUpload::from_file(Path::new("t12.xlsx"), DocumentType::Financials)?,
//! ];
//! let deal = analyzer.analyze_deal(uploads).await?;
//! println!("{}", deal.report);
//! ```

pub mod chunker;
pub mod completion;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod ingestion;
pub mod normalizer;
pub mod pipeline;
pub mod prompts;
pub mod schema;
pub mod synthesizer;
pub mod upload;
pub mod utils;

#[cfg(feature = "gemini")]
pub mod llm;

pub use chunker::{chunk_text, estimate_cost};
pub use completion::{CompletionModel, CompletionSettings};
pub use config::AnalysisConfig;
pub use dispatcher::{dispatch, AnalysisDispatcher, ChunkAnalyzer, ChunkContext, RetryPolicy};
pub use error::{AnalysisError, Result, Stage};
pub use ingestion::{extract_pdf_text, extract_spreadsheet_grid, SpreadsheetFormat};
pub use normalizer::{build_hierarchy, normalize_statement, LineNode, StatementNormalizer};
pub use pipeline::{DealAnalysis, DealAnalyzer, DocumentOutcome, ModelChunkAnalyzer};
pub use schema::*;
pub use synthesizer::Synthesizer;
pub use upload::{DocumentUpload, SourceKind};
pub use utils::{parse_value, parse_value_str};
