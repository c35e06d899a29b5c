use crate::chunker::chunk_text;
use crate::completion::{CompletionModel, CompletionSettings};
use crate::config::AnalysisConfig;
use crate::dispatcher::{ChunkAnalyzer, ChunkContext};
use crate::error::{AnalysisError, Result, Stage};
use crate::ingestion::{
    extract_pdf_text, extract_spreadsheet_grid, grid_to_text, key_property_lines, rent_roll_text,
};
use crate::normalizer::{normalize_statement, render_statement};
use crate::prompts::{chunk_prompt, system_prompt};
use crate::schema::{DocumentAnalysis, DocumentType, InvestmentReport};
use crate::synthesizer::Synthesizer;
use crate::upload::{DocumentUpload, SourceKind};
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Analyzes chunks of one document type through a completion model.
pub struct ModelChunkAnalyzer {
    model: Arc<dyn CompletionModel>,
    document_type: DocumentType,
    system_prompt: String,
    settings: CompletionSettings,
}

impl ModelChunkAnalyzer {
    pub fn new(
        model: Arc<dyn CompletionModel>,
        document_type: DocumentType,
        settings: CompletionSettings,
    ) -> Self {
        Self {
            model,
            document_type,
            system_prompt: system_prompt(chunk_prompt(document_type)),
            settings,
        }
    }
}

#[async_trait::async_trait]
impl ChunkAnalyzer for ModelChunkAnalyzer {
    async fn analyze(&self, content: &str, context: &ChunkContext) -> Result<String> {
        let user_content = format!(
            "{} section {} of {}:\n\n{}",
            self.document_type.display_name(),
            context.index + 1,
            context.total,
            content
        );
        self.model
            .complete(&self.system_prompt, &user_content, self.settings)
            .await
    }
}

/// Result for one uploaded file: its analysis or the reason it failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentOutcome {
    pub file_name: String,
    pub document_type: DocumentType,
    pub analysis: Option<DocumentAnalysis>,
    pub error: Option<String>,
}

impl DocumentOutcome {
    pub fn is_success(&self) -> bool {
        self.analysis.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealAnalysis {
    pub documents: Vec<DocumentOutcome>,
    pub report: InvestmentReport,
    pub generated_at: DateTime<Utc>,
}

/// End-to-end driver: extraction, chunked analysis, per-document summary and
/// the final investment report.
pub struct DealAnalyzer {
    model: Arc<dyn CompletionModel>,
    config: AnalysisConfig,
    synthesizer: Synthesizer,
}

impl DealAnalyzer {
    pub fn new(model: Arc<dyn CompletionModel>, config: AnalysisConfig) -> Self {
        let synthesizer = Synthesizer::new(Arc::clone(&model))
            .with_summary_settings(config.summary_settings())
            .with_synthesis_settings(config.synthesis_settings())
            .with_retry_policy(config.retry_policy());

        Self {
            model,
            config,
            synthesizer,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Text that gets chunked and analyzed for one upload.
    pub fn prepare_text(&self, upload: &DocumentUpload) -> Result<String> {
        let source = upload
            .validate()
            .map_err(|e| e.in_document(&upload.file_name, Stage::Validation))?;

        let text = match (source, upload.document_type) {
            (SourceKind::Pdf, _) => {
                let text = extract_pdf_text(&upload.bytes)
                    .map_err(|e| e.in_document(&upload.file_name, Stage::Extraction))?;
                offering_memo_text(&text)
            }
            (SourceKind::Spreadsheet(format), document_type) => {
                let grid = extract_spreadsheet_grid(&upload.bytes, format)
                    .map_err(|e| e.in_document(&upload.file_name, Stage::Extraction))?;

                match document_type {
                    DocumentType::Financials => {
                        let records = normalize_statement(&grid);
                        if records.is_empty() {
                            warn!(
                                "No statement lines recognized in '{}', analyzing the raw grid",
                                upload.file_name
                            );
                            grid_to_text(&grid)
                        } else {
                            render_statement(&records)
                        }
                    }
                    _ => rent_roll_text(&grid),
                }
            }
        };

        if text.trim().is_empty() {
            return Err(AnalysisError::Extraction("document has no content".to_string())
                .in_document(&upload.file_name, Stage::Extraction));
        }
        Ok(text)
    }

    pub async fn analyze_document(&self, upload: &DocumentUpload) -> Result<DocumentAnalysis> {
        info!(
            "Analyzing '{}' as {}",
            upload.file_name, upload.document_type
        );

        let text = self.prepare_text(upload)?;
        let chunks = chunk_text(&text, self.config.max_chunk_size);
        info!(
            "'{}' split into {} chunks ({} chars)",
            upload.file_name,
            chunks.len(),
            text.len()
        );

        let analyzer = Arc::new(ModelChunkAnalyzer::new(
            Arc::clone(&self.model),
            upload.document_type,
            self.config.chunk_settings(),
        ));
        let results = self.config.dispatcher().dispatch(chunks, analyzer).await;

        let failed = results.iter().filter(|r| r.text.is_empty()).count();
        if failed > 0 {
            warn!(
                "{} of {} chunks of '{}' produced no analysis",
                failed,
                results.len(),
                upload.file_name
            );
        }

        let raw_chunk_analyses: Vec<String> = results.into_iter().map(|r| r.text).collect();
        let summary = self
            .synthesizer
            .summarize_document(&raw_chunk_analyses, upload.document_type)
            .await
            .map_err(|e| e.in_document(&upload.file_name, Stage::Summary))?;

        Ok(DocumentAnalysis {
            file_name: upload.file_name.clone(),
            document_type: upload.document_type,
            summary,
            raw_chunk_analyses,
        })
    }

    /// Analyzes every upload, then synthesizes the report from the ones that succeeded.
    ///
    /// A failing file is recorded in its [`DocumentOutcome`] and does not stop the
    /// others. Fails only when no document could be summarized or the final
    /// synthesis call fails.
    pub async fn analyze_deal(&self, uploads: Vec<DocumentUpload>) -> Result<DealAnalysis> {
        if uploads.is_empty() {
            return Err(AnalysisError::InvalidUpload("No files provided".to_string()));
        }

        let mut documents = Vec::with_capacity(uploads.len());
        for upload in &uploads {
            let outcome = match self.analyze_document(upload).await {
                Ok(analysis) => DocumentOutcome {
                    file_name: upload.file_name.clone(),
                    document_type: upload.document_type,
                    analysis: Some(analysis),
                    error: None,
                },
                Err(e) => {
                    error!("{}", e);
                    DocumentOutcome {
                        file_name: upload.file_name.clone(),
                        document_type: upload.document_type,
                        analysis: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            documents.push(outcome);
        }

        let analyses: Vec<DocumentAnalysis> = documents
            .iter()
            .filter_map(|d| d.analysis.clone())
            .collect();

        if analyses.is_empty() {
            return Err(AnalysisError::Synthesis(format!(
                "none of the {} documents could be analyzed",
                documents.len()
            )));
        }

        let report = self
            .synthesizer
            .synthesize_investment_report(&analyses)
            .await?;

        info!(
            "Investment report ready: {} of {} documents analyzed",
            analyses.len(),
            documents.len()
        );

        Ok(DealAnalysis {
            documents,
            report,
            generated_at: Utc::now(),
        })
    }
}

/// Offering memo input: a block of key property facts ahead of the full text.
fn offering_memo_text(text: &str) -> String {
    let key_lines = key_property_lines(text);
    if key_lines.is_empty() {
        return text.to_string();
    }
    format!(
        "KEY PROPERTY FACTS:\n{}\n\nFULL TEXT:\n{}",
        key_lines.join("\n"),
        text
    )
}
