use crate::completion::{CompletionModel, CompletionSettings};
use crate::config::AnalysisConfig;
use crate::dispatcher::RetryPolicy;
use crate::error::{AnalysisError, Result};
use crate::prompts::{summary_prompt, system_prompt, SYNTHESIS_PROMPT};
use crate::schema::{DocumentAnalysis, DocumentType, InvestmentReport};
use log::{debug, info};
use std::sync::Arc;

/// Second-pass reductions: chunk analyses into a document summary, and document
/// summaries into the deal-level investment report.
pub struct Synthesizer {
    model: Arc<dyn CompletionModel>,
    summary_settings: CompletionSettings,
    synthesis_settings: CompletionSettings,
    retry: RetryPolicy,
}

impl Synthesizer {
    /// Uses the default summary and synthesis settings of [`AnalysisConfig`], without retries.
    pub fn new(model: Arc<dyn CompletionModel>) -> Self {
        let defaults = AnalysisConfig::default();
        Self {
            model,
            summary_settings: defaults.summary_settings(),
            synthesis_settings: defaults.synthesis_settings(),
            retry: RetryPolicy::new(0, std::time::Duration::ZERO),
        }
    }

    pub fn with_summary_settings(mut self, settings: CompletionSettings) -> Self {
        self.summary_settings = settings;
        self
    }

    pub fn with_synthesis_settings(mut self, settings: CompletionSettings) -> Self {
        self.synthesis_settings = settings;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Compresses the ordered chunk analyses of one document into a single summary.
    pub async fn summarize_document(
        &self,
        chunk_analyses: &[String],
        document_type: DocumentType,
    ) -> Result<String> {
        if chunk_analyses.iter().all(|a| a.trim().is_empty()) {
            return Err(AnalysisError::Synthesis(format!(
                "no usable chunk analyses for {}",
                document_type.display_name()
            )));
        }

        let combined = combine_chunk_analyses(chunk_analyses);
        let system = system_prompt(summary_prompt(document_type));
        debug!(
            "Summarizing {} sections of {} ({} chars)",
            chunk_analyses.len(),
            document_type,
            combined.len()
        );

        self.retry
            .run(|_| self.model.complete(&system, &combined, self.summary_settings))
            .await
    }

    /// Folds all document summaries into one investment report.
    pub async fn synthesize_investment_report(
        &self,
        document_analyses: &[DocumentAnalysis],
    ) -> Result<InvestmentReport> {
        if document_analyses.is_empty() {
            return Err(AnalysisError::Synthesis(
                "no document analyses to synthesize".to_string(),
            ));
        }

        info!(
            "Synthesizing investment report from {} document summaries",
            document_analyses.len()
        );

        let input = build_synthesis_input(document_analyses);
        let system = system_prompt(SYNTHESIS_PROMPT);

        self.retry
            .run(|_| self.model.complete(&system, &input, self.synthesis_settings))
            .await
            .map_err(|e| AnalysisError::Synthesis(e.to_string()))
    }
}

/// Joins chunk analyses in order under 1-based section markers.
pub fn combine_chunk_analyses(chunk_analyses: &[String]) -> String {
    chunk_analyses
        .iter()
        .enumerate()
        .map(|(i, analysis)| {
            let body = if analysis.trim().is_empty() {
                "(analysis unavailable for this section)"
            } else {
                analysis.as_str()
            };
            format!("=== Section {} Analysis ===\n{}", i + 1, body)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Builds the synthesis input with one labeled block per document type.
pub fn build_synthesis_input(document_analyses: &[DocumentAnalysis]) -> String {
    let mut sections = Vec::with_capacity(DocumentType::ALL.len());

    for document_type in DocumentType::ALL {
        let mut block = format!(
            "=== {} ===\n",
            document_type.display_name().to_uppercase()
        );

        let summaries: Vec<&DocumentAnalysis> = document_analyses
            .iter()
            .filter(|a| a.document_type == document_type)
            .collect();

        if summaries.is_empty() {
            block.push_str(&format!(
                "No {} was provided.\n",
                document_type.display_name()
            ));
        } else {
            for analysis in summaries {
                block.push_str(&format!(
                    "--- {} ---\n{}\n",
                    analysis.file_name,
                    analysis.summary.trim()
                ));
            }
        }

        sections.push(block);
    }

    sections.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records every call and replies with a fixed answer.
    struct RecordingModel {
        reply: Option<String>,
        calls: Mutex<Vec<(String, String, CompletionSettings)>>,
    }

    impl RecordingModel {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                reply: None,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl CompletionModel for RecordingModel {
        async fn complete(
            &self,
            system_prompt: &str,
            user_content: &str,
            settings: CompletionSettings,
        ) -> Result<String> {
            self.calls.lock().unwrap().push((
                system_prompt.to_string(),
                user_content.to_string(),
                settings,
            ));
            self.reply
                .clone()
                .ok_or_else(|| AnalysisError::Completion("service unavailable".to_string()))
        }
    }

    fn analysis(file: &str, document_type: DocumentType, summary: &str) -> DocumentAnalysis {
        DocumentAnalysis {
            file_name: file.to_string(),
            document_type,
            summary: summary.to_string(),
            raw_chunk_analyses: vec![summary.to_string()],
        }
    }

    #[test]
    fn test_combine_uses_ordered_section_markers() {
        let combined = combine_chunk_analyses(&[
            "first".to_string(),
            String::new(),
            "third".to_string(),
        ]);

        let first = combined.find("=== Section 1 Analysis ===\nfirst").unwrap();
        let second = combined.find("=== Section 2 Analysis ===").unwrap();
        let third = combined.find("=== Section 3 Analysis ===\nthird").unwrap();
        assert!(first < second && second < third);
        assert!(combined.contains("(analysis unavailable for this section)"));
    }

    #[test]
    fn test_synthesis_input_groups_by_type() {
        let input = build_synthesis_input(&[
            analysis("t12.xlsx", DocumentType::Financials, "NOI is $410,000"),
            analysis("om.pdf", DocumentType::OfferingMemo, "Asking $6.2M"),
        ]);

        let om = input.find("=== OFFERING MEMORANDUM ===").unwrap();
        let rr = input.find("=== RENT ROLL ===").unwrap();
        let fin = input.find("=== T12 FINANCIAL STATEMENT ===").unwrap();
        assert!(om < rr && rr < fin);
        assert!(input.contains("--- om.pdf ---\nAsking $6.2M"));
        assert!(input.contains("No Rent Roll was provided."));
    }

    #[tokio::test]
    async fn test_summarize_document_makes_one_reduction_call() {
        let model = Arc::new(RecordingModel::replying("compressed summary"));
        let synthesizer = Synthesizer::new(model.clone());

        let summary = synthesizer
            .summarize_document(
                &["rents are $1,200".to_string(), "occupancy 94%".to_string()],
                DocumentType::RentRoll,
            )
            .await
            .unwrap();

        assert_eq!(summary, "compressed summary");
        let calls = model.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].0.contains("Rent Roll"));
        assert!(calls[0].1.contains("=== Section 2 Analysis ===\noccupancy 94%"));
        assert_eq!(calls[0].2, AnalysisConfig::default().summary_settings());
    }

    #[tokio::test]
    async fn test_summarize_document_rejects_all_empty_analyses() {
        let model = Arc::new(RecordingModel::replying("unused"));
        let synthesizer = Synthesizer::new(model.clone());

        let result = synthesizer
            .summarize_document(&[String::new(), "  ".to_string()], DocumentType::Financials)
            .await;

        assert!(matches!(result, Err(AnalysisError::Synthesis(_))));
        assert!(model.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_report_failure_is_surfaced_as_synthesis_error() {
        let synthesizer = Synthesizer::new(Arc::new(RecordingModel::failing()));
        let result = synthesizer
            .synthesize_investment_report(&[analysis("om.pdf", DocumentType::OfferingMemo, "x")])
            .await;

        assert!(matches!(result, Err(AnalysisError::Synthesis(_))));
    }

    #[tokio::test]
    async fn test_report_prompt_demands_explicit_missing_metrics() {
        let model = Arc::new(RecordingModel::replying("report"));
        let synthesizer = Synthesizer::new(model.clone());

        let report = synthesizer
            .synthesize_investment_report(&[analysis("om.pdf", DocumentType::OfferingMemo, "x")])
            .await
            .unwrap();

        assert_eq!(report, "report");
        let calls = model.calls.lock().unwrap();
        assert_eq!(calls[0].2, AnalysisConfig::default().synthesis_settings());
        assert!(calls[0].0.contains("NEVER fabricate"));
        assert!(calls[0].0.contains("IRR"));
    }
}
