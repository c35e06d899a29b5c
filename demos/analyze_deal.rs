use dotenv::dotenv;
use property_deal_analyzer::llm::GeminiClient;
use property_deal_analyzer::{AnalysisConfig, DealAnalyzer, DocumentType, DocumentUpload};
use std::path::Path;
use std::sync::Arc;

const USAGE: &str = "usage: analyze_deal om=<memo.pdf> rr=<rent_roll.xlsx> t12=<statement.xlsx>";

fn parse_uploads(args: &[String]) -> anyhow::Result<Vec<DocumentUpload>> {
    let mut uploads = Vec::new();
    for arg in args {
        let (kind, path) = arg
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("expected type=path, got '{}'\n{}", arg, USAGE))?;
        let document_type: DocumentType = kind.parse()?;
        uploads.push(DocumentUpload::from_file(Path::new(path), document_type)?);
    }

    if uploads.is_empty() {
        anyhow::bail!(USAGE);
    }
    Ok(uploads)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let api_key = std::env::var("GEMINI_API_KEY").expect("GEMINI_API_KEY must be set");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let uploads = parse_uploads(&args)?;

    let config = AnalysisConfig::from_env()?;
    let mut client = GeminiClient::new(api_key, config.model.clone())?;
    if let Ok(base_url) = std::env::var("GEMINI_BASE_URL") {
        client = client.with_base_url(base_url);
    }

    println!(
        "🏢 Analyzing {} documents with {}",
        uploads.len(),
        client.model()
    );

    let analyzer = DealAnalyzer::new(Arc::new(client), config);
    println!(
        "   chunk size {}, concurrency {}, retries {}\n",
        analyzer.config().max_chunk_size,
        analyzer.config().concurrency_limit,
        analyzer.config().max_retries
    );

    let deal = analyzer.analyze_deal(uploads).await?;

    for outcome in &deal.documents {
        match (&outcome.analysis, &outcome.error) {
            (Some(analysis), _) => println!(
                "✅ {} ({}): {} sections analyzed",
                outcome.file_name,
                outcome.document_type.display_name(),
                analysis.raw_chunk_analyses.len()
            ),
            (None, Some(error)) => println!("❌ {}: {}", outcome.file_name, error),
            (None, None) => println!("⚠️  {}: no result", outcome.file_name),
        }
    }

    println!("\n================ INVESTMENT REPORT ================\n");
    println!("{}", deal.report);
    println!("\nGenerated at {}", deal.generated_at.to_rfc3339());

    Ok(())
}
