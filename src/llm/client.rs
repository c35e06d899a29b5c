use crate::completion::{CompletionModel, CompletionSettings};
use crate::error::{AnalysisError, Result};
use crate::llm::types::*;
use log::debug;
use reqwest::Client;
use std::time::Duration;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, model: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key,
            base_url: GEMINI_BASE_URL.to_string(),
            model: model.into(),
        })
    }

    /// Points the client at a different endpoint (proxies, local mocks).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub(crate) async fn generate_content(&self, payload: &GenerateContentRequest) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let res = self.client.post(&url).json(payload).send().await?;
        let status = res.status();

        if !status.is_success() {
            let err_text = res.text().await?;
            return Err(AnalysisError::Completion(format!(
                "Gemini API Error (status {}): {}",
                status, err_text
            )));
        }

        let body: GenerateContentResponse = res.json().await?;
        if let Some(reason) = body
            .candidates
            .as_ref()
            .and_then(|c| c.first())
            .and_then(|c| c.finish_reason.as_deref())
        {
            debug!("Gemini finished with reason {}", reason);
        }

        body.first_text().ok_or_else(|| {
            AnalysisError::Completion("Model returned no text content".to_string())
        })
    }
}

#[async_trait::async_trait]
impl CompletionModel for GeminiClient {
    async fn complete(
        &self,
        system_prompt: &str,
        user_content: &str,
        settings: CompletionSettings,
    ) -> Result<String> {
        let payload = GenerateContentRequest {
            contents: vec![Content::user(user_content)],
            system_instruction: Content::system(system_prompt),
            generation_config: GenerationConfig {
                temperature: settings.temperature,
                max_output_tokens: settings.max_tokens,
            },
        };

        self.generate_content(&payload).await
    }
}
