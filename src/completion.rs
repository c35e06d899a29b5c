use crate::error::Result;

/// Sampling settings for one completion call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionSettings {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl CompletionSettings {
    pub fn new(temperature: f32, max_tokens: u32) -> Self {
        Self {
            temperature,
            max_tokens,
        }
    }
}

/// Single-shot text completion over a network boundary.
///
/// Calls may fail transiently; callers that need resilience wrap them in a
/// [`RetryPolicy`](crate::dispatcher::RetryPolicy).
#[async_trait::async_trait]
pub trait CompletionModel: Send + Sync {
    async fn complete(
        &self,
        system_prompt: &str,
        user_content: &str,
        settings: CompletionSettings,
    ) -> Result<String>;
}
