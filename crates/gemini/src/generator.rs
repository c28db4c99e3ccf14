//! [`ContentGenerator`] implementation on top of [`GeminiClient`].

use async_trait::async_trait;
use chaincast_core::ports::{ContentGenerator, GenerationError, GenerationRequest};

use crate::api::{GeminiClient, GeminiError};

impl GeminiError {
    pub fn into_generation_error(self, timeout: std::time::Duration) -> GenerationError {
        match self {
            GeminiError::Request(err) if err.is_timeout() => GenerationError::TimedOut(timeout),
            GeminiError::Request(err) if err.is_decode() => {
                GenerationError::Malformed(format!("unreadable response: {err}"))
            }
            GeminiError::Request(err) => GenerationError::Transport {
                message: err.to_string(),
            },
            GeminiError::ApiError { status, body } => GenerationError::Api { status, body },
            GeminiError::Blocked(reason) => {
                GenerationError::Malformed(format!("blocked by the model: {reason}"))
            }
            GeminiError::EmptyResponse => GenerationError::Malformed("empty response".to_string()),
        }
    }
}

#[async_trait]
impl ContentGenerator for GeminiClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        tracing::debug!(
            unit = %request.unit.slug,
            model = %self.config().model,
            prompt_chars = request.prompt.chars().count(),
            "Requesting generation",
        );
        self.generate_content(&request.prompt)
            .await
            .map_err(|e| e.into_generation_error(self.config().timeout))
    }
}
