use std::sync::Arc;

use futures::{Stream, StreamExt};
use tracing::{debug, error, instrument};

use crate::realtimex::{
    context::RealtimeXContext,
    sdk::{ChatMessage, ChatOptions, RealtimeXSdk},
};

use super::error::{LLM_STREAM_ERROR, LlmError, LlmResult, map_sdk_error};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// A completion request in the shape callers use, independent of the SDK.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub system_prompt: String,
    pub model: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// When set, sent verbatim instead of `system_prompt` + `prompt`.
    pub messages: Option<Vec<ChatMessage>>,
    pub response_format: Option<serde_json::Value>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            model: None,
            temperature: 0.7,
            max_tokens: 1000,
            messages: None,
            response_format: None,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_messages(mut self, messages: Vec<ChatMessage>) -> Self {
        self.messages = Some(messages);
        self
    }

    pub fn with_response_format(mut self, response_format: serde_json::Value) -> Self {
        self.response_format = Some(response_format);
        self
    }

    pub fn build_messages(&self) -> Vec<ChatMessage> {
        match &self.messages {
            Some(messages) if !messages.is_empty() => messages.clone(),
            _ => vec![
                ChatMessage::system(self.system_prompt.clone()),
                ChatMessage::user(self.prompt.clone()),
            ],
        }
    }

    fn options(&self) -> ChatOptions {
        ChatOptions {
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            response_format: self.response_format.clone(),
        }
    }
}

/// Chat completion through the RealTimeX proxy.
#[derive(Clone)]
pub struct RealtimeXLlm {
    sdk: Arc<dyn RealtimeXSdk>,
}

impl RealtimeXLlm {
    pub fn new(sdk: Arc<dyn RealtimeXSdk>) -> Self {
        Self { sdk }
    }

    pub fn from_context(ctx: &RealtimeXContext) -> LlmResult<Self> {
        Ok(Self::new(ctx.handle().map_err(map_sdk_error)?))
    }

    #[instrument(level = "debug", skip(self, request), fields(model = ?request.model))]
    pub async fn complete(&self, request: &CompletionRequest) -> LlmResult<String> {
        let messages = request.build_messages();
        debug!(
            "RealTimeX complete: temp={}, max_tokens={}, messages_count={}, response_format={:?}",
            request.temperature,
            request.max_tokens,
            messages.len(),
            request.response_format
        );

        let response = self
            .sdk
            .chat(messages, request.options())
            .await
            .map_err(|e| {
                let mapped = map_sdk_error(e);
                error!("RealTimeX error: {}", mapped);
                mapped
            })?;

        if !response.success {
            error!("RealTimeX request failed: {:?}", response.error);
            return Err(LlmError::Provider {
                message: response
                    .error
                    .unwrap_or_else(|| "SDK request failed".to_string()),
                code: response.code,
            });
        }

        debug!(
            "RealTimeX response: provider={:?}, model={:?}",
            response.provider, response.model
        );
        if let Some(metrics) = &response.metrics {
            debug!(
                "Tokens: {} (prompt={}, completion={})",
                metrics.total_tokens, metrics.prompt_tokens, metrics.completion_tokens
            );
        }
        Ok(response.content.unwrap_or_default())
    }

    /// Stream text fragments. The stream ends after the first error; an
    /// error marker from the remote is never handed out as a fragment.
    pub fn stream(
        &self,
        request: &CompletionRequest,
    ) -> impl Stream<Item = LlmResult<String>> + Send + 'static {
        let sdk = self.sdk.clone();
        let messages = request.build_messages();
        let options = request.options();
        debug!(
            "RealTimeX stream: temp={}, max_tokens={}, messages_count={}",
            options.temperature,
            options.max_tokens,
            messages.len()
        );

        let stream = async_stream::try_stream! {
            let mut chunks = sdk
                .chat_stream(messages, options)
                .await
                .map_err(map_sdk_error)?;
            while let Some(chunk) = chunks.next().await {
                let chunk = chunk.map_err(map_sdk_error)?;
                if chunk.error {
                    error!("RealTimeX stream error detected");
                    Err::<(), _>(LlmError::provider("Stream error", LLM_STREAM_ERROR))?;
                }
                if let Some(text) = chunk.text.filter(|t| !t.is_empty()) {
                    yield text;
                }
            }
        };
        stream.inspect(|item: &LlmResult<String>| {
            if let Err(e) = item {
                error!("RealTimeX stream error: {}", e);
            }
        })
    }
}

impl std::fmt::Debug for RealtimeXLlm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeXLlm").finish_non_exhaustive()
    }
}
