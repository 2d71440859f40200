use std::{collections::HashMap, sync::Arc};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, warn};

use crate::realtimex::{context::RealtimeXContext, sdk::RealtimeXSdk};

use super::error::{LlmError, LlmResult, PROVIDER_NAME, map_sdk_error};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    pub texts: Vec<String>,
    #[serde(default)]
    pub model: Option<String>,
}

impl EmbeddingRequest {
    pub fn new(texts: Vec<String>) -> Self {
        Self { texts, model: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    pub embeddings: Vec<Vec<f32>>,
    pub model: String,
    pub dimensions: usize,
    pub usage: HashMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub provider: &'static str,
    pub model: String,
    pub dimensions: Option<usize>,
    pub description: &'static str,
}

/// Embeddings through the RealTimeX proxy. No API key or endpoint is needed;
/// the app id carried by the SDK handle authenticates the calls.
#[derive(Clone)]
pub struct RealtimeXEmbedding {
    sdk: Arc<dyn RealtimeXSdk>,
    model: Option<String>,
    dimensions: Option<usize>,
}

impl RealtimeXEmbedding {
    pub fn new(sdk: Arc<dyn RealtimeXSdk>) -> Self {
        Self {
            sdk,
            model: None,
            dimensions: None,
        }
    }

    pub fn from_context(ctx: &RealtimeXContext) -> LlmResult<Self> {
        Ok(Self::new(ctx.handle().map_err(map_sdk_error)?))
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Expected dimensions. A mismatch is logged, never enforced.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    #[instrument(level = "debug", skip(self, request), fields(texts = request.texts.len()))]
    pub async fn embed(&self, request: EmbeddingRequest) -> LlmResult<EmbeddingResponse> {
        let model = request.model.or_else(|| self.model.clone());
        debug!(
            "RealTimeX embed: texts_count={}, model={}",
            request.texts.len(),
            model.as_deref().unwrap_or("default")
        );

        let result = self
            .sdk
            .embed(request.texts, model.clone())
            .await
            .map_err(|e| {
                let mapped = map_sdk_error(e);
                error!("RealTimeX embedding error: {}", mapped);
                mapped
            })?;

        if !result.success {
            let message = result
                .error
                .unwrap_or_else(|| "SDK request failed".to_string());
            error!("RealTimeX embed failed: {}", message);
            return Err(LlmError::Api {
                message: format!("RealTimeX embedding error: {message}"),
                provider: PROVIDER_NAME.to_string(),
            });
        }

        if let Some(expected) = self.dimensions {
            if expected != result.dimensions {
                warn!(
                    "Dimension mismatch: expected {}, got {} from {:?}",
                    expected, result.dimensions, result.model
                );
            }
        }

        debug!(
            "RealTimeX embed success: provider={:?}, model={:?}, dimensions={}, embeddings_count={}",
            result.provider,
            result.model,
            result.dimensions,
            result.embeddings.len()
        );
        Ok(EmbeddingResponse {
            embeddings: result.embeddings,
            model: result
                .model
                .or(model)
                .unwrap_or_else(|| "unknown".to_string()),
            dimensions: result.dimensions,
            usage: HashMap::new(),
        })
    }

    pub fn model_info(&self) -> ModelInfo {
        ModelInfo {
            provider: PROVIDER_NAME,
            model: self.model.clone().unwrap_or_else(|| "default".to_string()),
            dimensions: self.dimensions,
            description: "RealTimeX SDK embedding proxy",
        }
    }
}

impl std::fmt::Debug for RealtimeXEmbedding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeXEmbedding")
            .field("model", &self.model)
            .field("dimensions", &self.dimensions)
            .finish_non_exhaustive()
    }
}
