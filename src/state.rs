use std::sync::Arc;

use crate::{
    adapter::{LlmResult, RealtimeXEmbedding, RealtimeXLlm},
    config::AppConfig,
    pipeline::{Pipeline, PipelineOptions, PipelineRegistry, RegistryResult},
    realtimex::{ProvidersCache, RealtimeXContext},
    selection::{ConfigType, SelectionStore},
};

/// Long-lived process state, built once at startup and passed by reference.
#[derive(Debug)]
pub struct AppState {
    pub config: AppConfig,
    pub registry: PipelineRegistry,
    pub realtimex: Arc<RealtimeXContext>,
    pub providers: ProvidersCache,
    pub selection: SelectionStore,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let realtimex = Arc::new(RealtimeXContext::from_config(config.realtimex.clone()));
        Self::with_context(config, realtimex)
    }

    pub fn with_context(config: AppConfig, realtimex: Arc<RealtimeXContext>) -> Self {
        Self {
            registry: PipelineRegistry::new(),
            providers: ProvidersCache::new(config.realtimex.providers_ttl),
            selection: SelectionStore::from_config(&config),
            realtimex,
            config,
        }
    }

    /// Pipeline `name`, or the configured default, rooted at the configured
    /// knowledge-base directory.
    pub fn pipeline(
        &self,
        name: Option<&str>,
        options: &PipelineOptions,
    ) -> RegistryResult<Arc<dyn Pipeline>> {
        let name = name.unwrap_or(&self.config.default_pipeline);
        let kb_base_dir = self.config.kb_base_dir();
        self.registry.get(name, Some(kb_base_dir.as_path()), options)
    }

    pub fn llm(&self) -> LlmResult<RealtimeXLlm> {
        RealtimeXLlm::from_context(&self.realtimex)
    }

    /// Embedding adapter preconfigured with the active embedding selection.
    pub fn embedding(&self) -> LlmResult<RealtimeXEmbedding> {
        let adapter = RealtimeXEmbedding::from_context(&self.realtimex)?;
        Ok(
            match self.selection.get(ConfigType::Embedding) {
                Some(selection) => adapter.with_model(selection.model),
                None => adapter,
            },
        )
    }
}
