//! RAG pipeline providers.
//!
//! `PipelineRegistry` maps provider ids to factories. Optional providers are
//! probed once when the registry is first touched; a missing backend leaves an
//! unavailable descriptor behind instead of failing the process.

pub mod builtin;
pub mod local;
pub mod registry;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use builtin::{Builtin, ProviderModule};
pub use local::LocalPipeline;
pub use registry::{PipelineRegistry, ProviderDescriptor, RegistryError, RegistryResult};

/// Free-form keyword options handed to a factory.
pub type PipelineOptions = serde_json::Map<String, serde_json::Value>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Knowledge base not found: {0}")]
    KnowledgeBaseNotFound(String),

    #[error("Invalid knowledge base name: {0}")]
    InvalidKbName(String),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SearchMode {
    Naive,
    #[default]
    Hybrid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub source: String,
    pub text: String,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub query: String,
    pub kb_name: String,
    pub mode: SearchMode,
    pub provider: String,
    /// Hits joined into one context block.
    pub content: String,
    pub sources: Vec<SearchHit>,
}

/// A pipeline instance bound to one knowledge-base root. The registry hands
/// instances out and forgets about them.
#[mockall::automock]
#[async_trait]
pub trait Pipeline: Send + Sync {
    fn name(&self) -> &str;

    fn kb_base_dir(&self) -> &Path;

    /// Ingest `files` into `kb_name`, creating the knowledge base if needed.
    async fn initialize(&self, kb_name: &str, files: Vec<PathBuf>) -> PipelineResult<bool>;

    async fn search(
        &self,
        query: &str,
        kb_name: &str,
        mode: SearchMode,
        options: &PipelineOptions,
    ) -> PipelineResult<SearchResult>;

    async fn delete(&self, kb_name: &str) -> PipelineResult<bool>;
}

impl std::fmt::Debug for dyn Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name())
            .field("kb_base_dir", &self.kb_base_dir())
            .finish()
    }
}

/// Raised by a factory. `MissingDependency` covers backends whose probe only
/// happens when an instance is built.
#[derive(Error, Debug)]
pub enum FactoryError {
    #[error("missing optional dependency: {0}")]
    MissingDependency(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

pub type PipelineFactory = Arc<
    dyn Fn(Option<&Path>, &PipelineOptions) -> Result<Arc<dyn Pipeline>, FactoryError>
        + Send
        + Sync,
>;

lazy_static! {
    static ref GLOBAL_REGISTRY: PipelineRegistry = PipelineRegistry::new();
}

/// Process-wide registry. Built-ins are loaded on first lookup, not here.
pub fn global() -> &'static PipelineRegistry {
    &GLOBAL_REGISTRY
}
