//! The built-in pipeline providers.
//!
//! Optional backends are gated by Cargo features. Each provider declares when
//! its backend is probed: at registration, so an unavailable descriptor is
//! listed up front, or deferred into the factory, so the failure only shows
//! when an instance is requested.

use std::{path::Path, sync::Arc};

use super::{
    FactoryError, Pipeline, PipelineFactory, PipelineOptions,
    local::{Chunking, LocalPipeline},
};

/// What a provider module exposes to the registry.
#[mockall::automock]
pub trait ProviderModule: Send + Sync {
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Checked once when the registry loads. `Err` carries the install hint
    /// and leaves the provider listed but unavailable.
    fn probe(&self) -> Result<(), String>;

    fn factory(&self) -> PipelineFactory;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parser {
    MinerU,
    Docling,
}

/// Retrieval engine behind a provider id. Aliases share an engine and are
/// therefore interchangeable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    KnowledgeGraph,
    Multimodal(Parser),
    Vector,
}

impl Engine {
    /// Name of the implementation, shared by every alias of the engine.
    pub fn implementation(&self) -> &'static str {
        match self {
            Engine::KnowledgeGraph => "lightrag",
            Engine::Multimodal(Parser::MinerU) => "raganything",
            Engine::Multimodal(Parser::Docling) => "raganything_docling",
            Engine::Vector => "llamaindex",
        }
    }

    fn chunking(&self) -> Chunking {
        match self {
            Engine::Vector => Chunking::Paragraphs,
            Engine::KnowledgeGraph | Engine::Multimodal(_) => Chunking::Lines,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeTime {
    Registration,
    Deferred,
}

#[derive(Debug, Clone)]
pub struct Builtin {
    id: &'static str,
    name: &'static str,
    description: &'static str,
    engine: Engine,
    /// Cargo feature providing the backend, if it is optional.
    feature: Option<&'static str>,
    enabled: bool,
    probe_time: ProbeTime,
}

impl Builtin {
    /// The five built-ins in listing order.
    pub fn all() -> Vec<Builtin> {
        vec![
            Builtin {
                id: "realtimex",
                name: "RealTimeX",
                description: "RealTimeX AI powered knowledge retrieval (recommended).",
                engine: Engine::KnowledgeGraph,
                feature: None,
                enabled: true,
                probe_time: ProbeTime::Registration,
            },
            Builtin {
                id: "lightrag",
                name: "LightRAG",
                description: "Lightweight knowledge graph retrieval, fast processing of text documents.",
                engine: Engine::KnowledgeGraph,
                feature: None,
                enabled: true,
                probe_time: ProbeTime::Registration,
            },
            Builtin {
                id: "raganything",
                name: "RAG-Anything (MinerU)",
                description: "Multimodal document processing with MinerU parser. Best for academic PDFs with complex equations and formulas.",
                engine: Engine::Multimodal(Parser::MinerU),
                feature: Some("raganything"),
                enabled: cfg!(feature = "raganything"),
                probe_time: ProbeTime::Registration,
            },
            Builtin {
                id: "raganything_docling",
                name: "RAG-Anything (Docling)",
                description: "Multimodal document processing with Docling parser. Better for Office documents (.docx, .pptx) and HTML. Easier to install.",
                engine: Engine::Multimodal(Parser::Docling),
                feature: Some("raganything"),
                enabled: cfg!(feature = "raganything"),
                probe_time: ProbeTime::Deferred,
            },
            Builtin {
                id: "llamaindex",
                name: "LlamaIndex",
                description: "Pure vector retrieval, fastest processing speed.",
                engine: Engine::Vector,
                feature: Some("llamaindex"),
                enabled: cfg!(feature = "llamaindex"),
                probe_time: ProbeTime::Registration,
            },
        ]
    }

    pub fn engine(&self) -> Engine {
        self.engine
    }

    pub fn probe_time(&self) -> ProbeTime {
        self.probe_time
    }

    /// Same provider with its backend forced on or off.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    fn install_hint(&self) -> String {
        match self.feature {
            Some(feature) => {
                format!("requires optional dependency: enable the '{feature}' feature")
            }
            None => "backend is not available".to_string(),
        }
    }
}

impl ProviderModule for Builtin {
    fn id(&self) -> &str {
        self.id
    }

    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn probe(&self) -> Result<(), String> {
        match (self.probe_time, self.enabled) {
            (ProbeTime::Deferred, _) | (ProbeTime::Registration, true) => Ok(()),
            (ProbeTime::Registration, false) => Err(self.install_hint()),
        }
    }

    fn factory(&self) -> PipelineFactory {
        let engine = self.engine;
        let enabled = self.enabled;
        let hint = self.install_hint();
        Arc::new(move |kb_base_dir: Option<&Path>, _options: &PipelineOptions| {
            if !enabled {
                return Err(FactoryError::MissingDependency(format!(
                    "{} backend: {}",
                    engine.implementation(),
                    hint
                )));
            }
            let pipeline: Arc<dyn Pipeline> = Arc::new(LocalPipeline::new(
                engine.implementation(),
                kb_base_dir,
                engine.chunking(),
            ));
            Ok(pipeline)
        })
    }
}
