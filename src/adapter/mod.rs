//! LLM and embedding adapters over the RealTimeX SDK.

pub mod embedding;
pub mod error;
pub mod llm;

pub use embedding::{EmbeddingRequest, EmbeddingResponse, RealtimeXEmbedding};
pub use error::{LlmError, LlmResult, map_sdk_error};
pub use llm::{CompletionRequest, RealtimeXLlm};
