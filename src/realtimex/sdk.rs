//! Typed view of the RealTimeX desktop SDK.
//!
//! Every field this crate reads from a remote response has a named field
//! here; nothing is accessed by attribute lookup. `RealtimeXSdk` is the seam
//! the adapters call through and `SdkConnector` is the "is the SDK installed,
//! build me a handle" step.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Permission scopes the SDK can be granted.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
pub enum Permission {
    #[strum(serialize = "llm.chat")]
    #[serde(rename = "llm.chat")]
    LlmChat,
    #[strum(serialize = "llm.providers")]
    #[serde(rename = "llm.providers")]
    LlmProviders,
    #[strum(serialize = "llm.embed")]
    #[serde(rename = "llm.embed")]
    LlmEmbed,
}

/// Union of the scopes any adapter in the process needs. The shared handle
/// is built with exactly this set.
pub const REQUIRED_PERMISSIONS: [Permission; 3] = [
    Permission::LlmChat,
    Permission::LlmProviders,
    Permission::LlmEmbed,
];

#[derive(Debug, Clone, PartialEq)]
pub struct SdkConfig {
    pub permissions: Vec<Permission>,
    pub base_url: String,
    pub app_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenMetrics {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub success: bool,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub metrics: Option<TokenMetrics>,
}

/// One streamed fragment. `error` marks a failed stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatChunk {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub error: bool,
}

impl ChatChunk {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            error: false,
        }
    }

    pub fn error() -> Self {
        Self {
            text: None,
            error: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbedResponse {
    pub success: bool,
    #[serde(default)]
    pub embeddings: Vec<Vec<f32>>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub dimensions: usize,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PingResult {
    pub success: bool,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default, rename = "appId")]
    pub app_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteProvider {
    pub provider: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub models: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ProviderCapability {
    Llm,
    Embedding,
}

/// Error categories raised by the remote side.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SdkError {
    #[error("permission required: {permission}")]
    PermissionDenied { permission: String },

    #[error("provider error [{code}]: {message}")]
    Provider { code: String, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("SDK not installed: {0}")]
    NotInstalled(String),

    #[error("{0}")]
    Other(String),
}

pub type SdkResult<T> = Result<T, SdkError>;

pub type ChunkStream = BoxStream<'static, SdkResult<ChatChunk>>;

#[mockall::automock]
#[async_trait]
pub trait RealtimeXSdk: Send + Sync {
    /// Scopes this handle was constructed with.
    fn permissions(&self) -> Vec<Permission>;

    /// Health check usable outside an async runtime.
    fn ping_blocking(&self, timeout: Duration) -> SdkResult<PingResult>;

    async fn ping(&self) -> SdkResult<PingResult>;

    async fn chat(&self, messages: Vec<ChatMessage>, options: ChatOptions)
    -> SdkResult<ChatResponse>;

    async fn chat_stream(
        &self,
        messages: Vec<ChatMessage>,
        options: ChatOptions,
    ) -> SdkResult<ChunkStream>;

    async fn embed(&self, input: Vec<String>, model: Option<String>) -> SdkResult<EmbedResponse>;

    async fn list_providers(
        &self,
        capability: ProviderCapability,
    ) -> SdkResult<Vec<RemoteProvider>>;
}

#[mockall::automock]
pub trait SdkConnector: Send + Sync {
    /// Whether the SDK client is available in this build.
    fn is_installed(&self) -> bool;

    fn connect(&self, config: &SdkConfig) -> SdkResult<Arc<dyn RealtimeXSdk>>;
}
