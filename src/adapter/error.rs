use thiserror::Error;

use crate::realtimex::sdk::SdkError;

pub const PROVIDER_NAME: &str = "realtimex";

pub const RATE_LIMIT: &str = "RATE_LIMIT";
pub const LLM_STREAM_ERROR: &str = "LLM_STREAM_ERROR";
pub const LLM_ERROR: &str = "LLM_ERROR";

/// Local error kinds for LLM and embedding calls. Callers match on these
/// without knowing which remote produced them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    #[error("{message}")]
    Permission { permission: String, message: String },

    #[error("Rate limited by {provider}: {message}")]
    RateLimit { message: String, provider: String },

    #[error("Provider error{}: {message}", code_suffix(.code))]
    Provider {
        message: String,
        code: Option<String>,
    },

    #[error("API error from {provider}: {message}")]
    Api { message: String, provider: String },
}

pub type LlmResult<T> = Result<T, LlmError>;

impl LlmError {
    pub fn provider(message: impl Into<String>, code: impl Into<String>) -> Self {
        LlmError::Provider {
            message: message.into(),
            code: Some(code.into()),
        }
    }
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_deref().map(|c| format!(" [{c}]")).unwrap_or_default()
}

/// Translate a remote error into the local taxonomy. Every remote category
/// lands on exactly one local kind.
pub fn map_sdk_error(error: SdkError) -> LlmError {
    match error {
        SdkError::PermissionDenied { permission } => LlmError::Permission {
            message: format!("RealTimeX permission required: {permission}"),
            permission,
        },
        SdkError::Provider { code, message } if code == RATE_LIMIT => LlmError::RateLimit {
            message,
            provider: PROVIDER_NAME.to_string(),
        },
        SdkError::Provider { code, message } => LlmError::Provider {
            message,
            code: Some(code),
        },
        other @ (SdkError::Transport(_) | SdkError::NotInstalled(_) | SdkError::Other(_)) => {
            LlmError::Api {
                message: format!("RealTimeX SDK error: {other}"),
                provider: PROVIDER_NAME.to_string(),
            }
        }
    }
}

impl From<SdkError> for LlmError {
    fn from(error: SdkError) -> Self {
        map_sdk_error(error)
    }
}
