use thiserror::Error;

use crate::adapter::error::LlmError;
use crate::config::ConfigError;
use crate::pipeline::{PipelineError, RegistryError};
use crate::realtimex::{apply::ApplyError, sdk::SdkError};

#[derive(Error, Debug)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
    #[error("SDK error: {0}")]
    Sdk(#[from] SdkError),
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
    #[error("Apply error: {0}")]
    Apply(#[from] ApplyError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type InternalResult<T> = Result<T, Error>;

impl Error {
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Error::Internal(message.into())
    }
}
