use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use thiserror::Error;
use tracing::{info, instrument};

use crate::selection::{ConfigType, Selection, SelectionStore};

use super::context::RealtimeXContext;

/// Id the unified config manager is pointed at while RealTimeX is active.
pub const RTX_CONFIG_ID: &str = "rtx";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApplyError {
    #[error("RealTimeX is not available")]
    Unavailable,

    #[error("Invalid config type '{0}', expected one of: {valid}", valid = valid_config_types())]
    InvalidConfigType(String),

    #[error("Failed to persist {0} selection")]
    Persist(ConfigType),

    #[error("Failed to activate RealTimeX config: {0}")]
    Sink(String),
}

pub type ApplyResult<T> = Result<T, ApplyError>;

/// The unified config manager that decides which configuration is active
/// per config type.
#[mockall::automock]
pub trait ActiveConfigSink: Send + Sync {
    fn set_active(&self, config_type: ConfigType, config_id: &str) -> ApplyResult<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigApplyRequest {
    pub config_type: String,
    pub provider: String,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyOutcome {
    pub success: bool,
    pub config_type: ConfigType,
    pub active: Selection,
}

/// Make a RealTimeX provider/model the active configuration.
///
/// The selection store holds the provider and model; the config manager only
/// learns that the `rtx` configuration is active for the type.
#[instrument(level = "debug", skip(ctx, store, sink))]
pub fn apply_config(
    ctx: &RealtimeXContext,
    store: &SelectionStore,
    sink: &dyn ActiveConfigSink,
    request: &ConfigApplyRequest,
) -> ApplyResult<ApplyOutcome> {
    if !ctx.should_use(false) {
        return Err(ApplyError::Unavailable);
    }
    let config_type = ConfigType::from_str(&request.config_type)
        .map_err(|_| ApplyError::InvalidConfigType(request.config_type.clone()))?;

    if !store.set(config_type, &request.provider, &request.model) {
        return Err(ApplyError::Persist(config_type));
    }
    sink.set_active(config_type, RTX_CONFIG_ID)?;

    info!(
        "Applied RealTimeX {} config: {}/{}",
        config_type, request.provider, request.model
    );
    Ok(ApplyOutcome {
        success: true,
        config_type,
        active: Selection {
            provider: request.provider.clone(),
            model: request.model.clone(),
        },
    })
}

fn valid_config_types() -> String {
    ConfigType::iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
