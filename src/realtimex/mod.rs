//! RealTimeX desktop integration: SDK handle, detection, provider listings,
//! status and config apply.

pub mod apply;
pub mod context;
pub mod detection;
pub mod http;
pub mod providers;
pub mod sdk;
pub mod status;

pub use apply::{ActiveConfigSink, ApplyError, ApplyOutcome, ConfigApplyRequest, apply_config};
pub use context::RealtimeXContext;
pub use detection::{DetectionReport, HealthStatus};
pub use providers::{ProvidersCache, ProvidersSnapshot};
pub use sdk::{RealtimeXSdk, SdkConnector, SdkError};
pub use status::RealtimeXStatus;
