use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use crate::config::{Environment, ProcessEnv, RealtimeXConfig};

use super::{
    detection::{DetectionReport, HealthStatus},
    http::HttpConnector,
    sdk::{REQUIRED_PERMISSIONS, RealtimeXSdk, SdkConfig, SdkConnector, SdkResult},
};

/// Process state for the RealTimeX integration.
///
/// Holds the shared SDK handle and the cached detection result. Build one at
/// startup and pass it by reference; nothing here is a hidden global.
pub struct RealtimeXContext {
    config: RealtimeXConfig,
    connector: Arc<dyn SdkConnector>,
    env: Arc<dyn Environment>,
    handle: Mutex<Option<Arc<dyn RealtimeXSdk>>>,
    detection: Mutex<Option<bool>>,
}

impl RealtimeXContext {
    pub fn new(
        config: RealtimeXConfig,
        connector: Arc<dyn SdkConnector>,
        env: Arc<dyn Environment>,
    ) -> Self {
        Self {
            config,
            connector,
            env,
            handle: Mutex::new(None),
            detection: Mutex::new(None),
        }
    }

    /// Context backed by the HTTP client and the process environment.
    pub fn from_config(config: RealtimeXConfig) -> Self {
        Self::new(config, Arc::new(HttpConnector), Arc::new(ProcessEnv))
    }

    pub fn config(&self) -> &RealtimeXConfig {
        &self.config
    }

    pub fn app_id(&self) -> Option<String> {
        self.env.var(&self.config.app_id_env)
    }

    /// Shared SDK handle, constructed on first use with the full permission
    /// set. A failed construction is not remembered; the next call retries.
    pub fn handle(&self) -> SdkResult<Arc<dyn RealtimeXSdk>> {
        let mut slot = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(sdk) = slot.as_ref() {
            return Ok(sdk.clone());
        }

        let config = SdkConfig {
            permissions: REQUIRED_PERMISSIONS.to_vec(),
            base_url: self.config.base_url.clone(),
            app_id: self.app_id(),
        };
        match self.connector.connect(&config) {
            Ok(sdk) => {
                info!("RealTimeX SDK initialized with all required permissions");
                *slot = Some(sdk.clone());
                Ok(sdk)
            }
            Err(e) => {
                debug!("RealTimeX SDK construction failed: {}", e);
                Err(e)
            }
        }
    }

    /// Whether the RealTimeX integration is usable.
    ///
    /// The answer is cached for the life of the context; `force_check`
    /// runs the detection again and overwrites the cached value.
    pub fn should_use(&self, force_check: bool) -> bool {
        let mut cached = self.detection.lock().unwrap_or_else(PoisonError::into_inner);
        if let (Some(value), false) = (*cached, force_check) {
            return value;
        }
        let usable = self.detect().usable();
        *cached = Some(usable);
        usable
    }

    pub fn clear_detection_cache(&self) {
        *self.detection.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Run the three detection stages without touching the cache.
    pub fn detect(&self) -> DetectionReport {
        let Some(app_id) = self.app_id() else {
            debug!(
                "RealTimeX not detected: {} not set",
                self.config.app_id_env
            );
            return DetectionReport::missing_app_id();
        };

        if !self.connector.is_installed() {
            warn!(
                "RealTimeX detected ({} present) but the SDK client is not installed",
                self.config.app_id_env
            );
            return DetectionReport::not_installed();
        }

        let health = match self
            .handle()
            .and_then(|sdk| sdk.ping_blocking(self.config.health_timeout))
        {
            Ok(ping) if ping.success => {
                let mode = ping.mode.clone();
                info!(
                    "RealTimeX environment detected (app_id: {}, mode: {})",
                    app_id,
                    mode.as_deref().unwrap_or("unknown")
                );
                HealthStatus::Healthy { mode }
            }
            Ok(ping) => {
                warn!("RealTimeX ping failed: {:?}", ping);
                HealthStatus::Unhealthy {
                    reason: "ping reported failure".to_string(),
                }
            }
            Err(e) => {
                warn!("RealTimeX Main App not accessible: {}", e);
                HealthStatus::Unhealthy {
                    reason: e.to_string(),
                }
            }
        };
        DetectionReport::checked(health)
    }
}

impl std::fmt::Debug for RealtimeXContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeXContext")
            .field("base_url", &self.config.base_url)
            .field("app_id_env", &self.config.app_id_env)
            .finish()
    }
}
