use serde::{Deserialize, Serialize};
use tracing::warn;

use super::context::RealtimeXContext;

/// Connection status reported to the frontend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeXStatus {
    pub connected: bool,
    pub mode: Option<String>,
    pub app_id: Option<String>,
    pub timestamp: Option<String>,
    pub error: Option<String>,
}

impl RealtimeXContext {
    /// Current connection status. Remote failures are reported in `error`
    /// rather than returned as errors.
    pub async fn status(&self) -> RealtimeXStatus {
        if !self.should_use(false) {
            return RealtimeXStatus::default();
        }

        let sdk = match self.handle() {
            Ok(sdk) => sdk,
            Err(e) => {
                return RealtimeXStatus {
                    error: Some(e.to_string()),
                    ..Default::default()
                };
            }
        };

        match sdk.ping().await {
            Ok(ping) => RealtimeXStatus {
                connected: ping.success,
                mode: ping.mode,
                app_id: ping.app_id,
                timestamp: ping.timestamp,
                error: None,
            },
            Err(e) => {
                warn!("RealTimeX status ping failed: {}", e);
                RealtimeXStatus {
                    app_id: self.app_id(),
                    error: Some(e.to_string()),
                    ..Default::default()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Arc};

    use super::*;
    use crate::{
        config::{Environment, RealtimeXConfig},
        realtimex::sdk::{MockRealtimeXSdk, MockSdkConnector, PingResult, RealtimeXSdk, SdkError},
    };

    fn context(sdk: MockRealtimeXSdk) -> RealtimeXContext {
        let sdk: Arc<dyn RealtimeXSdk> = Arc::new(sdk);
        let mut connector = MockSdkConnector::new();
        connector.expect_is_installed().return_const(true);
        connector
            .expect_connect()
            .returning(move |_| Ok(sdk.clone()));
        let mut env = HashMap::new();
        env.insert("RTX_APP_ID".to_string(), "app-1".to_string());
        let env: Arc<dyn Environment> = Arc::new(env);
        RealtimeXContext::new(RealtimeXConfig::default(), Arc::new(connector), env)
    }

    fn healthy_detection(sdk: &mut MockRealtimeXSdk) {
        sdk.expect_ping_blocking().returning(|_| {
            Ok(PingResult {
                success: true,
                ..Default::default()
            })
        });
    }

    #[tokio::test]
    async fn test_status_when_not_detected() {
        let ctx = RealtimeXContext::new(
            RealtimeXConfig::default(),
            Arc::new(MockSdkConnector::new()),
            Arc::new(HashMap::<String, String>::new()),
        );
        let status = ctx.status().await;
        assert_eq!(status, RealtimeXStatus::default());
        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            serde_json::json!({
                "connected": false,
                "mode": null,
                "appId": null,
                "timestamp": null,
                "error": null
            })
        );
    }

    #[tokio::test]
    async fn test_status_reports_ping() {
        let mut sdk = MockRealtimeXSdk::new();
        healthy_detection(&mut sdk);
        sdk.expect_ping().returning(|| {
            Ok(PingResult {
                success: true,
                mode: Some("development".to_string()),
                app_id: Some("app-1".to_string()),
                timestamp: Some("2026-01-01T00:00:00Z".to_string()),
            })
        });
        let status = context(sdk).status().await;
        assert!(status.connected);
        assert_eq!(status.mode.as_deref(), Some("development"));
        assert_eq!(status.app_id.as_deref(), Some("app-1"));
        assert_eq!(status.error, None);
    }

    #[tokio::test]
    async fn test_status_passes_missing_ping_fields_through() {
        let mut sdk = MockRealtimeXSdk::new();
        healthy_detection(&mut sdk);
        sdk.expect_ping().returning(|| {
            Ok(PingResult {
                success: true,
                ..Default::default()
            })
        });
        let status = context(sdk).status().await;
        assert!(status.connected);
        assert_eq!(status.app_id, None);
        assert_eq!(status.timestamp, None);
    }

    #[tokio::test]
    async fn test_status_reports_ping_failure() {
        let mut sdk = MockRealtimeXSdk::new();
        healthy_detection(&mut sdk);
        sdk.expect_ping()
            .returning(|| Err(SdkError::Transport("timed out".to_string())));
        let status = context(sdk).status().await;
        assert!(!status.connected);
        assert_eq!(status.app_id.as_deref(), Some("app-1"));
        assert!(status.error.unwrap().contains("timed out"));
    }
}
