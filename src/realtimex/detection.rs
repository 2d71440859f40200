use serde::Serialize;

/// Outcome of the remote health stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HealthStatus {
    /// An earlier stage failed, so no remote call was made.
    NotChecked,
    Healthy { mode: Option<String> },
    Unhealthy { reason: String },
}

/// Evidence collected by one detection pass.
///
/// The stages run strictly in order and stop at the first failure:
/// app id present, SDK installed, remote health check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionReport {
    pub app_id_present: bool,
    pub sdk_installed: bool,
    pub health: HealthStatus,
}

impl DetectionReport {
    pub(crate) fn missing_app_id() -> Self {
        Self {
            app_id_present: false,
            sdk_installed: false,
            health: HealthStatus::NotChecked,
        }
    }

    pub(crate) fn not_installed() -> Self {
        Self {
            app_id_present: true,
            sdk_installed: false,
            health: HealthStatus::NotChecked,
        }
    }

    pub(crate) fn checked(health: HealthStatus) -> Self {
        Self {
            app_id_present: true,
            sdk_installed: true,
            health,
        }
    }

    pub fn usable(&self) -> bool {
        self.app_id_present
            && self.sdk_installed
            && matches!(self.health, HealthStatus::Healthy { .. })
    }
}
