//! Health response DTOs.

use std::collections::BTreeMap;

use ink_core::{ServiceHealth, ServiceStatus};
use schemars::JsonSchema;
use serde::Serialize;

/// Health of one gateway component.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ComponentHealth {
    /// Component status.
    pub status: String,
    /// Optional state description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<ServiceHealth> for ComponentHealth {
    fn from(health: ServiceHealth) -> Self {
        let status = match health.status {
            ServiceStatus::Healthy => "healthy",
            ServiceStatus::Degraded => "degraded",
            ServiceStatus::Unhealthy => "unhealthy",
        };
        Self {
            status: status.to_owned(),
            message: health.message,
        }
    }
}

/// Response of `GET /health`.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct HealthResponse {
    /// Overall status: `ok` when every component is available.
    pub status: String,
    /// Gateway version.
    pub version: String,
    /// Per-component health.
    pub components: BTreeMap<String, ComponentHealth>,
}
