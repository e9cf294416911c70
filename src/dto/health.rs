use serde::Serialize;
use utoipa::ToSchema;

/// Overall service condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Session writes are reaching the store.
    Ok,
    /// The store is unreachable; the session keeps running from memory.
    Degraded,
}

/// Payload of the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: HealthStatus,
    /// Session persistence backend in use.
    pub store: &'static str,
}

impl HealthResponse {
    /// Report `store` in the given condition.
    pub fn new(status: HealthStatus, store: &'static str) -> Self {
        Self { status, store }
    }
}
