use tracing::warn;

use crate::{
    dto::health::{HealthResponse, HealthStatus},
    state::SharedState,
};

/// Probe the session store and report degraded mode.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let store = state.store();
    let probe_failed = match store.health_check().await {
        Ok(()) => false,
        Err(err) => {
            warn!(backend = store.backend(), error = %err, "session store health check failed");
            true
        }
    };

    let status = if probe_failed || state.is_degraded() {
        HealthStatus::Degraded
    } else {
        HealthStatus::Ok
    };
    HealthResponse::new(status, store.backend())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        dao::session_store::MemorySessionStore,
        gateway::CatalogVerifier,
        state::{
            AppState, Collaborators, SessionTimings,
            clock::ManualClock,
            session::fixtures::{T0, rules, session},
        },
    };

    #[tokio::test]
    async fn degraded_flag_is_reported() {
        let rules = Arc::new(rules());
        let state = AppState::new(
            rules.clone(),
            session(&rules),
            Collaborators {
                clock: Arc::new(ManualClock::new(T0)),
                verifier: Arc::new(CatalogVerifier::new(rules)),
                store: Arc::new(MemorySessionStore::new()),
            },
            SessionTimings::default(),
        );

        assert_eq!(health_status(&state).await.status, HealthStatus::Ok);
        state.update_degraded(true);
        let health = health_status(&state).await;
        assert_eq!(health.status, HealthStatus::Degraded);
        assert_eq!(health.store, "memory");
    }
}
