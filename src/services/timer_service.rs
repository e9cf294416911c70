use tokio::time::{MissedTickBehavior, interval};
use tracing::info;

use crate::{
    dto::session::SessionView,
    services::sse_events::{
        broadcast_challenge_expired, broadcast_global_lock, broadcast_session_updated,
    },
    state::{SharedState, session::TimerReport},
};

/// Re-evaluate the session clocks forever on the configured cadence.
pub async fn run(state: SharedState) {
    let mut ticker = interval(state.timings().tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(tick_ms = state.timings().tick.as_millis() as u64, "session timer started");

    loop {
        ticker.tick().await;
        tick(&state).await;
    }
}

/// One evaluation: expire the open challenge when due and report global lock transitions.
///
/// Quiet ticks neither publish a snapshot nor emit an event.
pub async fn tick(state: &SharedState) -> TimerReport {
    let (report, view, expired_deadline, global_deadline) = state
        .update_session(|session, rules, now| {
            let report = session.evaluate_timers(now);
            let changed = report.mutated();
            let expired_deadline = report
                .expired
                .as_deref()
                .and_then(|id| session.deadline(id));
            let view = changed.then(|| SessionView::build(session, rules, now));
            (
                (report, view, expired_deadline, session.global_deadline()),
                changed,
            )
        })
        .await;

    if let Some(challenge_id) = &report.expired {
        let deadline = expired_deadline.unwrap_or_default();
        info!(%challenge_id, deadline, "challenge expired");
        broadcast_challenge_expired(state, challenge_id, deadline);
    }

    if state.update_global_lock(report.globally_locked) {
        if report.globally_locked {
            info!(global_deadline, "global deadline reached; board locked");
        } else {
            info!(global_deadline, "global deadline extended; board unlocked");
        }
        broadcast_global_lock(state, report.globally_locked, global_deadline);
    }

    if let Some(view) = view {
        broadcast_session_updated(state, view);
    }
    report
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
            jokers::WildcardOutcome,
            session::fixtures::{T0, rules, session},
        },
    };

    fn app() -> (SharedState, Arc<ManualClock>) {
        let rules = Arc::new(rules());
        let clock = Arc::new(ManualClock::new(T0));
        let state = AppState::new(
            rules.clone(),
            session(&rules),
            Collaborators {
                clock: clock.clone(),
                verifier: Arc::new(CatalogVerifier::new(rules)),
                store: Arc::new(MemorySessionStore::new()),
            },
            SessionTimings::default(),
        );
        (state, clock)
    }

    async fn open(state: &SharedState, id: &str) {
        state
            .mutate_session(|session, rules, now| session.open(rules, id, now))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn quiet_tick_publishes_nothing() {
        let (state, _clock) = app();
        open(&state, "web-1").await;
        let mut snapshots = state.snapshot_watcher();
        snapshots.borrow_and_update();

        let report = tick(&state).await;

        assert_eq!(report, TimerReport::default());
        assert!(!snapshots.has_changed().unwrap());
    }

    #[tokio::test]
    async fn expiry_is_recorded_once() {
        let (state, clock) = app();
        open(&state, "web-1").await;
        clock.set(120_000);

        let first = tick(&state).await;
        let second = tick(&state).await;

        assert_eq!(first.expired.as_deref(), Some("web-1"));
        assert_eq!(second.expired, None);
        let expired = state
            .read_session(|session, _, _| session.expired().contains("web-1"))
            .await;
        assert!(expired);
    }

    #[tokio::test]
    async fn global_lock_transitions_are_tracked() {
        let (state, clock) = app();
        let global_deadline = state
            .read_session(|session, _, _| session.global_deadline())
            .await;

        clock.set(global_deadline);
        assert!(tick(&state).await.globally_locked);
        assert!(state.is_globally_locked());

        state
            .mutate_session(|session, rules, _| {
                session.apply_wildcard(rules, WildcardOutcome::TimeBend)
            })
            .await
            .unwrap();
        assert!(!tick(&state).await.globally_locked);
        assert!(!state.is_globally_locked());
    }
}
