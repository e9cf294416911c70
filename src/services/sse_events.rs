use serde::Serialize;
use tracing::{trace, warn};

use crate::{
    dto::{
        session::SessionView,
        sse::{
            ChallengeExpiredEvent, ChallengeSolvedEvent, GlobalLockEvent, JokerUsedEvent,
            ServerEvent, SessionUpdatedEvent, SystemStatus,
        },
    },
    state::{SharedState, clock::EpochMillis, jokers::JokerReport},
};

pub const EVENT_HANDSHAKE: &str = "handshake";
pub const EVENT_SESSION_UPDATED: &str = "session.updated";
pub const EVENT_CHALLENGE_EXPIRED: &str = "challenge.expired";
pub const EVENT_CHALLENGE_SOLVED: &str = "challenge.solved";
pub const EVENT_JOKER_USED: &str = "joker.used";
pub const EVENT_GLOBAL_LOCK: &str = "global.lock";
pub const EVENT_SYSTEM_STATUS: &str = "system.status";

/// Push the full session projection to every subscriber.
pub fn broadcast_session_updated(state: &SharedState, session: SessionView) {
    send_session_event(
        state,
        EVENT_SESSION_UPDATED,
        &SessionUpdatedEvent { session },
    );
}

/// Notify subscribers that the open challenge ran out of time.
pub fn broadcast_challenge_expired(state: &SharedState, challenge_id: &str, deadline: EpochMillis) {
    send_session_event(
        state,
        EVENT_CHALLENGE_EXPIRED,
        &ChallengeExpiredEvent {
            challenge_id: challenge_id.to_string(),
            deadline,
        },
    );
}

/// Notify subscribers that a challenge was solved.
pub fn broadcast_challenge_solved(state: &SharedState, challenge_id: &str, points: u64, score: u64) {
    send_session_event(
        state,
        EVENT_CHALLENGE_SOLVED,
        &ChallengeSolvedEvent {
            challenge_id: challenge_id.to_string(),
            points,
            score,
        },
    );
}

/// Notify subscribers that a joker has been applied.
pub fn broadcast_joker_used(state: &SharedState, report: &JokerReport) {
    send_session_event(
        state,
        EVENT_JOKER_USED,
        &JokerUsedEvent {
            kind: report.kind,
            uses: report.uses,
            max: report.max,
            effect: report.effect.clone().into(),
        },
    );
}

/// Notify subscribers that the board got locked, or unlocked by extra time.
pub fn broadcast_global_lock(state: &SharedState, locked: bool, global_deadline: EpochMillis) {
    send_session_event(
        state,
        EVENT_GLOBAL_LOCK,
        &GlobalLockEvent {
            locked,
            global_deadline,
        },
    );
}

/// Notify subscribers that persistence entered or left degraded mode.
pub fn broadcast_system_status(state: &SharedState, degraded: bool) {
    send_session_event(state, EVENT_SYSTEM_STATUS, &SystemStatus { degraded });
}

fn send_session_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    if !state.events().has_subscribers() {
        return;
    }
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(server_event) => {
            let delivered = state.events().publish(server_event);
            trace!(event, delivered, "session event published");
        }
        Err(err) => warn!(event, error = %err, "failed to serialize session SSE payload"),
    }
}
