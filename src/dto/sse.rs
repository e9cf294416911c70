use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::session::{JokerEffectView, SessionView};
use crate::state::jokers::JokerKind;

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Identifier of the SSE stream.
    pub stream: String,
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Whether session snapshots are currently failing to persist.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Broadcast when the open challenge runs out of time.
pub struct ChallengeExpiredEvent {
    pub challenge_id: String,
    pub deadline: u64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Broadcast when a challenge is solved.
pub struct ChallengeSolvedEvent {
    pub challenge_id: String,
    pub points: u64,
    pub score: u64,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast after a joker has been applied.
pub struct JokerUsedEvent {
    pub kind: JokerKind,
    pub uses: u32,
    pub max: u32,
    pub effect: JokerEffectView,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Broadcast when the board becomes globally locked or is unlocked by extra time.
pub struct GlobalLockEvent {
    pub locked: bool,
    pub global_deadline: u64,
}

#[derive(Debug, Serialize, ToSchema)]
/// Full session projection pushed after every change.
pub struct SessionUpdatedEvent {
    pub session: SessionView,
}
