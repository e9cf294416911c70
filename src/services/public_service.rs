//! Static content projections, the gateway endpoint and easter eggs.

use tracing::{debug, info};

use crate::{
    dto::{
        public::{ChallengesResponse, ConfigResponse, EasterEggResponse, SubmitResponse},
        session::SessionView,
    },
    gateway::CatalogVerifier,
    services::sse_events::broadcast_session_updated,
    state::{SharedState, easter_eggs::MISS_MESSAGE},
};

/// Game metadata and rule tables.
pub fn get_config(state: &SharedState) -> ConfigResponse {
    state.rules().as_ref().into()
}

/// Public catalog, without flag material.
pub fn get_challenges(state: &SharedState) -> ChallengesResponse {
    ChallengesResponse {
        categories: state
            .rules()
            .catalog
            .categories()
            .map(Into::into)
            .collect(),
    }
}

/// Judge an answer against the catalog. This never touches the session.
pub fn verify_flag(state: &SharedState, challenge_id: &str, answer: &str) -> SubmitResponse {
    let verdict = CatalogVerifier::new(state.rules().clone()).judge(challenge_id, answer);
    debug!(%challenge_id, correct = verdict.correct, "gateway verdict");
    SubmitResponse {
        ok: verdict.correct,
        points: verdict.points,
    }
}

/// Apply the easter egg triggered by `text`, if any.
pub async fn trigger_easter_egg(state: &SharedState, text: &str) -> EasterEggResponse {
    let Some(egg) = state.rules().easter_eggs.lookup(text).cloned() else {
        return EasterEggResponse {
            ok: false,
            reward: None,
            message: MISS_MESSAGE.to_string(),
            score: None,
        };
    };

    let (score, view) = state
        .update_session(|session, rules, now| {
            let before = session.score();
            let score = session.adjust_score(egg.reward);
            (
                (score, SessionView::build(session, rules, now)),
                score != before,
            )
        })
        .await;

    info!(trigger = %egg.trigger, reward = egg.reward, score, "easter egg triggered");
    broadcast_session_updated(state, view);
    EasterEggResponse {
        ok: true,
        reward: Some(egg.reward),
        message: egg.response,
        score: Some(score),
    }
}
