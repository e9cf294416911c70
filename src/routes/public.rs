use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::public::{
        ChallengesResponse, ConfigResponse, EasterEggRequest, EasterEggResponse, SubmitRequest,
        SubmitResponse,
    },
    services::public_service,
    state::SharedState,
};

/// Static content endpoints, the verification gateway and easter eggs.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/config", get(get_config))
        .route("/api/challenges", get(get_challenges))
        .route("/api/submit", post(submit_flag))
        .route("/api/easter-egg", post(easter_egg))
}

#[utoipa::path(
    get,
    path = "/api/config",
    tag = "content",
    responses((status = 200, description = "Game metadata and rule tables", body = ConfigResponse))
)]
/// Return the game metadata, timer and scoring tables, and joker limits.
pub async fn get_config(State(state): State<SharedState>) -> Json<ConfigResponse> {
    Json(public_service::get_config(&state))
}

#[utoipa::path(
    get,
    path = "/api/challenges",
    tag = "content",
    responses((status = 200, description = "Challenge catalog", body = ChallengesResponse))
)]
/// Return the challenge catalog grouped by category.
pub async fn get_challenges(State(state): State<SharedState>) -> Json<ChallengesResponse> {
    Json(public_service::get_challenges(&state))
}

#[utoipa::path(
    post,
    path = "/api/submit",
    tag = "content",
    request_body = SubmitRequest,
    responses(
        (status = 200, description = "Verdict for the candidate flag", body = SubmitResponse),
        (status = 400, description = "Malformed request")
    )
)]
/// Judge a candidate flag against the catalog without touching the session.
pub async fn submit_flag(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<SubmitRequest>>,
) -> Json<SubmitResponse> {
    Json(public_service::verify_flag(
        &state,
        &payload.challenge_id,
        &payload.answer,
    ))
}

#[utoipa::path(
    post,
    path = "/api/easter-egg",
    tag = "content",
    request_body = EasterEggRequest,
    responses((status = 200, description = "Incantation result", body = EasterEggResponse))
)]
/// Try an incantation; a hit adjusts the session score.
pub async fn easter_egg(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<EasterEggRequest>>,
) -> Json<EasterEggResponse> {
    Json(public_service::trigger_easter_egg(&state, &payload.text).await)
}
