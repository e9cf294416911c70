use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::session::{
        JokerResponse, OpenChallengeRequest, SessionSubmitRequest, SessionSubmitResponse,
        SessionView,
    },
    error::{AppError, ErrorBody},
    services::session_service,
    state::{SharedState, jokers::JokerKind},
};

/// Board navigation, submissions and jokers for the running session.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/api/session", get(get_session))
        .route("/api/session/open", post(open_challenge))
        .route("/api/session/close", post(close_challenge))
        .route("/api/session/submit", post(submit))
        .route("/api/session/jokers/{kind}", post(use_joker))
}

#[utoipa::path(
    get,
    path = "/api/session",
    tag = "session",
    responses((status = 200, description = "Current session", body = SessionView))
)]
/// Return the session projection: score, clocks, jokers and board.
pub async fn get_session(State(state): State<SharedState>) -> Json<SessionView> {
    Json(session_service::get_session(&state).await)
}

#[utoipa::path(
    post,
    path = "/api/session/open",
    tag = "session",
    request_body = OpenChallengeRequest,
    responses(
        (status = 200, description = "Challenge opened", body = SessionView),
        (status = 404, description = "No challenge defined for this id", body = ErrorBody),
        (status = 409, description = "Board locked or challenge resolved", body = ErrorBody)
    )
)]
/// Open a challenge; its clock starts on the first open and is never reset.
pub async fn open_challenge(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<OpenChallengeRequest>>,
) -> Result<Json<SessionView>, AppError> {
    let view = session_service::open_challenge(&state, &payload.challenge_id).await?;
    Ok(Json(view))
}

#[utoipa::path(
    post,
    path = "/api/session/close",
    tag = "session",
    responses((status = 200, description = "Open challenge closed", body = SessionView))
)]
/// Close the open challenge, if any.
pub async fn close_challenge(State(state): State<SharedState>) -> Json<SessionView> {
    Json(session_service::close_challenge(&state).await)
}

#[utoipa::path(
    post,
    path = "/api/session/submit",
    tag = "session",
    request_body = SessionSubmitRequest,
    responses(
        (status = 200, description = "Verdict applied", body = SessionSubmitResponse),
        (status = 404, description = "No challenge defined for this id", body = ErrorBody),
        (status = 409, description = "Challenge not open, resolved, expired or busy", body = ErrorBody),
        (status = 503, description = "Verifier unavailable", body = ErrorBody)
    )
)]
/// Submit a flag for the open challenge.
pub async fn submit(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<SessionSubmitRequest>>,
) -> Result<Json<SessionSubmitResponse>, AppError> {
    let SessionSubmitRequest {
        challenge_id,
        answer,
    } = payload;
    let response = session_service::submit(&state, challenge_id, answer).await?;
    Ok(Json(response))
}

#[utoipa::path(
    post,
    path = "/api/session/jokers/{kind}",
    tag = "session",
    params(("kind" = JokerKind, Path, description = "Joker to apply")),
    responses(
        (status = 200, description = "Joker applied", body = JokerResponse),
        (status = 404, description = "Unknown joker", body = ErrorBody),
        (status = 409, description = "Joker precondition failed", body = ErrorBody)
    )
)]
/// Apply a joker. A rejected joker never consumes a use.
pub async fn use_joker(
    State(state): State<SharedState>,
    Path(kind): Path<String>,
) -> Result<Json<JokerResponse>, AppError> {
    let kind = kind.parse::<JokerKind>().map_err(|err| AppError::NotFound {
        code: "unknown_joker",
        message: err.to_string(),
    })?;
    Ok(Json(session_service::use_joker(&state, kind).await?))
}
