use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Trials Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::public::get_config,
        crate::routes::public::get_challenges,
        crate::routes::public::submit_flag,
        crate::routes::public::easter_egg,
        crate::routes::session::get_session,
        crate::routes::session::open_challenge,
        crate::routes::session::close_challenge,
        crate::routes::session::submit,
        crate::routes::session::use_joker,
        crate::routes::sse::session_stream,
    ),
    components(
        schemas(
            crate::error::ErrorBody,
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::public::ConfigResponse,
            crate::dto::public::ChallengesResponse,
            crate::dto::public::SubmitRequest,
            crate::dto::public::SubmitResponse,
            crate::dto::public::EasterEggRequest,
            crate::dto::public::EasterEggResponse,
            crate::dto::session::SessionView,
            crate::dto::session::OpenChallengeRequest,
            crate::dto::session::SessionSubmitRequest,
            crate::dto::session::SessionSubmitResponse,
            crate::dto::session::JokerResponse,
            crate::dto::sse::Handshake,
            crate::dto::sse::SystemStatus,
            crate::dto::sse::ChallengeExpiredEvent,
            crate::dto::sse::ChallengeSolvedEvent,
            crate::dto::sse::JokerUsedEvent,
            crate::dto::sse::GlobalLockEvent,
            crate::dto::sse::SessionUpdatedEvent,
            crate::state::jokers::JokerKind,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "content", description = "Game configuration, catalog and easter eggs"),
        (name = "session", description = "Board navigation, submissions and jokers"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
