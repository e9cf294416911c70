//! HTTP-level scenarios driven through the axum router.

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use trials_back::{
    dao::{
        catalog::{parse_catalog, parse_easter_eggs},
        models::KEY_SCORE,
        session_store::MemorySessionStore,
    },
    gateway::CatalogVerifier,
    routes,
    services::{persistence, timer_service},
    state::{
        AppState, Collaborators, Rules, SessionTimings, SharedState,
        clock::ManualClock,
        session::SessionState,
        tables::{GameInfo, Tables},
    },
};

const CATALOG: &str = r#"{"categories": [
    {"label": "Web", "challenges": [
        {"id": "web-1", "difficulty": 1, "title": "Robots", "hint": "look around", "flag": "flag{robots}"},
        {"id": "web-3a", "difficulty": 3, "title": "Cookies", "flag": "flag{cookies}"},
        {"id": "web-3b", "difficulty": 3, "title": "Headers", "flag": "flag{headers}"}
    ]},
    {"label": "Crypto", "challenges": [
        {"id": "crypto-2", "difficulty": 2, "title": "Caesar", "flag": "flag{caesar}"}
    ]}
]}"#;

const EASTER_EGGS: &str = r#"[{"trigger": "xyzzy", "points": 42, "response": "Nothing happens. Or does it?"}]"#;

struct Harness {
    app: Router,
    clock: Arc<ManualClock>,
    store: MemorySessionStore,
    state: SharedState,
}

fn harness() -> Harness {
    let rules = Arc::new(Rules {
        game: GameInfo::default(),
        tables: Tables::default(),
        catalog: parse_catalog(CATALOG, "inline").unwrap(),
        easter_eggs: parse_easter_eggs(EASTER_EGGS, "inline").unwrap(),
    });
    let clock = Arc::new(ManualClock::new(1_000_000));
    let store = MemorySessionStore::new();
    let state = AppState::new(
        rules.clone(),
        SessionState::fresh(1_000_000, &rules.tables),
        Collaborators {
            clock: clock.clone(),
            verifier: Arc::new(CatalogVerifier::new(rules)),
            store: Arc::new(store.clone()),
        },
        SessionTimings::default(),
    );
    Harness {
        app: routes::router(state.clone()),
        clock,
        store,
        state,
    }
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn catalog_listing_never_leaks_flags() {
    let Harness { app, .. } = harness();

    let (status, body) = call(&app, "GET", "/api/challenges", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["categories"][0]["key"], "web");
    assert_eq!(body["categories"][0]["challenges"][0]["hint"], "look around");
    assert!(!body.to_string().contains("flag{"));
}

#[tokio::test]
async fn config_exposes_tables_and_jokers() {
    let Harness { app, .. } = harness();

    let (status, body) = call(&app, "GET", "/api/config", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scoring"]["byDifficulty"]["3"], 300);
    assert!(body["jokers"]["consult_oracle"]["cost"].is_u64());
    assert!(body["jokers"]["wildcard_ritual"]["bonus"].is_u64());
}

#[tokio::test]
async fn open_submit_and_solve() {
    let Harness { app, store, state, .. } = harness();
    let writer = tokio::spawn(persistence::run_writer(state.clone()));

    let (status, body) = call(
        &app,
        "POST",
        "/api/session/open",
        Some(json!({"challengeId": "web-3a"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["openChallenge"]["id"], "web-3a");
    assert_eq!(body["deadlines"]["web-3a"], 1_000_000 + 240_000);

    let (status, body) = call(
        &app,
        "POST",
        "/api/session/submit",
        Some(json!({"challengeId": "web-3a", "answer": "flag{nope}"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "incorrect");

    let (status, body) = call(
        &app,
        "POST",
        "/api/session/submit",
        Some(json!({"challengeId": "web-3a", "flag": "flag{cookies}"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "solved");
    assert_eq!(body["points"], 300);
    assert_eq!(body["score"], 300);

    let (status, body) = call(
        &app,
        "POST",
        "/api/session/submit",
        Some(json!({"challengeId": "web-3a", "answer": "flag{cookies}"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "already_resolved");

    let mut persisted = None;
    for _ in 0..50 {
        persisted = store.get(KEY_SCORE);
        if persisted == Some(json!(300)) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(persisted, Some(json!(300)));
    writer.abort();
}

#[tokio::test]
async fn expired_challenge_rejects_submissions() {
    let Harness {
        app, clock, state, ..
    } = harness();

    call(
        &app,
        "POST",
        "/api/session/open",
        Some(json!({"challengeId": "web-1"})),
    )
    .await;
    clock.advance(120_000);
    timer_service::tick(&state).await;

    let (status, body) = call(
        &app,
        "POST",
        "/api/session/submit",
        Some(json!({"challengeId": "web-1", "answer": "flag{robots}"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "already_resolved");

    let (_, session) = call(&app, "GET", "/api/session", None).await;
    assert_eq!(session["expired"], json!(["web-1"]));
    assert_eq!(session["score"], 0);
}

#[tokio::test]
async fn global_deadline_locks_the_board() {
    let Harness { app, clock, .. } = harness();

    let (_, session) = call(&app, "GET", "/api/session", None).await;
    let global_deadline = session["globalDeadline"].as_u64().unwrap();
    clock.set(global_deadline);

    let (status, body) = call(
        &app,
        "POST",
        "/api/session/open",
        Some(json!({"challengeId": "crypto-2"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "globally_locked");
}

#[tokio::test]
async fn joker_errors_are_reported_without_consuming_uses() {
    let Harness { app, .. } = harness();

    let (status, body) = call(&app, "POST", "/api/session/jokers/teleport", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "unknown_joker");

    let (status, body) = call(&app, "POST", "/api/session/jokers/chronoshard", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "no_open_challenge");

    let (_, session) = call(&app, "GET", "/api/session", None).await;
    let chronoshard = session["jokers"]
        .as_array()
        .unwrap()
        .iter()
        .find(|usage| usage["kind"] == "chronoshard")
        .cloned()
        .unwrap();
    assert_eq!(chronoshard["used"], 0);
}

#[tokio::test]
async fn reroll_carries_remaining_time() {
    let Harness { app, clock, .. } = harness();

    call(
        &app,
        "POST",
        "/api/session/open",
        Some(json!({"challengeId": "web-3a"})),
    )
    .await;
    clock.advance(40_000);

    let (status, body) = call(&app, "POST", "/api/session/jokers/reroll_trial", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["effect"]["type"], "reroll");
    assert_eq!(body["effect"]["to"], "web-3b");
    assert_eq!(body["effect"]["deadline"], 1_000_000 + 240_000);
    assert!(body["session"]["deadlines"].get("web-3a").is_none());
}

#[tokio::test]
async fn malformed_requests_are_rejected() {
    let Harness { app, .. } = harness();

    let (status, _) = call(
        &app,
        "POST",
        "/api/session/open",
        Some(json!({"challengeId": "   "})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&app, "POST", "/api/session/open", Some(json!({}))).await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn gateway_and_easter_egg_endpoints() {
    let Harness { app, .. } = harness();

    let (_, verdict) = call(
        &app,
        "POST",
        "/api/submit",
        Some(json!({"challengeId": "crypto-2", "flag": "flag{caesar}"})),
    )
    .await;
    assert_eq!(verdict, json!({"ok": true, "points": 200}));

    let (_, egg) = call(&app, "POST", "/api/easter-egg", Some(json!({"text": "XYZZY"}))).await;
    assert_eq!(egg["ok"], true);
    assert_eq!(egg["score"], 42);

    let (_, session) = call(&app, "GET", "/api/session", None).await;
    assert_eq!(session["score"], 42);
}

#[tokio::test]
async fn healthcheck_reports_store_backend() {
    let Harness { app, .. } = harness();

    let (status, body) = call(&app, "GET", "/healthcheck", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok", "store": "memory"}));
}
