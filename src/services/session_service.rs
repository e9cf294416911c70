//! Player-facing session operations: open, close, submit and jokers.
//!
//! Every mutation runs in one critical section of [`AppState`](crate::state::AppState); events
//! are broadcast after the lock is released.

use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use crate::{
    dto::session::{JokerResponse, SessionSubmitResponse, SessionView, SubmitOutcome},
    error::ServiceError,
    services::sse_events::{
        broadcast_challenge_solved, broadcast_joker_used, broadcast_session_updated,
    },
    state::{
        SharedState,
        jokers::JokerKind,
        session::{SessionError, SubmissionOutcome},
    },
};

/// Current projection of the session.
pub async fn get_session(state: &SharedState) -> SessionView {
    state.read_session(SessionView::build).await
}

/// Open a challenge, starting its clock on first open.
pub async fn open_challenge(
    state: &SharedState,
    challenge_id: &str,
) -> Result<SessionView, ServiceError> {
    let (outcome, view) = state
        .mutate_session(|session, rules, now| {
            let outcome = session.open(rules, challenge_id, now)?;
            Ok::<_, SessionError>((outcome, SessionView::build(session, rules, now)))
        })
        .await?;

    if outcome.first_open {
        info!(
            challenge_id = %outcome.challenge_id,
            deadline = outcome.deadline,
            "challenge clock started"
        );
    } else {
        debug!(challenge_id = %outcome.challenge_id, "challenge reopened");
    }
    broadcast_session_updated(state, view.clone());
    Ok(view)
}

/// Close whatever challenge is open. Closing with nothing open is a no-op.
pub async fn close_challenge(state: &SharedState) -> SessionView {
    let (closed, view) = state
        .update_session(|session, rules, now| {
            let closed = session.close();
            ((closed, SessionView::build(session, rules, now)), false)
        })
        .await;

    if let Some(challenge_id) = closed {
        debug!(%challenge_id, "challenge closed");
        broadcast_session_updated(state, view.clone());
    }
    view
}

/// Verify `answer` for the open challenge.
///
/// The verification runs in its own task so the in-flight mark is always resolved, even when
/// the caller goes away mid-request.
pub async fn submit(
    state: &SharedState,
    challenge_id: String,
    answer: String,
) -> Result<SessionSubmitResponse, ServiceError> {
    let task_state = state.clone();
    tokio::spawn(async move { run_submission(task_state, challenge_id, answer).await })
        .await
        .map_err(|err| {
            error!(error = %err, "submission task failed");
            ServiceError::Internal("submission task failed".into())
        })?
}

async fn run_submission(
    state: SharedState,
    challenge_id: String,
    answer: String,
) -> Result<SessionSubmitResponse, ServiceError> {
    let pending = state
        .update_session(|session, rules, now| {
            (session.begin_submission(rules, &challenge_id, now), false)
        })
        .await?;
    let attempt_id = pending.attempt_id;

    let verification = state.verifier().verify(&challenge_id, &answer);
    let verdict = match timeout(state.timings().verify_timeout, verification).await {
        Ok(Ok(verdict)) => verdict,
        Ok(Err(err)) => {
            warn!(%challenge_id, %attempt_id, error = %err, "flag verification failed");
            state
                .update_session(|session, _, _| (session.release_submission(pending), false))
                .await;
            return Err(SessionError::VerificationUnavailable.into());
        }
        Err(_) => {
            warn!(%challenge_id, %attempt_id, "flag verification timed out");
            state
                .update_session(|session, _, _| (session.release_submission(pending), false))
                .await;
            return Err(SessionError::VerificationUnavailable.into());
        }
    };

    let (outcome, view) = state
        .update_session(|session, rules, now| {
            let outcome = session.complete_submission(pending, verdict.correct, rules);
            let changed = matches!(outcome, SubmissionOutcome::Solved { .. });
            ((outcome, SessionView::build(session, rules, now)), changed)
        })
        .await;

    let response = match outcome {
        SubmissionOutcome::Solved { points, score } => {
            info!(%challenge_id, %attempt_id, points, score, "challenge solved");
            broadcast_challenge_solved(&state, &challenge_id, points, score);
            broadcast_session_updated(&state, view);
            schedule_close(state.clone(), challenge_id);
            SessionSubmitResponse {
                ok: true,
                outcome: SubmitOutcome::Solved,
                points: Some(points),
                score,
                attempt_id,
            }
        }
        SubmissionOutcome::Unchanged { score } => SessionSubmitResponse {
            ok: true,
            outcome: SubmitOutcome::AlreadyResolved,
            points: None,
            score,
            attempt_id,
        },
        SubmissionOutcome::Incorrect => {
            debug!(%challenge_id, %attempt_id, "incorrect flag");
            SessionSubmitResponse {
                ok: false,
                outcome: SubmitOutcome::Incorrect,
                points: None,
                score: view.score,
                attempt_id,
            }
        }
    };
    Ok(response)
}

/// Close `challenge_id` after the grace delay, unless the player already moved on.
fn schedule_close(state: SharedState, challenge_id: String) {
    tokio::spawn(async move {
        sleep(state.timings().close_grace).await;
        let view = state
            .update_session(|session, rules, now| {
                let closed = session.close_if_open(&challenge_id);
                (closed.then(|| SessionView::build(session, rules, now)), false)
            })
            .await;
        if let Some(view) = view {
            debug!(%challenge_id, "solved challenge closed");
            broadcast_session_updated(&state, view);
        }
    });
}

/// Apply a joker to the session.
pub async fn use_joker(state: &SharedState, kind: JokerKind) -> Result<JokerResponse, ServiceError> {
    let (report, view) = state
        .mutate_session(|session, rules, now| {
            let report = session.apply_joker(rules, kind, now, &mut rand::rng())?;
            Ok::<_, SessionError>((report, SessionView::build(session, rules, now)))
        })
        .await
        .inspect_err(|err| debug!(%kind, error = %err, "joker rejected"))?;

    info!(%kind, uses = report.uses, max = report.max, score = report.score, "joker used");
    broadcast_joker_used(state, &report);
    broadcast_session_updated(state, view.clone());
    Ok(JokerResponse::new(report, view))
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicBool, Ordering},
        },
        time::Duration,
    };

    use futures::future::BoxFuture;

    use super::*;
    use crate::{
        dao::session_store::MemorySessionStore,
        gateway::{CatalogVerifier, FlagVerifier, Verdict, VerifyError},
        state::{
            AppState, Collaborators, SessionTimings,
            clock::ManualClock,
            session::fixtures::{T0, rules, session},
        },
    };

    /// Verifier that never answers.
    struct Stalled;

    impl FlagVerifier for Stalled {
        fn verify(&self, _: &str, _: &str) -> BoxFuture<'static, Result<Verdict, VerifyError>> {
            Box::pin(futures::future::pending())
        }
    }

    /// Verifier that fails once, then defers to the catalog.
    struct Flaky {
        failed: AtomicBool,
        inner: CatalogVerifier,
    }

    impl FlagVerifier for Flaky {
        fn verify(
            &self,
            challenge_id: &str,
            answer: &str,
        ) -> BoxFuture<'static, Result<Verdict, VerifyError>> {
            if !self.failed.swap(true, Ordering::SeqCst) {
                return Box::pin(async { Err(VerifyError::Transport("connection reset".into())) });
            }
            self.inner.verify(challenge_id, answer)
        }
    }

    fn timings() -> SessionTimings {
        SessionTimings {
            tick: Duration::from_millis(10),
            verify_timeout: Duration::from_millis(50),
            close_grace: Duration::from_millis(20),
        }
    }

    fn app_with(verifier: impl FnOnce(Arc<crate::state::Rules>) -> Arc<dyn FlagVerifier>) -> SharedState {
        let rules = Arc::new(rules());
        let clock = Arc::new(ManualClock::new(T0));
        AppState::new(
            rules.clone(),
            session(&rules),
            Collaborators {
                clock,
                verifier: verifier(rules),
                store: Arc::new(MemorySessionStore::new()),
            },
            timings(),
        )
    }

    fn app() -> SharedState {
        app_with(|rules| Arc::new(CatalogVerifier::new(rules)))
    }

    #[tokio::test]
    async fn correct_flag_solves_once_and_closes_after_grace() {
        let state = app();
        open_challenge(&state, "web-1").await.unwrap();

        let first = submit(&state, "web-1".into(), "flag{web-1}".into())
            .await
            .unwrap();
        assert_eq!(first.outcome, SubmitOutcome::Solved);
        assert_eq!(first.points, Some(100));

        let again = submit(&state, "web-1".into(), "flag{web-1}".into()).await;
        assert!(matches!(
            again,
            Err(ServiceError::Session(SessionError::AlreadyResolved(_)))
        ));

        sleep(Duration::from_millis(60)).await;
        let view = get_session(&state).await;
        assert_eq!(view.score, first.score);
        assert!(view.open_challenge.is_none());
    }

    #[tokio::test]
    async fn grace_close_spares_a_newly_opened_challenge() {
        let state = app();
        open_challenge(&state, "web-1").await.unwrap();
        submit(&state, "web-1".into(), "flag{web-1}".into())
            .await
            .unwrap();
        open_challenge(&state, "crypto-2").await.unwrap();

        sleep(Duration::from_millis(60)).await;
        let view = get_session(&state).await;
        assert_eq!(
            view.open_challenge.map(|open| open.id).as_deref(),
            Some("crypto-2")
        );
    }

    #[tokio::test]
    async fn wrong_flag_changes_nothing() {
        let state = app();
        open_challenge(&state, "web-1").await.unwrap();

        let response = submit(&state, "web-1".into(), "nope".into()).await.unwrap();
        assert!(!response.ok);
        assert_eq!(response.outcome, SubmitOutcome::Incorrect);
        assert_eq!(get_session(&state).await.score, 0);
    }

    #[tokio::test]
    async fn stalled_verifier_times_out_and_releases_the_challenge() {
        let state = app_with(|_| Arc::new(Stalled));
        open_challenge(&state, "web-1").await.unwrap();

        let result = submit(&state, "web-1".into(), "flag{web-1}".into()).await;
        assert!(matches!(
            result,
            Err(ServiceError::Session(SessionError::VerificationUnavailable))
        ));
        let released = state
            .read_session(|session, _, _| !session.is_awaiting_verdict("web-1"))
            .await;
        assert!(released);
    }

    #[tokio::test]
    async fn transport_failure_allows_a_retry() {
        let state = app_with(|rules| {
            Arc::new(Flaky {
                failed: AtomicBool::new(false),
                inner: CatalogVerifier::new(rules),
            })
        });
        open_challenge(&state, "web-1").await.unwrap();

        let first = submit(&state, "web-1".into(), "flag{web-1}".into()).await;
        assert!(first.is_err());
        let second = submit(&state, "web-1".into(), "flag{web-1}".into())
            .await
            .unwrap();
        assert_eq!(second.outcome, SubmitOutcome::Solved);
    }

    #[tokio::test]
    async fn rejected_joker_publishes_nothing() {
        let state = app();
        let mut snapshots = state.snapshot_watcher();
        snapshots.borrow_and_update();

        let result = use_joker(&state, JokerKind::Chronoshard).await;
        assert!(matches!(
            result,
            Err(ServiceError::Session(SessionError::NoOpenChallenge))
        ));
        assert!(!snapshots.has_changed().unwrap());
    }

    #[tokio::test]
    async fn chronoshard_extends_open_deadline() {
        let state = app();
        let opened = open_challenge(&state, "web-1").await.unwrap();
        let before = opened.deadlines["web-1"];

        let response = use_joker(&state, JokerKind::Chronoshard).await.unwrap();
        assert_eq!(response.uses, 1);
        assert!(response.session.deadlines["web-1"] > before);
    }
}
