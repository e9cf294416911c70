//! Bridges the in-memory session and its durable mirror.
//!
//! The session is read once at startup. Afterwards a single writer task drains the snapshot
//! channel and keeps the backend in sync, toggling degraded mode while writes fail.

use std::time::Duration;

use tokio::{sync::watch, time::sleep};
use tracing::{debug, info, warn};

use crate::{
    dao::{
        models::SessionEntity,
        session_store::SessionStore,
        storage::{StorageError, StorageResult},
    },
    services::sse_events::broadcast_system_status,
    state::{SharedState, clock::EpochMillis, session::SessionState, tables::Tables},
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const MAX_LOAD_ATTEMPTS: u32 = 3;

/// Restore the session from `store`, or start a fresh one when nothing was persisted.
///
/// Transient failures are retried; a corrupt record is returned as an error right away so the
/// caller never overwrites data it could not read.
pub async fn hydrate(
    store: &dyn SessionStore,
    now: EpochMillis,
    tables: &Tables,
) -> StorageResult<SessionState> {
    let mut delay = INITIAL_DELAY;
    let mut attempt = 1;

    let record = loop {
        match store.load().await {
            Ok(record) => break record,
            Err(err @ StorageError::Unavailable { .. }) if attempt < MAX_LOAD_ATTEMPTS => {
                warn!(attempt, backend = store.backend(), error = %err, "session load failed; retrying");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    };

    let entity = SessionEntity::from_record(&record);
    if entity.is_empty() {
        info!(backend = store.backend(), "no stored session; starting a fresh one");
        return Ok(SessionState::fresh(now, tables));
    }

    let session = SessionState::hydrate(entity, now, tables);
    info!(
        backend = store.backend(),
        score = session.score(),
        solved = session.solved().len(),
        expired = session.expired().len(),
        "session restored"
    );
    Ok(session)
}

/// Persist every published snapshot until the state is dropped.
pub async fn run_writer(state: SharedState) {
    let store = state.store();
    let mut snapshots = state.snapshot_watcher();

    loop {
        let entity = snapshots.borrow_and_update().clone();
        if !save_with_retry(&state, store.as_ref(), &mut snapshots, entity).await {
            break;
        }
        if snapshots.changed().await.is_err() {
            break;
        }
    }
    debug!("session writer stopped");
}

/// Write the latest snapshot once, e.g. right before shutdown.
pub async fn flush(state: &SharedState) -> StorageResult<()> {
    let entity = state.snapshot_watcher().borrow().clone();
    state.store().save(entity.into_record()).await
}

/// Save `entity`, backing off while the store fails. A newer snapshot arriving during the wait
/// replaces the one being retried. Returns `false` once the snapshot channel is closed.
async fn save_with_retry(
    state: &SharedState,
    store: &dyn SessionStore,
    snapshots: &mut watch::Receiver<SessionEntity>,
    mut entity: SessionEntity,
) -> bool {
    let mut delay = INITIAL_DELAY;
    let mut attempt = 0u32;

    loop {
        match store.save(entity.clone().into_record()).await {
            Ok(()) => {
                if state.update_degraded(false) {
                    info!(backend = store.backend(), "session persisted again; leaving degraded mode");
                    broadcast_system_status(state, false);
                }
                return true;
            }
            Err(err) => {
                if state.update_degraded(true) {
                    warn!(
                        attempt, backend = store.backend(), error = %err,
                        "failed to persist session; entering degraded mode"
                    );
                    broadcast_system_status(state, true);
                } else {
                    warn!(attempt, error = %err, "session persist retry failed");
                }
                attempt += 1;

                tokio::select! {
                    _ = sleep(delay) => {}
                    changed = snapshots.changed() => {
                        if changed.is_err() {
                            return false;
                        }
                        entity = snapshots.borrow_and_update().clone();
                    }
                }
                delay = (delay * 2).min(MAX_DELAY);
            }
        }
    }
}
