pub mod catalog;
pub mod clock;
pub mod easter_eggs;
pub mod jokers;
pub mod session;
mod sse;
pub mod tables;

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use tokio::sync::{Mutex, watch};

use crate::{
    dao::{models::SessionEntity, session_store::SessionStore},
    gateway::FlagVerifier,
    state::{
        catalog::Catalog,
        clock::{Clock, EpochMillis},
        easter_eggs::EasterEggTable,
        session::SessionState,
        tables::{GameInfo, Tables},
    },
};

pub use self::sse::EventHub;

pub type SharedState = Arc<AppState>;

/// Default cadence of the timer task.
pub const DEFAULT_TICK: Duration = Duration::from_millis(250);
/// Default limit for a flag verification round trip.
pub const DEFAULT_VERIFY_TIMEOUT: Duration = Duration::from_secs(5);
/// Default delay before a solved challenge is closed.
pub const DEFAULT_CLOSE_GRACE: Duration = Duration::from_millis(800);

const SSE_CAPACITY: usize = 64;

/// Static content loaded once at startup; immutable for the whole session.
#[derive(Debug, Clone)]
pub struct Rules {
    /// Presentation metadata.
    pub game: GameInfo,
    /// Scoring, timer and joker tables.
    pub tables: Tables,
    /// Challenge catalog.
    pub catalog: Catalog,
    /// Easter egg triggers.
    pub easter_eggs: EasterEggTable,
}

/// Durations driving the background tasks and the submit flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimings {
    /// Timer re-evaluation cadence.
    pub tick: Duration,
    /// Maximum wait for a verdict.
    pub verify_timeout: Duration,
    /// Delay between a solve and the automatic close of the challenge.
    pub close_grace: Duration,
}

impl Default for SessionTimings {
    fn default() -> Self {
        Self {
            tick: DEFAULT_TICK,
            verify_timeout: DEFAULT_VERIFY_TIMEOUT,
            close_grace: DEFAULT_CLOSE_GRACE,
        }
    }
}

/// External collaborators the session talks to.
#[derive(Clone)]
pub struct Collaborators {
    /// Source of wall-clock time.
    pub clock: Arc<dyn Clock>,
    /// Flag verification gateway.
    pub verifier: Arc<dyn FlagVerifier>,
    /// Durable mirror of the session.
    pub store: Arc<dyn SessionStore>,
}

/// Central application state: the session aggregate and the handles around it.
pub struct AppState {
    rules: Arc<Rules>,
    clock: Arc<dyn Clock>,
    verifier: Arc<dyn FlagVerifier>,
    store: Arc<dyn SessionStore>,
    session: Mutex<SessionState>,
    snapshots: watch::Sender<SessionEntity>,
    events: EventHub,
    degraded: watch::Sender<bool>,
    global_locked: AtomicBool,
    timings: SessionTimings,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The initial session is published as the first snapshot so it reaches the store even
    /// before any mutation happens.
    pub fn new(
        rules: Arc<Rules>,
        session: SessionState,
        collaborators: Collaborators,
        timings: SessionTimings,
    ) -> SharedState {
        let Collaborators {
            clock,
            verifier,
            store,
        } = collaborators;
        let global_locked = session.is_globally_locked(clock.now());
        let (snapshots, _rx) = watch::channel(SessionEntity::from(&session));
        let (degraded, _rx) = watch::channel(false);

        Arc::new(Self {
            rules,
            clock,
            verifier,
            store,
            session: Mutex::new(session),
            snapshots,
            events: EventHub::new(SSE_CAPACITY),
            degraded,
            global_locked: AtomicBool::new(global_locked),
            timings,
        })
    }

    /// Static rules of the session.
    pub fn rules(&self) -> &Arc<Rules> {
        &self.rules
    }

    /// Current wall-clock time.
    pub fn now(&self) -> EpochMillis {
        self.clock.now()
    }

    /// Flag verification gateway.
    pub fn verifier(&self) -> Arc<dyn FlagVerifier> {
        self.verifier.clone()
    }

    /// Session persistence backend.
    pub fn store(&self) -> Arc<dyn SessionStore> {
        self.store.clone()
    }

    /// Configured durations.
    pub fn timings(&self) -> SessionTimings {
        self.timings
    }

    /// Broadcast hub used by the session SSE stream.
    pub fn events(&self) -> &EventHub {
        &self.events
    }

    /// Subscribe to persisted snapshots; the receiver starts on the latest one.
    pub fn snapshot_watcher(&self) -> watch::Receiver<SessionEntity> {
        self.snapshots.subscribe()
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update the degraded flag, returning `true` when it changed.
    pub fn update_degraded(&self, value: bool) -> bool {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        })
    }

    /// Record the global lock state, returning `true` on a transition.
    pub fn update_global_lock(&self, locked: bool) -> bool {
        self.global_locked.swap(locked, Ordering::SeqCst) != locked
    }

    /// Last global lock state observed by the timer.
    pub fn is_globally_locked(&self) -> bool {
        self.global_locked.load(Ordering::SeqCst)
    }

    /// Run `op` against the session under the lock.
    pub async fn read_session<T>(
        &self,
        op: impl FnOnce(&SessionState, &Rules, EpochMillis) -> T,
    ) -> T {
        let session = self.session.lock().await;
        op(&session, &self.rules, self.clock.now())
    }

    /// Run `op` under the session lock; when it reports a persisted change, publish a snapshot
    /// before the lock is released.
    pub async fn update_session<T>(
        &self,
        op: impl FnOnce(&mut SessionState, &Rules, EpochMillis) -> (T, bool),
    ) -> T {
        let mut session = self.session.lock().await;
        let (value, changed) = op(&mut session, &self.rules, self.clock.now());
        if changed {
            self.snapshots.send_replace(SessionEntity::from(&*session));
        }
        value
    }

    /// Run a fallible mutation, publishing a snapshot only when it succeeds.
    pub async fn mutate_session<T, E>(
        &self,
        op: impl FnOnce(&mut SessionState, &Rules, EpochMillis) -> Result<T, E>,
    ) -> Result<T, E> {
        self.update_session(|session, rules, now| {
            let result = op(session, rules, now);
            let changed = result.is_ok();
            (result, changed)
        })
        .await
    }
}
