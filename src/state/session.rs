//! The session aggregate: score, solve/expiry status, deadlines and joker usage, plus the
//! transitions that are allowed to change them.
//!
//! Every operation validates first and mutates second, so a returned error always means the
//! state is untouched.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dao::models::SessionEntity,
    state::{
        Rules,
        catalog::ChallengeId,
        clock::EpochMillis,
        jokers::JokerKind,
        tables::Tables,
    },
};

/// Recoverable failures reported by session operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The id does not match any challenge (placeholder tile).
    #[error("no challenge defined for `{0}`")]
    NoChallengeDefined(ChallengeId),
    /// The challenge is already solved or expired.
    #[error("challenge `{0}` is already resolved")]
    AlreadyResolved(ChallengeId),
    /// The challenge deadline has passed.
    #[error("challenge `{0}` has expired")]
    Expired(ChallengeId),
    /// The global deadline has passed.
    #[error("the board is locked: global time is up")]
    GloballyLocked,
    /// The challenge is not the one currently open.
    #[error("challenge `{0}` is not open")]
    NotOpen(ChallengeId),
    /// The operation requires an open challenge.
    #[error("open a challenge first")]
    NoOpenChallenge,
    /// A verdict for this challenge is still awaited.
    #[error("a verdict for challenge `{0}` is still pending")]
    SubmissionPending(ChallengeId),
    /// The joker reached its usage cap.
    #[error("no uses left for joker `{0}`")]
    NoUsesLeft(JokerKind),
    /// Not enough points to pay for the action.
    #[error("not enough points: {required} required, {available} available")]
    InsufficientScore {
        /// Price of the action.
        required: u64,
        /// Current score.
        available: u64,
    },
    /// No other challenge of the same tier can replace the open one.
    #[error("no alternate trial exists for `{0}`")]
    NoAlternateTrial(ChallengeId),
    /// The flag verification gateway failed or timed out.
    #[error("flag verification is unavailable, try again")]
    VerificationUnavailable,
}

impl SessionError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::NoChallengeDefined(_) => "no_challenge_defined",
            SessionError::AlreadyResolved(_) => "already_resolved",
            SessionError::Expired(_) => "expired",
            SessionError::GloballyLocked => "globally_locked",
            SessionError::NotOpen(_) => "not_open",
            SessionError::NoOpenChallenge => "no_open_challenge",
            SessionError::SubmissionPending(_) => "submission_pending",
            SessionError::NoUsesLeft(_) => "no_uses_left",
            SessionError::InsufficientScore { .. } => "insufficient_score",
            SessionError::NoAlternateTrial(_) => "no_alternate_trial",
            SessionError::VerificationUnavailable => "verification_unavailable",
        }
    }
}

/// Result of a successful [`SessionState::open`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenOutcome {
    /// Challenge now open.
    pub challenge_id: ChallengeId,
    /// Its deadline.
    pub deadline: EpochMillis,
    /// True when this call started the challenge clock.
    pub first_open: bool,
}

/// Claim on a challenge while its verdict is being fetched.
///
/// Must be handed back through [`SessionState::complete_submission`] or
/// [`SessionState::release_submission`].
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a pending submission keeps its challenge locked until completed or released"]
pub struct PendingSubmission {
    /// Identifier of this attempt, for logs and responses.
    pub attempt_id: Uuid,
    /// Challenge under verification.
    pub challenge_id: ChallengeId,
}

/// What a verdict did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// Newly solved; `points` were added.
    Solved {
        /// Points awarded.
        points: u64,
        /// Score after the award.
        score: u64,
    },
    /// Correct, but the challenge was already resolved; nothing changed.
    Unchanged {
        /// Current score.
        score: u64,
    },
    /// Wrong answer; nothing changed.
    Incorrect,
}

/// Findings of one timer evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TimerReport {
    /// The global deadline has passed.
    pub globally_locked: bool,
    /// Challenge that expired during this evaluation.
    pub expired: Option<ChallengeId>,
}

impl TimerReport {
    /// True when the evaluation changed persisted state.
    pub fn mutated(&self) -> bool {
        self.expired.is_some()
    }
}

/// Mutable record of one player session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub(super) score: u64,
    pub(super) solved: BTreeSet<ChallengeId>,
    pub(super) expired: BTreeSet<ChallengeId>,
    pub(super) deadlines: BTreeMap<ChallengeId, EpochMillis>,
    pub(super) global_deadline: EpochMillis,
    pub(super) joker_usage: BTreeMap<JokerKind, u32>,
    pub(super) open_challenge: Option<ChallengeId>,
    pub(super) awaiting_verdict: HashSet<ChallengeId>,
}

impl SessionState {
    /// Start a brand-new session whose global clock begins at `now`.
    pub fn fresh(now: EpochMillis, tables: &Tables) -> Self {
        Self {
            score: 0,
            solved: BTreeSet::new(),
            expired: BTreeSet::new(),
            deadlines: BTreeMap::new(),
            global_deadline: now.saturating_add(tables.global_millis()),
            joker_usage: JokerKind::ALL.into_iter().map(|kind| (kind, 0)).collect(),
            open_challenge: None,
            awaiting_verdict: HashSet::new(),
        }
    }

    /// Rebuild a session from persisted keys, filling the gaps with fresh values.
    ///
    /// A stored snapshot where a challenge is both solved and expired keeps it solved.
    pub fn hydrate(entity: SessionEntity, now: EpochMillis, tables: &Tables) -> Self {
        let mut session = Self::fresh(now, tables);

        if let Some(score) = entity.score {
            session.score = score;
        }
        if let Some(solved) = entity.solved {
            session.solved = solved.into_iter().collect();
        }
        if let Some(expired) = entity.expired {
            for id in expired {
                if session.solved.contains(&id) {
                    warn!(challenge_id = %id, "stored session lists a solved challenge as expired; keeping it solved");
                    continue;
                }
                session.expired.insert(id);
            }
        }
        if let Some(deadlines) = entity.deadlines {
            session.deadlines = deadlines;
        }
        if let Some(global_deadline) = entity.global_deadline {
            session.global_deadline = global_deadline;
        }
        if let Some(usage) = entity.joker_usage {
            for (name, count) in usage {
                match name.parse::<JokerKind>() {
                    Ok(kind) => {
                        session.joker_usage.insert(kind, count);
                    }
                    Err(_) => warn!(joker = %name, "ignoring usage of unknown joker"),
                }
            }
        }

        session
    }

    /// Current score.
    pub fn score(&self) -> u64 {
        self.score
    }

    /// Solved challenge ids.
    pub fn solved(&self) -> &BTreeSet<ChallengeId> {
        &self.solved
    }

    /// Expired challenge ids.
    pub fn expired(&self) -> &BTreeSet<ChallengeId> {
        &self.expired
    }

    /// Per-challenge deadlines.
    pub fn deadlines(&self) -> &BTreeMap<ChallengeId, EpochMillis> {
        &self.deadlines
    }

    /// Deadline of one challenge, if its clock has started.
    pub fn deadline(&self, id: &str) -> Option<EpochMillis> {
        self.deadlines.get(id).copied()
    }

    /// Session-wide deadline.
    pub fn global_deadline(&self) -> EpochMillis {
        self.global_deadline
    }

    /// Joker usage counters.
    pub fn joker_usage(&self) -> &BTreeMap<JokerKind, u32> {
        &self.joker_usage
    }

    /// Number of times `kind` has been used.
    pub fn uses(&self, kind: JokerKind) -> u32 {
        self.joker_usage.get(&kind).copied().unwrap_or_default()
    }

    /// Challenge currently open, if any.
    pub fn open_challenge(&self) -> Option<&ChallengeId> {
        self.open_challenge.as_ref()
    }

    /// True while a verdict for `id` is in flight.
    pub fn is_awaiting_verdict(&self, id: &str) -> bool {
        self.awaiting_verdict.contains(id)
    }

    /// True once `id` is solved or expired.
    pub fn is_resolved(&self, id: &str) -> bool {
        self.solved.contains(id) || self.expired.contains(id)
    }

    /// True once the global deadline has passed.
    pub fn is_globally_locked(&self, now: EpochMillis) -> bool {
        self.global_deadline <= now
    }

    /// Milliseconds left before the global deadline.
    pub fn global_remaining(&self, now: EpochMillis) -> u64 {
        self.global_deadline.saturating_sub(now)
    }

    /// Milliseconds left on the clock of `id`, if started.
    pub fn remaining(&self, id: &str, now: EpochMillis) -> Option<u64> {
        self.deadline(id).map(|deadline| deadline.saturating_sub(now))
    }

    /// Open a challenge, starting its clock on first open.
    pub fn open(
        &mut self,
        rules: &Rules,
        id: &str,
        now: EpochMillis,
    ) -> Result<OpenOutcome, SessionError> {
        let challenge = rules
            .catalog
            .challenge(id)
            .ok_or_else(|| SessionError::NoChallengeDefined(id.to_string()))?;
        if self.is_globally_locked(now) {
            return Err(SessionError::GloballyLocked);
        }
        if self.is_resolved(id) {
            return Err(SessionError::AlreadyResolved(id.to_string()));
        }

        let mut first_open = false;
        let deadline = *self.deadlines.entry(challenge.id.clone()).or_insert_with(|| {
            first_open = true;
            now.saturating_add(rules.tables.allotted_millis(challenge.difficulty))
        });
        self.open_challenge = Some(challenge.id.clone());

        Ok(OpenOutcome {
            challenge_id: challenge.id.clone(),
            deadline,
            first_open,
        })
    }

    /// Clear the open pointer, returning the challenge that was open.
    pub fn close(&mut self) -> Option<ChallengeId> {
        self.open_challenge.take()
    }

    /// Clear the open pointer only if it still designates `id`.
    pub fn close_if_open(&mut self, id: &str) -> bool {
        if self.open_challenge.as_deref() == Some(id) {
            self.open_challenge = None;
            true
        } else {
            false
        }
    }

    /// Validate a submission and lock the challenge until its verdict arrives.
    pub fn begin_submission(
        &mut self,
        rules: &Rules,
        id: &str,
        now: EpochMillis,
    ) -> Result<PendingSubmission, SessionError> {
        if rules.catalog.challenge(id).is_none() {
            return Err(SessionError::NoChallengeDefined(id.to_string()));
        }
        if self.open_challenge.as_deref() != Some(id) {
            return Err(SessionError::NotOpen(id.to_string()));
        }
        if self.is_resolved(id) {
            return Err(SessionError::AlreadyResolved(id.to_string()));
        }
        if self.is_awaiting_verdict(id) {
            return Err(SessionError::SubmissionPending(id.to_string()));
        }
        match self.deadline(id) {
            Some(deadline) if deadline > now => {}
            _ => return Err(SessionError::Expired(id.to_string())),
        }

        self.awaiting_verdict.insert(id.to_string());
        Ok(PendingSubmission {
            attempt_id: Uuid::new_v4(),
            challenge_id: id.to_string(),
        })
    }

    /// Apply the verdict for a pending submission and unlock the challenge.
    pub fn complete_submission(
        &mut self,
        pending: PendingSubmission,
        correct: bool,
        rules: &Rules,
    ) -> SubmissionOutcome {
        let PendingSubmission { challenge_id, .. } = pending;
        self.awaiting_verdict.remove(&challenge_id);

        if !correct {
            return SubmissionOutcome::Incorrect;
        }
        if self.is_resolved(&challenge_id) {
            return SubmissionOutcome::Unchanged { score: self.score };
        }
        let Some(challenge) = rules.catalog.challenge(&challenge_id) else {
            return SubmissionOutcome::Unchanged { score: self.score };
        };

        let points = rules.tables.points(challenge.difficulty);
        self.solved.insert(challenge_id);
        self.credit(points);
        SubmissionOutcome::Solved {
            points,
            score: self.score,
        }
    }

    /// Unlock a challenge whose verdict could not be obtained.
    pub fn release_submission(&mut self, pending: PendingSubmission) {
        self.awaiting_verdict.remove(&pending.challenge_id);
    }

    /// Re-evaluate both clocks against `now`, expiring the open challenge when due.
    pub fn evaluate_timers(&mut self, now: EpochMillis) -> TimerReport {
        let globally_locked = self.is_globally_locked(now);
        let due = self.open_challenge.as_ref().filter(|id| {
            !self.is_resolved(id)
                && !self.is_awaiting_verdict(id)
                && self.deadline(id).is_some_and(|deadline| deadline <= now)
        });

        let expired = due.cloned();
        if let Some(id) = &expired {
            self.expired.insert(id.clone());
        }

        TimerReport {
            globally_locked,
            expired,
        }
    }

    /// Apply a signed score change with the clamp-at-zero rule, returning the new score.
    pub fn adjust_score(&mut self, delta: i64) -> u64 {
        if delta >= 0 {
            self.credit(delta.unsigned_abs());
        } else {
            self.debit(delta.unsigned_abs());
        }
        self.score
    }

    pub(super) fn credit(&mut self, points: u64) {
        self.score = self.score.saturating_add(points);
    }

    pub(super) fn debit(&mut self, points: u64) {
        self.score = self.score.saturating_sub(points);
    }
}

impl From<&SessionState> for SessionEntity {
    fn from(value: &SessionState) -> Self {
        Self {
            score: Some(value.score),
            solved: Some(value.solved.iter().cloned().collect()),
            expired: Some(value.expired.iter().cloned().collect()),
            deadlines: Some(value.deadlines.clone()),
            global_deadline: Some(value.global_deadline),
            joker_usage: Some(
                value
                    .joker_usage
                    .iter()
                    .map(|(kind, count)| (kind.as_str().to_string(), *count))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::state::{
        catalog::fixtures::catalog, easter_eggs::EasterEggTable, tables::GameInfo,
    };

    pub const T0: EpochMillis = 0;

    pub fn rules() -> Rules {
        Rules {
            game: GameInfo::default(),
            tables: Tables::default(),
            catalog: catalog(),
            easter_eggs: EasterEggTable::default(),
        }
    }

    pub fn session(rules: &Rules) -> SessionState {
        SessionState::fresh(T0, &rules.tables)
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{T0, rules, session};
    use super::*;

    fn assert_disjoint(session: &SessionState) {
        assert!(session.solved.is_disjoint(&session.expired));
    }

    #[test]
    fn first_open_starts_the_clock_from_the_timer_table() {
        let rules = rules();
        let mut session = session(&rules);

        let outcome = session.open(&rules, "web-3a", T0).unwrap();

        assert!(outcome.first_open);
        assert_eq!(outcome.deadline, 240_000);
        assert_eq!(session.deadline("web-3a"), Some(240_000));
        assert_eq!(session.open_challenge().map(String::as_str), Some("web-3a"));
    }

    #[test]
    fn reopening_keeps_the_original_deadline() {
        let rules = rules();
        let mut session = session(&rules);
        session.open(&rules, "web-1", T0).unwrap();
        session.close();

        let outcome = session.open(&rules, "web-1", 60_000).unwrap();

        assert!(!outcome.first_open);
        assert_eq!(outcome.deadline, 120_000);
    }

    #[test]
    fn open_rejects_unknown_challenges() {
        let rules = rules();
        let mut session = session(&rules);
        let err = session.open(&rules, "crypto-missing-3", T0).unwrap_err();
        assert_eq!(err, SessionError::NoChallengeDefined("crypto-missing-3".into()));
        assert!(session.deadlines().is_empty());
    }

    #[test]
    fn open_is_refused_once_globally_locked() {
        let rules = rules();
        let mut session = session(&rules);
        let after_lock = session.global_deadline();

        let err = session.open(&rules, "web-1", after_lock).unwrap_err();

        assert_eq!(err, SessionError::GloballyLocked);
        assert!(session.open_challenge().is_none());
    }

    #[test]
    fn open_is_refused_for_resolved_challenges() {
        let rules = rules();
        let mut session = session(&rules);
        session.open(&rules, "web-1", T0).unwrap();
        session.evaluate_timers(120_000);

        let err = session.open(&rules, "web-1", 130_000).unwrap_err();
        assert_eq!(err, SessionError::AlreadyResolved("web-1".into()));
    }

    #[test]
    fn open_challenge_expires_on_tick_after_its_deadline() {
        let rules = rules();
        let mut session = session(&rules);
        session.open(&rules, "web-3a", T0).unwrap();

        let early = session.evaluate_timers(239_999);
        assert!(!early.mutated());

        let report = session.evaluate_timers(241_000);
        assert_eq!(report.expired.as_deref(), Some("web-3a"));
        assert!(session.expired().contains("web-3a"));
    }

    #[test]
    fn expiry_is_idempotent() {
        let rules = rules();
        let mut session = session(&rules);
        session.open(&rules, "web-1", T0).unwrap();
        session.evaluate_timers(200_000);
        let before = session.clone();

        let report = session.evaluate_timers(300_000);

        assert!(!report.mutated());
        assert_eq!(session, before);
    }

    #[test]
    fn global_lock_does_not_expire_the_open_challenge() {
        let rules = rules();
        let mut session = session(&rules);
        let global = session.global_deadline();
        session.open(&rules, "web-5", global - 1_000).unwrap();

        let report = session.evaluate_timers(global + 1_000);

        assert!(report.globally_locked);
        assert!(report.expired.is_none());
        assert!(session.expired().is_empty());
    }

    #[test]
    fn submit_after_global_lock_still_accepted_for_valid_open_challenge() {
        let rules = rules();
        let mut session = session(&rules);
        let global = session.global_deadline();
        session.open(&rules, "web-5", global - 1_000).unwrap();

        let pending = session.begin_submission(&rules, "web-5", global + 1_000).unwrap();
        let outcome = session.complete_submission(pending, true, &rules);

        assert_eq!(
            outcome,
            SubmissionOutcome::Solved {
                points: 500,
                score: 500
            }
        );
    }

    #[test]
    fn correct_submission_solves_and_awards_once() {
        let rules = rules();
        let mut session = session(&rules);
        session.open(&rules, "web-3a", T0).unwrap();

        let pending = session.begin_submission(&rules, "web-3a", 1_000).unwrap();
        assert_eq!(
            session.complete_submission(pending, true, &rules),
            SubmissionOutcome::Solved {
                points: 300,
                score: 300
            }
        );

        let err = session.begin_submission(&rules, "web-3a", 2_000).unwrap_err();
        assert_eq!(err, SessionError::AlreadyResolved("web-3a".into()));
        assert_eq!(session.score(), 300);
    }

    #[test]
    fn concurrent_verdicts_never_double_award() {
        let rules = rules();
        let mut session = session(&rules);
        session.open(&rules, "web-1", T0).unwrap();
        let first = session.begin_submission(&rules, "web-1", 1_000).unwrap();
        let stale = PendingSubmission {
            attempt_id: Uuid::new_v4(),
            challenge_id: "web-1".into(),
        };

        session.complete_submission(first, true, &rules);
        let outcome = session.complete_submission(stale, true, &rules);

        assert_eq!(outcome, SubmissionOutcome::Unchanged { score: 100 });
        assert_eq!(session.score(), 100);
    }

    #[test]
    fn wrong_answers_leave_the_session_untouched() {
        let rules = rules();
        let mut session = session(&rules);
        session.open(&rules, "web-1", T0).unwrap();
        let before = session.clone();

        for attempt in 0..5 {
            let pending = session.begin_submission(&rules, "web-1", attempt * 1_000).unwrap();
            assert_eq!(
                session.complete_submission(pending, false, &rules),
                SubmissionOutcome::Incorrect
            );
        }

        assert_eq!(session, before);
    }

    #[test]
    fn submission_preconditions() {
        let rules = rules();
        let mut session = session(&rules);

        assert_eq!(
            session.begin_submission(&rules, "nope", T0).unwrap_err(),
            SessionError::NoChallengeDefined("nope".into())
        );
        assert_eq!(
            session.begin_submission(&rules, "web-1", T0).unwrap_err(),
            SessionError::NotOpen("web-1".into())
        );

        session.open(&rules, "web-1", T0).unwrap();
        assert_eq!(
            session.begin_submission(&rules, "web-1", 120_000).unwrap_err(),
            SessionError::Expired("web-1".into())
        );
        assert!(session.expired().is_empty());
    }

    #[test]
    fn second_submission_is_rejected_while_a_verdict_is_pending() {
        let rules = rules();
        let mut session = session(&rules);
        session.open(&rules, "web-1", T0).unwrap();

        let pending = session.begin_submission(&rules, "web-1", 1_000).unwrap();
        assert_eq!(
            session.begin_submission(&rules, "web-1", 1_500).unwrap_err(),
            SessionError::SubmissionPending("web-1".into())
        );

        session.release_submission(pending);
        assert!(!session.is_awaiting_verdict("web-1"));
        let retry = session.begin_submission(&rules, "web-1", 2_000).unwrap();
        session.release_submission(retry);
    }

    #[test]
    fn timer_waits_for_a_pending_verdict() {
        let rules = rules();
        let mut session = session(&rules);
        session.open(&rules, "web-1", T0).unwrap();
        let pending = session.begin_submission(&rules, "web-1", 119_000).unwrap();

        assert!(!session.evaluate_timers(121_000).mutated());
        session.complete_submission(pending, true, &rules);

        assert!(!session.evaluate_timers(122_000).mutated());
        assert!(session.solved().contains("web-1"));
        assert_disjoint(&session);
    }

    #[test]
    fn wrong_verdict_past_deadline_expires_on_next_tick() {
        let rules = rules();
        let mut session = session(&rules);
        session.open(&rules, "web-1", T0).unwrap();
        let pending = session.begin_submission(&rules, "web-1", 119_000).unwrap();
        session.complete_submission(pending, false, &rules);

        let report = session.evaluate_timers(121_000);

        assert_eq!(report.expired.as_deref(), Some("web-1"));
        assert_disjoint(&session);
    }

    #[test]
    fn solved_challenge_never_expires() {
        let rules = rules();
        let mut session = session(&rules);
        session.open(&rules, "web-1", T0).unwrap();
        let pending = session.begin_submission(&rules, "web-1", 1_000).unwrap();
        session.complete_submission(pending, true, &rules);

        assert!(!session.evaluate_timers(500_000).mutated());
        assert_disjoint(&session);
    }

    #[test]
    fn close_if_open_only_targets_the_given_challenge() {
        let rules = rules();
        let mut session = session(&rules);
        session.open(&rules, "web-1", T0).unwrap();
        session.open(&rules, "web-5", T0).unwrap();

        assert!(!session.close_if_open("web-1"));
        assert!(session.close_if_open("web-5"));
        assert!(session.open_challenge().is_none());
    }

    #[test]
    fn score_adjustments_clamp_at_zero() {
        let rules = rules();
        let mut session = session(&rules);
        assert_eq!(session.adjust_score(120), 120);
        assert_eq!(session.adjust_score(-500), 0);
        assert_eq!(session.adjust_score(i64::MIN), 0);
    }

    #[test]
    fn hydrate_fills_missing_keys_and_repairs_overlap() {
        let rules = rules();
        let entity = SessionEntity {
            score: Some(400),
            solved: Some(vec!["web-1".into()]),
            expired: Some(vec!["web-1".into(), "web-5".into()]),
            deadlines: None,
            global_deadline: None,
            joker_usage: Some(
                [("chronoshard".to_string(), 2), ("init".to_string(), 1)]
                    .into_iter()
                    .collect(),
            ),
        };

        let session = SessionState::hydrate(entity, 10_000, &rules.tables);

        assert_eq!(session.score(), 400);
        assert!(session.solved().contains("web-1"));
        assert!(!session.expired().contains("web-1"));
        assert!(session.expired().contains("web-5"));
        assert_eq!(session.global_deadline(), 10_000 + 7_200_000);
        assert_eq!(session.uses(JokerKind::Chronoshard), 2);
        assert_eq!(session.uses(JokerKind::RerollTrial), 0);
    }

    #[test]
    fn entity_round_trip_preserves_persisted_fields() {
        let rules = rules();
        let mut session = session(&rules);
        session.open(&rules, "web-1", T0).unwrap();
        session.adjust_score(90);

        let restored =
            SessionState::hydrate(SessionEntity::from(&session), 99_999, &rules.tables);

        assert_eq!(restored.score(), 90);
        assert_eq!(restored.deadlines(), session.deadlines());
        assert_eq!(restored.global_deadline(), session.global_deadline());
        assert!(restored.open_challenge().is_none());
    }
}
