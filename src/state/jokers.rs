//! Joker engine: the four limited-use abilities and their effect on the session.
//!
//! A joker consumes one unit of its own counter only when it applies successfully; every
//! precondition is checked before anything is mutated.

use std::{fmt, str::FromStr};

use rand::{Rng, seq::IndexedRandom};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::state::{
    Rules,
    catalog::ChallengeId,
    clock::EpochMillis,
    session::{SessionError, SessionState},
};

/// The four joker kinds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum JokerKind {
    /// Pay to reveal the open challenge's hint.
    ConsultOracle,
    /// Add time to the open challenge.
    Chronoshard,
    /// Swap the open challenge for another one of the same tier.
    RerollTrial,
    /// Random boon or curse.
    WildcardRitual,
}

impl JokerKind {
    /// Every kind, in display order.
    pub const ALL: [JokerKind; 4] = [
        JokerKind::ConsultOracle,
        JokerKind::Chronoshard,
        JokerKind::RerollTrial,
        JokerKind::WildcardRitual,
    ];

    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            JokerKind::ConsultOracle => "consult_oracle",
            JokerKind::Chronoshard => "chronoshard",
            JokerKind::RerollTrial => "reroll_trial",
            JokerKind::WildcardRitual => "wildcard_ritual",
        }
    }
}

impl fmt::Display for JokerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing a name that matches no joker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown joker `{0}`")]
pub struct UnknownJoker(pub String);

impl FromStr for JokerKind {
    type Err = UnknownJoker;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JokerKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownJoker(s.to_string()))
    }
}

/// Outcome of a wildcard ritual, drawn uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum WildcardOutcome {
    /// Bonus points.
    Fortune,
    /// Extra time on the open challenge and on the global clock.
    TimeBend,
    /// Point penalty, clamped at zero.
    Trap,
}

impl WildcardOutcome {
    /// Draw one outcome with probability 1/3 each.
    pub fn draw<R: Rng + ?Sized>(rng: &mut R) -> Self {
        match rng.random_range(0..3) {
            0 => WildcardOutcome::Fortune,
            1 => WildcardOutcome::TimeBend,
            _ => WildcardOutcome::Trap,
        }
    }
}

/// What a joker did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JokerEffect {
    /// Hint revealed (`None` when the challenge has no hint) for `cost` points.
    Oracle {
        /// Challenge consulted.
        challenge_id: ChallengeId,
        /// Revealed hint, `None` for a silent oracle.
        hint: Option<String>,
        /// Points paid.
        cost: u64,
    },
    /// Deadline pushed back.
    Chronoshard {
        /// Challenge extended.
        challenge_id: ChallengeId,
        /// New deadline.
        deadline: EpochMillis,
    },
    /// Open challenge replaced, carrying its remaining time.
    Reroll {
        /// Challenge given up.
        from: ChallengeId,
        /// Challenge now open.
        to: ChallengeId,
        /// Deadline of the new challenge.
        deadline: EpochMillis,
    },
    /// Wildcard drawn.
    Wildcard {
        /// Drawn outcome.
        outcome: WildcardOutcome,
        /// Signed score change actually applied.
        score_delta: i64,
        /// Open challenge extended by a time bend, with its new deadline.
        extended: Option<(ChallengeId, EpochMillis)>,
    },
}

/// Successful joker application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JokerReport {
    /// Kind used.
    pub kind: JokerKind,
    /// Effect applied.
    pub effect: JokerEffect,
    /// Uses consumed so far, this one included.
    pub uses: u32,
    /// Configured cap.
    pub max: u32,
    /// Score after the effect.
    pub score: u64,
    /// Global deadline after the effect.
    pub global_deadline: EpochMillis,
}

impl SessionState {
    /// Apply a joker, drawing any randomness from `rng`.
    pub fn apply_joker<R: Rng + ?Sized>(
        &mut self,
        rules: &Rules,
        kind: JokerKind,
        now: EpochMillis,
        rng: &mut R,
    ) -> Result<JokerReport, SessionError> {
        self.ensure_uses_left(rules, kind)?;
        let effect = match kind {
            JokerKind::ConsultOracle => self.consult_oracle(rules, now)?,
            JokerKind::Chronoshard => self.chronoshard(rules)?,
            JokerKind::RerollTrial => self.reroll_trial(rules, now, rng)?,
            JokerKind::WildcardRitual => {
                let outcome = WildcardOutcome::draw(rng);
                return self.apply_wildcard(rules, outcome);
            }
        };
        Ok(self.consume(rules, kind, effect))
    }

    /// Apply a wildcard ritual with a predetermined outcome.
    pub fn apply_wildcard(
        &mut self,
        rules: &Rules,
        outcome: WildcardOutcome,
    ) -> Result<JokerReport, SessionError> {
        self.ensure_uses_left(rules, JokerKind::WildcardRitual)?;

        let rule = rules.tables.jokers.wildcard_ritual;
        let before = self.score;
        let mut extended = None;
        match outcome {
            WildcardOutcome::Fortune => self.credit(rule.bonus),
            WildcardOutcome::TimeBend => {
                let extra = rule.seconds.saturating_mul(1_000);
                let target = self
                    .open_challenge
                    .clone()
                    .filter(|open| !self.is_resolved(open) && !self.is_awaiting_verdict(open));
                if let Some(open) = target
                    && let Some(deadline) = self.deadlines.get_mut(&open)
                {
                    *deadline = deadline.saturating_add(extra);
                    extended = Some((open, *deadline));
                }
                self.global_deadline = self.global_deadline.saturating_add(extra);
            }
            WildcardOutcome::Trap => self.debit(rule.penalty),
        }

        let score_delta = i64::try_from(self.score).unwrap_or(i64::MAX)
            - i64::try_from(before).unwrap_or(i64::MAX);
        let effect = JokerEffect::Wildcard {
            outcome,
            score_delta,
            extended,
        };
        Ok(self.consume(rules, JokerKind::WildcardRitual, effect))
    }

    fn ensure_uses_left(&self, rules: &Rules, kind: JokerKind) -> Result<(), SessionError> {
        if self.uses(kind) >= rules.tables.jokers.max(kind) {
            return Err(SessionError::NoUsesLeft(kind));
        }
        Ok(())
    }

    fn consume(&mut self, rules: &Rules, kind: JokerKind, effect: JokerEffect) -> JokerReport {
        let uses = self.joker_usage.entry(kind).or_default();
        *uses += 1;
        JokerReport {
            kind,
            effect,
            uses: *uses,
            max: rules.tables.jokers.max(kind),
            score: self.score,
            global_deadline: self.global_deadline,
        }
    }

    /// Open challenge that is still playable, for jokers that act on it.
    fn active_challenge(&self) -> Result<ChallengeId, SessionError> {
        let open = self
            .open_challenge
            .clone()
            .ok_or(SessionError::NoOpenChallenge)?;
        if self.is_resolved(&open) {
            return Err(SessionError::AlreadyResolved(open));
        }
        Ok(open)
    }

    fn consult_oracle(&mut self, rules: &Rules, now: EpochMillis) -> Result<JokerEffect, SessionError> {
        let open = self.active_challenge()?;
        if self.deadline(&open).is_none_or(|deadline| deadline <= now) {
            return Err(SessionError::Expired(open));
        }
        let cost = rules.tables.hint_cost;
        if self.score < cost {
            return Err(SessionError::InsufficientScore {
                required: cost,
                available: self.score,
            });
        }
        let hint = rules
            .catalog
            .challenge(&open)
            .map(|challenge| challenge.hint.trim())
            .filter(|hint| !hint.is_empty())
            .map(str::to_string);

        self.debit(cost);
        Ok(JokerEffect::Oracle {
            challenge_id: open,
            hint,
            cost,
        })
    }

    fn chronoshard(&mut self, rules: &Rules) -> Result<JokerEffect, SessionError> {
        let open = self.active_challenge()?;
        if self.is_awaiting_verdict(&open) {
            return Err(SessionError::SubmissionPending(open));
        }
        let extra = rules.tables.jokers.chronoshard.seconds.saturating_mul(1_000);
        let Some(deadline) = self.deadlines.get_mut(&open) else {
            return Err(SessionError::NoOpenChallenge);
        };
        *deadline = deadline.saturating_add(extra);
        Ok(JokerEffect::Chronoshard {
            challenge_id: open,
            deadline: *deadline,
        })
    }

    fn reroll_trial<R: Rng + ?Sized>(
        &mut self,
        rules: &Rules,
        now: EpochMillis,
        rng: &mut R,
    ) -> Result<JokerEffect, SessionError> {
        let open = self.active_challenge()?;
        if self.is_awaiting_verdict(&open) {
            return Err(SessionError::SubmissionPending(open));
        }
        let candidates: Vec<&ChallengeId> = rules
            .catalog
            .alternates(&open)
            .into_iter()
            .map(|challenge| &challenge.id)
            .filter(|id| !self.is_resolved(id) && !self.is_awaiting_verdict(id))
            .collect();
        let next = candidates
            .choose(rng)
            .map(|id| (*id).clone())
            .ok_or_else(|| SessionError::NoAlternateTrial(open.clone()))?;

        let remain = self
            .deadlines
            .remove(&open)
            .map(|deadline| deadline.saturating_sub(now))
            .unwrap_or_default();
        let deadline = now.saturating_add(remain);
        self.deadlines.insert(next.clone(), deadline);
        self.open_challenge = Some(next.clone());

        Ok(JokerEffect::Reroll {
            from: open,
            to: next,
            deadline,
        })
    }
}
