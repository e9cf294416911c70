//! Payloads of the `/api/session` endpoints and the `session.updated` event.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{format_epoch_millis, public::AttachmentView, validation::validate_challenge_id},
    state::{
        Rules,
        catalog::{Challenge, MAX_DIFFICULTY, MIN_DIFFICULTY},
        clock::EpochMillis,
        jokers::{JokerEffect, JokerKind, JokerReport, WildcardOutcome},
        session::SessionState,
    },
};

/// Status of one board tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TileStatus {
    /// No challenge defined for this slot.
    Placeholder,
    /// The board is globally locked.
    Locked,
    /// Can be opened.
    Available,
    /// Currently open.
    Open,
    /// Solved.
    Solved,
    /// Ran out of time.
    Expired,
}

/// One (category, difficulty) slot of the board.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TileView {
    pub difficulty: u8,
    pub points: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challenge_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub status: TileStatus,
    /// Deadline if the challenge clock has started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<u64>,
}

/// Board column for one category.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BoardColumn {
    pub key: String,
    pub label: String,
    pub tiles: Vec<TileView>,
}

/// The challenge currently open, with its statement and clock.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpenChallengeView {
    pub id: String,
    pub category_key: String,
    pub difficulty: u8,
    pub points: u64,
    pub title: String,
    pub description: String,
    pub external_link: String,
    pub files: Vec<AttachmentView>,
    pub deadline: u64,
    pub remaining_ms: u64,
    pub solved: bool,
    pub expired: bool,
    pub awaiting_verdict: bool,
}

/// Usage of one joker kind.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct JokerUsageView {
    pub kind: JokerKind,
    pub used: u32,
    pub max: u32,
    pub remaining: u32,
}

/// Full projection of the session as rendered by the UI.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub score: u64,
    pub solved: Vec<String>,
    pub expired: Vec<String>,
    /// Challenge id → deadline in epoch milliseconds.
    pub deadlines: BTreeMap<String, u64>,
    pub global_deadline: u64,
    /// [`Self::global_deadline`] as an RFC 3339 timestamp.
    pub global_deadline_at: String,
    pub global_remaining_ms: u64,
    pub globally_locked: bool,
    pub jokers: Vec<JokerUsageView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_challenge: Option<OpenChallengeView>,
    pub board: Vec<BoardColumn>,
    pub server_time: u64,
}

impl SessionView {
    /// Project `session` at instant `now`.
    pub fn build(session: &SessionState, rules: &Rules, now: EpochMillis) -> Self {
        let locked = session.is_globally_locked(now);
        let open_challenge = session
            .open_challenge()
            .and_then(|id| rules.catalog.challenge(id))
            .map(|challenge| open_challenge_view(session, rules, challenge, now));

        Self {
            score: session.score(),
            solved: session.solved().iter().cloned().collect(),
            expired: session.expired().iter().cloned().collect(),
            deadlines: session.deadlines().clone(),
            global_deadline: session.global_deadline(),
            global_deadline_at: format_epoch_millis(session.global_deadline()),
            global_remaining_ms: session.global_remaining(now),
            globally_locked: locked,
            jokers: JokerKind::ALL
                .into_iter()
                .map(|kind| {
                    let used = session.uses(kind);
                    let max = rules.tables.jokers.max(kind);
                    JokerUsageView {
                        kind,
                        used,
                        max,
                        remaining: max.saturating_sub(used),
                    }
                })
                .collect(),
            open_challenge,
            board: board(session, rules, locked),
            server_time: now,
        }
    }
}

fn open_challenge_view(
    session: &SessionState,
    rules: &Rules,
    challenge: &Challenge,
    now: EpochMillis,
) -> OpenChallengeView {
    let deadline = session.deadline(&challenge.id).unwrap_or(now);
    OpenChallengeView {
        id: challenge.id.clone(),
        category_key: challenge.category_key.clone(),
        difficulty: challenge.difficulty,
        points: rules.tables.points(challenge.difficulty),
        title: challenge.title.clone(),
        description: challenge.description.clone(),
        external_link: challenge.external_link.clone(),
        files: challenge.files.iter().map(Into::into).collect(),
        deadline,
        remaining_ms: deadline.saturating_sub(now),
        solved: session.solved().contains(&challenge.id),
        expired: session.expired().contains(&challenge.id),
        awaiting_verdict: session.is_awaiting_verdict(&challenge.id),
    }
}

fn board(session: &SessionState, rules: &Rules, locked: bool) -> Vec<BoardColumn> {
    rules
        .catalog
        .categories()
        .map(|category| {
            let tiles = (MIN_DIFFICULTY..=MAX_DIFFICULTY)
                .map(|difficulty| {
                    let challenge = slot_challenge(session, rules, &category.key, difficulty);
                    tile(session, rules, difficulty, challenge, locked)
                })
                .collect();
            BoardColumn {
                key: category.key.clone(),
                label: category.label.clone(),
                tiles,
            }
        })
        .collect()
}

/// Challenge shown for a slot: the open one, else one whose clock is running, else one already
/// played, else the first declared. A rerolled alternate keeps the tile after being closed.
fn slot_challenge<'a>(
    session: &SessionState,
    rules: &'a Rules,
    category_key: &str,
    difficulty: u8,
) -> Option<&'a Challenge> {
    let open = session.open_challenge().map(String::as_str);
    rules
        .catalog
        .slot(category_key, difficulty)
        .map(|challenge| {
            let id = challenge.id.as_str();
            let rank = if open == Some(id) {
                0
            } else if session.deadline(id).is_some() && !session.is_resolved(id) {
                1
            } else if session.is_resolved(id) {
                2
            } else {
                3
            };
            (rank, challenge)
        })
        .min_by_key(|(rank, _)| *rank)
        .map(|(_, challenge)| challenge)
}

fn tile(
    session: &SessionState,
    rules: &Rules,
    difficulty: u8,
    challenge: Option<&Challenge>,
    locked: bool,
) -> TileView {
    let points = rules.tables.points(difficulty);
    let Some(challenge) = challenge else {
        return TileView {
            difficulty,
            points,
            challenge_id: None,
            title: None,
            status: TileStatus::Placeholder,
            deadline: None,
        };
    };

    let id = challenge.id.as_str();
    let status = if session.solved().contains(id) {
        TileStatus::Solved
    } else if session.expired().contains(id) {
        TileStatus::Expired
    } else if session.open_challenge().map(String::as_str) == Some(id) {
        TileStatus::Open
    } else if locked {
        TileStatus::Locked
    } else {
        TileStatus::Available
    };

    TileView {
        difficulty,
        points,
        challenge_id: Some(challenge.id.clone()),
        title: Some(challenge.title.clone()),
        status,
        deadline: session.deadline(id),
    }
}

/// Request to open a challenge.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OpenChallengeRequest {
    #[validate(custom(function = "validate_challenge_id"))]
    pub challenge_id: String,
}

/// Answer for the open challenge.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SessionSubmitRequest {
    #[validate(custom(function = "validate_challenge_id"))]
    pub challenge_id: String,
    /// Candidate flag; `flag` is accepted as an alias.
    #[serde(alias = "flag")]
    #[validate(length(max = 4096))]
    pub answer: String,
}

/// How a verdict affected the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// Newly solved.
    Solved,
    /// Correct, but the challenge was already resolved.
    AlreadyResolved,
    /// Wrong answer.
    Incorrect,
}

/// Result of a session submit.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionSubmitResponse {
    pub ok: bool,
    pub outcome: SubmitOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<u64>,
    pub score: u64,
    pub attempt_id: Uuid,
}

/// Hint revealed by the oracle.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OracleEffect {
    pub challenge_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// True when the challenge has no hint to reveal.
    pub silent: bool,
    pub cost: u64,
}

/// Deadline pushed back by a chronoshard.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChronoshardEffect {
    pub challenge_id: String,
    pub deadline: u64,
}

/// Open challenge swapped by a reroll.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RerollEffect {
    pub from: String,
    pub to: String,
    pub deadline: u64,
}

/// Outcome of a wildcard ritual.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WildcardEffect {
    pub outcome: WildcardOutcome,
    pub score_delta: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extended_challenge_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<u64>,
}

/// Effect of a joker, tagged by `type`.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JokerEffectView {
    Oracle(OracleEffect),
    Chronoshard(ChronoshardEffect),
    Reroll(RerollEffect),
    Wildcard(WildcardEffect),
}

impl From<JokerEffect> for JokerEffectView {
    fn from(value: JokerEffect) -> Self {
        match value {
            JokerEffect::Oracle {
                challenge_id,
                hint,
                cost,
            } => JokerEffectView::Oracle(OracleEffect {
                challenge_id,
                silent: hint.is_none(),
                hint,
                cost,
            }),
            JokerEffect::Chronoshard {
                challenge_id,
                deadline,
            } => JokerEffectView::Chronoshard(ChronoshardEffect {
                challenge_id,
                deadline,
            }),
            JokerEffect::Reroll { from, to, deadline } => {
                JokerEffectView::Reroll(RerollEffect { from, to, deadline })
            }
            JokerEffect::Wildcard {
                outcome,
                score_delta,
                extended,
            } => {
                let (extended_challenge_id, deadline) = extended.unzip();
                JokerEffectView::Wildcard(WildcardEffect {
                    outcome,
                    score_delta,
                    extended_challenge_id,
                    deadline,
                })
            }
        }
    }
}

/// Result of a joker application.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct JokerResponse {
    pub kind: JokerKind,
    pub uses: u32,
    pub max: u32,
    pub effect: JokerEffectView,
    pub session: SessionView,
}

impl JokerResponse {
    /// Combine a joker report with the session projection taken right after it.
    pub fn new(report: JokerReport, session: SessionView) -> Self {
        Self {
            kind: report.kind,
            uses: report.uses,
            max: report.max,
            effect: report.effect.into(),
            session,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::session::fixtures::{T0, rules, session};

    fn statuses(view: &SessionView, category: &str) -> Vec<TileStatus> {
        view.board
            .iter()
            .find(|column| column.key == category)
            .map(|column| column.tiles.iter().map(|tile| tile.status).collect())
            .unwrap_or_default()
    }

    #[test]
    fn board_marks_placeholders_and_open_tile() {
        let rules = rules();
        let mut session = session(&rules);
        session.open(&rules, "web-1", T0).unwrap();

        let view = SessionView::build(&session, &rules, 1_000);
        let web = statuses(&view, "web");

        assert_eq!(web.len(), 10);
        assert_eq!(web[0], TileStatus::Open);
        assert_eq!(web[1], TileStatus::Placeholder);
        assert_eq!(web[2], TileStatus::Available);
        assert_eq!(view.open_challenge.as_ref().map(|c| c.remaining_ms), Some(119_000));
    }

    #[test]
    fn rerolled_alternate_takes_over_its_tile() {
        let rules = rules();
        let mut session = session(&rules);
        session.open(&rules, "web-3a", T0).unwrap();
        let mut rng = rand::rng();
        session
            .apply_joker(&rules, JokerKind::RerollTrial, 1_000, &mut rng)
            .unwrap();

        let view = SessionView::build(&session, &rules, 2_000);
        let tile = &view.board[0].tiles[2];

        assert_eq!(tile.challenge_id.as_deref(), Some("web-3b"));
        assert_eq!(tile.status, TileStatus::Open);
    }

    #[test]
    fn rerolled_alternate_keeps_its_tile_after_closing() {
        let rules = rules();
        let mut session = session(&rules);
        session.open(&rules, "web-3a", T0).unwrap();
        session
            .apply_joker(&rules, JokerKind::RerollTrial, 200_000, &mut rand::rng())
            .unwrap();
        session.close();

        let view = SessionView::build(&session, &rules, 210_000);
        let tile = &view.board[0].tiles[2];

        assert_eq!(tile.challenge_id.as_deref(), Some("web-3b"));
        assert_eq!(tile.status, TileStatus::Available);
        assert_eq!(tile.deadline, Some(240_000));
    }

    #[test]
    fn global_lock_locks_untouched_tiles() {
        let rules = rules();
        let session = session(&rules);
        let after = session.global_deadline() + 1;

        let view = SessionView::build(&session, &rules, after);

        assert!(view.globally_locked);
        assert_eq!(view.global_remaining_ms, 0);
        assert_eq!(statuses(&view, "crypto")[1], TileStatus::Locked);
    }

    #[test]
    fn silent_oracle_is_flagged() {
        let view = JokerEffectView::from(JokerEffect::Oracle {
            challenge_id: "web-3a".into(),
            hint: None,
            cost: 100,
        });
        let json = serde_json::to_value(view).unwrap();

        assert_eq!(json["type"], "oracle");
        assert_eq!(json["silent"], true);
        assert!(json.get("hint").is_none());
    }
}
