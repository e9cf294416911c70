//! Scoring, timer and joker tables plus the game metadata shown to players.

use std::collections::BTreeMap;

use crate::state::jokers::JokerKind;

/// Seconds granted when a difficulty is missing from the timer table.
pub const FALLBACK_TIMER_SECONDS: u64 = 120;
/// Points per difficulty tier when a difficulty is missing from the scoring table.
pub const FALLBACK_POINTS_PER_TIER: u64 = 100;

/// Presentation metadata for the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameInfo {
    /// Title of the event.
    pub title: String,
    /// Theme selected when the player has no preference.
    pub default_theme: String,
    /// Available themes.
    pub themes: Vec<String>,
}

impl Default for GameInfo {
    fn default() -> Self {
        Self {
            title: "Trials of Sysdrasil".into(),
            default_theme: "fantasy".into(),
            themes: vec!["fantasy".into(), "cli".into(), "corporate".into()],
        }
    }
}

/// Usage limit for a joker without extra parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JokerLimit {
    /// Maximum number of uses per session.
    pub max: u32,
}

/// Oracle parameters. The price of a hint lives in [`Tables::hint_cost`]; `cost` is only echoed
/// back to clients that read it from the joker table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OracleRule {
    /// Maximum number of uses per session.
    pub max: u32,
    /// Advertised cost.
    pub cost: u64,
}

/// Chronoshard parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChronoshardRule {
    /// Maximum number of uses per session.
    pub max: u32,
    /// Seconds added to the open challenge.
    pub seconds: u64,
}

/// Wildcard ritual parameters, one per outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WildcardRule {
    /// Maximum number of uses per session.
    pub max: u32,
    /// Points granted by the fortune outcome.
    pub bonus: u64,
    /// Points removed by the trap outcome (clamped at zero).
    pub penalty: u64,
    /// Seconds added to the open challenge and the global clock by the time-bend outcome.
    pub seconds: u64,
}

/// Per-kind joker configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JokerTable {
    /// `consult_oracle`.
    pub consult_oracle: OracleRule,
    /// `chronoshard`.
    pub chronoshard: ChronoshardRule,
    /// `reroll_trial`.
    pub reroll_trial: JokerLimit,
    /// `wildcard_ritual`.
    pub wildcard_ritual: WildcardRule,
}

impl JokerTable {
    /// Maximum number of uses allowed for `kind`.
    pub fn max(&self, kind: JokerKind) -> u32 {
        match kind {
            JokerKind::ConsultOracle => self.consult_oracle.max,
            JokerKind::Chronoshard => self.chronoshard.max,
            JokerKind::RerollTrial => self.reroll_trial.max,
            JokerKind::WildcardRitual => self.wildcard_ritual.max,
        }
    }
}

impl Default for JokerTable {
    fn default() -> Self {
        Self {
            consult_oracle: OracleRule { max: 5, cost: 100 },
            chronoshard: ChronoshardRule {
                max: 2,
                seconds: 30,
            },
            reroll_trial: JokerLimit { max: 3 },
            wildcard_ritual: WildcardRule {
                max: 1,
                bonus: 250,
                penalty: 200,
                seconds: 20,
            },
        }
    }
}

/// Difficulty-indexed tables driving scores and clocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tables {
    /// Length of the whole session in minutes.
    pub global_minutes: u64,
    /// Difficulty → allotted seconds.
    pub timers: BTreeMap<u8, u64>,
    /// Difficulty → points.
    pub scoring: BTreeMap<u8, u64>,
    /// Price of a hint from the oracle.
    pub hint_cost: u64,
    /// Joker limits and parameters.
    pub jokers: JokerTable,
}

impl Tables {
    /// Milliseconds granted to a challenge of `difficulty` when it is first opened.
    pub fn allotted_millis(&self, difficulty: u8) -> u64 {
        self.timers
            .get(&difficulty)
            .copied()
            .unwrap_or(FALLBACK_TIMER_SECONDS)
            .saturating_mul(1_000)
    }

    /// Points awarded for solving a challenge of `difficulty`.
    pub fn points(&self, difficulty: u8) -> u64 {
        self.scoring
            .get(&difficulty)
            .copied()
            .unwrap_or(u64::from(difficulty) * FALLBACK_POINTS_PER_TIER)
    }

    /// Length of the session in milliseconds.
    pub fn global_millis(&self) -> u64 {
        self.global_minutes.saturating_mul(60_000)
    }
}

impl Default for Tables {
    fn default() -> Self {
        let timers = [120, 180, 240, 300, 360, 420, 480, 540, 600, 720];
        Self {
            global_minutes: 120,
            timers: (1..=10).zip(timers).collect(),
            scoring: (1..=10u8).map(|tier| (tier, u64::from(tier) * 100)).collect(),
            hint_cost: 100,
            jokers: JokerTable::default(),
        }
    }
}
