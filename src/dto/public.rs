//! Payloads of the static content and gateway endpoints under `/api`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dto::validation::validate_challenge_id,
    state::{
        Rules,
        catalog::{Attachment, Category, Challenge},
        jokers::JokerKind,
        tables::JokerTable,
    },
};

/// Game metadata and rule tables exposed to the UI.
#[derive(Debug, Serialize, ToSchema)]
pub struct ConfigResponse {
    pub game: GameSection,
    pub timers: TimersSection,
    pub scoring: ScoringSection,
    /// Joker kind → limits and parameters.
    #[schema(value_type = BTreeMap<String, JokerConfig>)]
    pub jokers: BTreeMap<JokerKind, JokerConfig>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GameSection {
    pub title: String,
    pub global_minutes: u64,
    pub default_theme: String,
    pub themes: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TimersSection {
    /// Difficulty ("1".."10") → allotted seconds.
    pub by_difficulty: BTreeMap<String, u64>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScoringSection {
    /// Difficulty ("1".."10") → points.
    pub by_difficulty: BTreeMap<String, u64>,
    pub hint_cost: u64,
}

/// Limits and kind-specific parameters of one joker.
#[derive(Debug, Serialize, ToSchema)]
pub struct JokerConfig {
    pub max: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bonus: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub penalty: Option<u64>,
}

impl JokerConfig {
    fn limit(max: u32) -> Self {
        Self {
            max,
            cost: None,
            seconds: None,
            bonus: None,
            penalty: None,
        }
    }
}

fn joker_configs(table: &JokerTable) -> BTreeMap<JokerKind, JokerConfig> {
    JokerKind::ALL
        .into_iter()
        .map(|kind| {
            let config = match kind {
                JokerKind::ConsultOracle => JokerConfig {
                    cost: Some(table.consult_oracle.cost),
                    ..JokerConfig::limit(table.consult_oracle.max)
                },
                JokerKind::Chronoshard => JokerConfig {
                    seconds: Some(table.chronoshard.seconds),
                    ..JokerConfig::limit(table.chronoshard.max)
                },
                JokerKind::RerollTrial => JokerConfig::limit(table.reroll_trial.max),
                JokerKind::WildcardRitual => JokerConfig {
                    seconds: Some(table.wildcard_ritual.seconds),
                    bonus: Some(table.wildcard_ritual.bonus),
                    penalty: Some(table.wildcard_ritual.penalty),
                    ..JokerConfig::limit(table.wildcard_ritual.max)
                },
            };
            (kind, config)
        })
        .collect()
}

fn stringify_keys(table: &BTreeMap<u8, u64>) -> BTreeMap<String, u64> {
    table
        .iter()
        .map(|(difficulty, value)| (difficulty.to_string(), *value))
        .collect()
}

impl From<&Rules> for ConfigResponse {
    fn from(rules: &Rules) -> Self {
        Self {
            game: GameSection {
                title: rules.game.title.clone(),
                global_minutes: rules.tables.global_minutes,
                default_theme: rules.game.default_theme.clone(),
                themes: rules.game.themes.clone(),
            },
            timers: TimersSection {
                by_difficulty: stringify_keys(&rules.tables.timers),
            },
            scoring: ScoringSection {
                by_difficulty: stringify_keys(&rules.tables.scoring),
                hint_cost: rules.tables.hint_cost,
            },
            jokers: joker_configs(&rules.tables.jokers),
        }
    }
}

/// Public projection of the catalog. Flag material never appears here.
#[derive(Debug, Serialize, ToSchema)]
pub struct ChallengesResponse {
    pub categories: Vec<CategoryView>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryView {
    pub key: String,
    pub label: String,
    pub challenges: Vec<ChallengeView>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeView {
    pub id: String,
    pub difficulty: u8,
    pub title: String,
    pub description: String,
    pub hint: String,
    pub external_link: String,
    pub files: Vec<AttachmentView>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AttachmentView {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_b64: Option<String>,
}

impl From<&Attachment> for AttachmentView {
    fn from(value: &Attachment) -> Self {
        Self {
            name: value.name.clone(),
            url: value.url.clone(),
            content_b64: value.content_b64.clone(),
        }
    }
}

impl From<&Challenge> for ChallengeView {
    fn from(value: &Challenge) -> Self {
        Self {
            id: value.id.clone(),
            difficulty: value.difficulty,
            title: value.title.clone(),
            description: value.description.clone(),
            hint: value.hint.clone(),
            external_link: value.external_link.clone(),
            files: value.files.iter().map(Into::into).collect(),
        }
    }
}

impl From<&Category> for CategoryView {
    fn from(value: &Category) -> Self {
        Self {
            key: value.key.clone(),
            label: value.label.clone(),
            challenges: value.challenges.iter().map(Into::into).collect(),
        }
    }
}

/// Answer submitted for verification.
#[derive(Debug, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    #[validate(custom(function = "validate_challenge_id"))]
    pub challenge_id: String,
    /// Candidate flag; `flag` is accepted as an alias.
    #[serde(alias = "flag")]
    pub answer: String,
}

/// Verdict of the gateway.
#[derive(Debug, Serialize, ToSchema)]
pub struct SubmitResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<u64>,
}

/// Incantation typed by the player.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct EasterEggRequest {
    #[validate(length(max = 256))]
    pub text: String,
}

/// Result of an incantation; `score` is the session score after the reward.
#[derive(Debug, Serialize, ToSchema)]
pub struct EasterEggResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward: Option<i64>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u64>,
}
