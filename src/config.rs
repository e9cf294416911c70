//! Application-level configuration: game tables from JSON files and runtime settings from the
//! environment.

use std::{
    collections::BTreeMap,
    env, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use serde_with::{DisplayFromStr, serde_as};
use thiserror::Error;
use tracing::info;

use crate::state::{
    SessionTimings,
    tables::{
        ChronoshardRule, GameInfo, JokerLimit, JokerTable, OracleRule, Tables, WildcardRule,
    },
};

/// Default location of the game configuration.
const DEFAULT_CONFIG_PATH: &str = "config/game.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "TRIALS_BACK_CONFIG_PATH";
const DEFAULT_CHALLENGES_PATH: &str = "data/challenges.json";
const CHALLENGES_PATH_ENV: &str = "TRIALS_BACK_CHALLENGES_PATH";
const DEFAULT_EASTER_EGGS_PATH: &str = "data/easter_eggs.json";
const EASTER_EGGS_PATH_ENV: &str = "TRIALS_BACK_EASTER_EGGS_PATH";
const DEFAULT_JOKERS_PATH: &str = "data/jokers.json";
const JOKERS_PATH_ENV: &str = "TRIALS_BACK_JOKERS_PATH";
const DEFAULT_SESSION_FILE: &str = "data/session.json";
const DEFAULT_PORT: u16 = 3001;

/// Failures that prevent the service from starting.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration file exists but could not be read.
    #[error("failed to read `{path}`")]
    Read {
        /// Offending file.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// A configuration file is malformed.
    #[error("failed to parse `{path}`")]
    Parse {
        /// Offending file.
        path: String,
        /// Underlying decoding error.
        #[source]
        source: serde_json::Error,
    },
    /// An environment variable holds an unusable value.
    #[error("invalid value `{value}` for `{var}`")]
    InvalidEnv {
        /// Variable name.
        var: &'static str,
        /// Rejected value.
        value: String,
    },
}

/// Which backend mirrors the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreSettings {
    /// Keep the session in memory only.
    Memory,
    /// Single JSON file on disk.
    File(PathBuf),
    /// CouchDB, configured through the `COUCH_*` variables.
    Couch,
}

/// Locations of the static content files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentPaths {
    /// Challenge catalog (mandatory).
    pub challenges: PathBuf,
    /// Easter egg table (optional).
    pub easter_eggs: PathBuf,
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Presentation metadata.
    pub game: GameInfo,
    /// Scoring, timer and joker tables.
    pub tables: Tables,
    /// Background task and submit flow durations.
    pub timings: SessionTimings,
    /// Static content locations.
    pub content: ContentPaths,
    /// Session persistence backend.
    pub store: StoreSettings,
    /// Remote verifier endpoint; the in-process verifier is used when unset.
    pub verifier_url: Option<String>,
    /// HTTP listening port.
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            game: GameInfo::default(),
            tables: Tables::default(),
            timings: SessionTimings::default(),
            content: ContentPaths {
                challenges: PathBuf::from(DEFAULT_CHALLENGES_PATH),
                easter_eggs: PathBuf::from(DEFAULT_EASTER_EGGS_PATH),
            },
            store: StoreSettings::File(PathBuf::from(DEFAULT_SESSION_FILE)),
            verifier_url: None,
            port: DEFAULT_PORT,
        }
    }
}

impl AppConfig {
    /// Load the configuration from disk and the environment.
    ///
    /// Missing files fall back to built-in tables; a file that exists but does not parse is
    /// an error, since silently playing with the wrong tables would corrupt scoring.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let path = resolve_path(CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH);
        match read_optional::<RawConfig>(&path)? {
            Some(raw) => {
                raw.apply(&mut config);
                info!(path = %path.display(), "loaded game configuration");
            }
            None => info!(path = %path.display(), "config file not found; using built-in tables"),
        }

        let jokers_path = resolve_path(JOKERS_PATH_ENV, DEFAULT_JOKERS_PATH);
        if let Some(raw) = read_optional::<RawJokerTable>(&jokers_path)? {
            raw.apply(&mut config.tables.jokers);
            info!(path = %jokers_path.display(), "loaded joker table");
        }

        config.content = ContentPaths {
            challenges: resolve_path(CHALLENGES_PATH_ENV, DEFAULT_CHALLENGES_PATH),
            easter_eggs: resolve_path(EASTER_EGGS_PATH_ENV, DEFAULT_EASTER_EGGS_PATH),
        };
        config.port = port_from_env()?;
        config.store = store_from_env()?;
        config.verifier_url = non_empty_env("VERIFIER_URL");

        Ok(config)
    }
}

/// JSON representation of `config/game.json`; mirrors the `GET /api/config` payload.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    #[serde(default)]
    game: Option<RawGame>,
    #[serde(default)]
    timers: Option<RawByDifficulty>,
    #[serde(default)]
    scoring: Option<RawScoring>,
    #[serde(default)]
    jokers: Option<RawJokerTable>,
    #[serde(default)]
    timings: Option<RawTimings>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGame {
    title: Option<String>,
    global_minutes: Option<u64>,
    default_theme: Option<String>,
    themes: Option<Vec<String>>,
}

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawByDifficulty {
    #[serde_as(as = "BTreeMap<DisplayFromStr, _>")]
    by_difficulty: BTreeMap<u8, u64>,
}

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawScoring {
    #[serde_as(as = "Option<BTreeMap<DisplayFromStr, _>>")]
    #[serde(default)]
    by_difficulty: Option<BTreeMap<u8, u64>>,
    #[serde(default)]
    hint_cost: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTimings {
    tick_ms: Option<u64>,
    verify_timeout_ms: Option<u64>,
    close_grace_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawJokerTable {
    #[serde(default)]
    consult_oracle: Option<RawJoker>,
    #[serde(default)]
    chronoshard: Option<RawJoker>,
    #[serde(default)]
    reroll_trial: Option<RawJoker>,
    #[serde(default)]
    wildcard_ritual: Option<RawJoker>,
}

#[derive(Debug, Default, Deserialize)]
struct RawJoker {
    max: Option<u32>,
    cost: Option<u64>,
    seconds: Option<u64>,
    bonus: Option<u64>,
    penalty: Option<u64>,
}

impl RawConfig {
    fn apply(self, config: &mut AppConfig) {
        if let Some(game) = self.game {
            let info = &mut config.game;
            if let Some(title) = game.title {
                info.title = title;
            }
            if let Some(theme) = game.default_theme {
                info.default_theme = theme;
            }
            if let Some(themes) = game.themes {
                info.themes = themes;
            }
            if let Some(minutes) = game.global_minutes {
                config.tables.global_minutes = minutes;
            }
        }
        if let Some(timers) = self.timers {
            config.tables.timers.extend(timers.by_difficulty);
        }
        if let Some(scoring) = self.scoring {
            if let Some(points) = scoring.by_difficulty {
                config.tables.scoring.extend(points);
            }
            if let Some(cost) = scoring.hint_cost {
                config.tables.hint_cost = cost;
            }
        }
        if let Some(jokers) = self.jokers {
            jokers.apply(&mut config.tables.jokers);
        }
        if let Some(timings) = self.timings {
            let target = &mut config.timings;
            if let Some(ms) = timings.tick_ms.filter(|ms| *ms > 0) {
                target.tick = Duration::from_millis(ms);
            }
            if let Some(ms) = timings.verify_timeout_ms.filter(|ms| *ms > 0) {
                target.verify_timeout = Duration::from_millis(ms);
            }
            if let Some(ms) = timings.close_grace_ms {
                target.close_grace = Duration::from_millis(ms);
            }
        }
    }
}

impl RawJokerTable {
    fn apply(self, table: &mut JokerTable) {
        if let Some(raw) = self.consult_oracle {
            let OracleRule { max, cost } = table.consult_oracle;
            table.consult_oracle = OracleRule {
                max: raw.max.unwrap_or(max),
                cost: raw.cost.unwrap_or(cost),
            };
        }
        if let Some(raw) = self.chronoshard {
            let ChronoshardRule { max, seconds } = table.chronoshard;
            table.chronoshard = ChronoshardRule {
                max: raw.max.unwrap_or(max),
                seconds: raw.seconds.unwrap_or(seconds),
            };
        }
        if let Some(raw) = self.reroll_trial {
            table.reroll_trial = JokerLimit {
                max: raw.max.unwrap_or(table.reroll_trial.max),
            };
        }
        if let Some(raw) = self.wildcard_ritual {
            let current = table.wildcard_ritual;
            table.wildcard_ritual = WildcardRule {
                max: raw.max.unwrap_or(current.max),
                bonus: raw.bonus.unwrap_or(current.bonus),
                penalty: raw.penalty.unwrap_or(current.penalty),
                seconds: raw.seconds.unwrap_or(current.seconds),
            };
        }
    }
}

/// Read and decode `path`, returning `None` when the file does not exist.
fn read_optional<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Option<T>, ConfigError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.display().to_string(),
                source,
            });
        }
    };
    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
}

/// Resolve a file path taking the environment override into account.
fn resolve_path(var: &str, default: &str) -> PathBuf {
    env::var_os(var)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(default))
}

fn non_empty_env(var: &str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn port_from_env() -> Result<u16, ConfigError> {
    for var in ["PORT", "SERVER_PORT"] {
        if let Some(value) = non_empty_env(var) {
            return value.parse().map_err(|_| ConfigError::InvalidEnv { var, value });
        }
    }
    Ok(DEFAULT_PORT)
}

fn store_from_env() -> Result<StoreSettings, ConfigError> {
    let file = || {
        StoreSettings::File(
            non_empty_env("SESSION_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_FILE)),
        )
    };
    match non_empty_env("SESSION_STORE").as_deref() {
        None | Some("file") => Ok(file()),
        Some("memory") => Ok(StoreSettings::Memory),
        Some("couch") | Some("couchdb") => Ok(StoreSettings::Couch),
        Some(other) => Err(ConfigError::InvalidEnv {
            var: "SESSION_STORE",
            value: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> AppConfig {
        let raw: RawConfig = serde_json::from_str(json).unwrap();
        let mut config = AppConfig::default();
        raw.apply(&mut config);
        config
    }

    #[test]
    fn game_file_overrides_only_what_it_names() {
        let config = parse(
            r#"{
                "game": {"title": "Night Trials", "globalMinutes": 45},
                "timers": {"byDifficulty": {"3": 99}},
                "scoring": {"hintCost": 25}
            }"#,
        );

        assert_eq!(config.game.title, "Night Trials");
        assert_eq!(config.game.default_theme, "fantasy");
        assert_eq!(config.tables.global_minutes, 45);
        assert_eq!(config.tables.allotted_millis(3), 99_000);
        assert_eq!(config.tables.allotted_millis(4), 300_000);
        assert_eq!(config.tables.points(2), 200);
        assert_eq!(config.tables.hint_cost, 25);
    }

    #[test]
    fn joker_overrides_merge_with_defaults() {
        let config = parse(
            r#"{"jokers": {"chronoshard": {"seconds": 45}, "wildcard_ritual": {"max": 3}}}"#,
        );

        assert_eq!(config.tables.jokers.chronoshard.max, 2);
        assert_eq!(config.tables.jokers.chronoshard.seconds, 45);
        assert_eq!(config.tables.jokers.wildcard_ritual.max, 3);
        assert_eq!(config.tables.jokers.wildcard_ritual.bonus, 250);
    }

    #[test]
    fn timings_ignore_zero_ticks() {
        let config = parse(r#"{"timings": {"tickMs": 0, "closeGraceMs": 0}}"#);

        assert_eq!(config.timings.tick, SessionTimings::default().tick);
        assert_eq!(config.timings.close_grace, Duration::ZERO);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.json");
        fs::write(&path, "{ not json").unwrap();

        let err = read_optional::<RawConfig>(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(read_optional::<RawConfig>(&dir.path().join("absent.json"))
            .unwrap()
            .is_none());
    }
}
