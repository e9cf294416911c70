use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use tracing::warn;

/// Raw key→JSON view of a persisted session, as exchanged with the stores.
pub type SessionRecord = Map<String, Value>;

pub const KEY_SCORE: &str = "score";
pub const KEY_SOLVED: &str = "solved";
pub const KEY_EXPIRED: &str = "expired";
pub const KEY_DEADLINES: &str = "deadlines";
pub const KEY_GLOBAL_DEADLINE: &str = "globalDeadline";
pub const KEY_JOKER_USAGE: &str = "jokerUsage";

/// Persisted form of the session. Each field maps to one store key and may be missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionEntity {
    /// Current score.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u64>,
    /// Solved challenge ids.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solved: Option<Vec<String>>,
    /// Expired challenge ids.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expired: Option<Vec<String>>,
    /// Challenge id → deadline in epoch milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadlines: Option<BTreeMap<String, u64>>,
    /// Session deadline in epoch milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub global_deadline: Option<u64>,
    /// Joker wire name → uses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub joker_usage: Option<BTreeMap<String, u32>>,
}

impl SessionEntity {
    /// True when no key was found in the store.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Decode a raw record key by key. A key holding an unexpected shape is dropped with a
    /// warning instead of discarding the whole record.
    pub fn from_record(record: &SessionRecord) -> Self {
        Self {
            score: decode_key(record, KEY_SCORE),
            solved: decode_key(record, KEY_SOLVED),
            expired: decode_key(record, KEY_EXPIRED),
            deadlines: decode_key(record, KEY_DEADLINES),
            global_deadline: decode_key(record, KEY_GLOBAL_DEADLINE),
            joker_usage: decode_key(record, KEY_JOKER_USAGE),
        }
    }

    /// Encode into the raw key→JSON form, omitting missing fields.
    pub fn into_record(self) -> SessionRecord {
        match serde_json::to_value(self) {
            Ok(Value::Object(record)) => record,
            _ => SessionRecord::new(),
        }
    }
}

fn decode_key<T: DeserializeOwned>(record: &SessionRecord, key: &str) -> Option<T> {
    let value = record.get(key)?;
    if value.is_null() {
        return None;
    }
    match serde_json::from_value(value.clone()) {
        Ok(decoded) => Some(decoded),
        Err(err) => {
            warn!(key, error = %err, "ignoring malformed session key");
            None
        }
    }
}
