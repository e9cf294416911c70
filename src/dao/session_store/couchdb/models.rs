use serde::{Deserialize, Serialize};

use crate::dao::models::SessionRecord;

/// The whole session as one CouchDB document. Session keys sit next to `_id` and `_rev`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub fields: SessionRecord,
}

impl SessionDocument {
    /// Session keys only, without CouchDB metadata such as `_attachments`.
    pub fn into_record(self) -> SessionRecord {
        self.fields
            .into_iter()
            .filter(|(key, _)| !key.starts_with('_'))
            .collect()
    }
}

/// Reply to a successful document write.
#[derive(Debug, Deserialize)]
pub struct WriteReply {
    pub rev: String,
}
