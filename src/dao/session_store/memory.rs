use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use serde_json::Value;

use crate::dao::{
    models::SessionRecord, session_store::SessionStore, storage::StorageResult,
};

/// Process-local store; the session does not survive a restart.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    entries: Arc<DashMap<String, Value>>,
}

impl MemorySessionStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with `record`, as if a previous run had saved it.
    pub fn with_record(record: SessionRecord) -> Self {
        let store = Self::new();
        for (key, value) in record {
            store.entries.insert(key, value);
        }
        store
    }

    /// Value currently held for `key`.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }
}

impl SessionStore for MemorySessionStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn load(&self) -> BoxFuture<'static, StorageResult<SessionRecord>> {
        let entries = self.entries.clone();
        Box::pin(async move {
            Ok(entries
                .iter()
                .map(|entry| (entry.key().clone(), entry.value().clone()))
                .collect())
        })
    }

    fn save(&self, record: SessionRecord) -> BoxFuture<'static, StorageResult<()>> {
        let entries = self.entries.clone();
        Box::pin(async move {
            for (key, value) in record {
                entries.insert(key, value);
            }
            Ok(())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn saved_keys_are_loaded_back() {
        let store = MemorySessionStore::new();
        let mut record = SessionRecord::new();
        record.insert("score".into(), json!(300));

        store.save(record).await.unwrap();
        let loaded = store.load().await.unwrap();

        assert_eq!(loaded.get("score"), Some(&json!(300)));
        assert_eq!(store.get("score"), Some(json!(300)));
    }
}
