#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod file;
pub mod memory;

use futures::future::BoxFuture;

use crate::dao::{models::SessionRecord, storage::StorageResult};

pub use file::FileSessionStore;
pub use memory::MemorySessionStore;

/// Key→JSON mirror of the session, read once at startup and written after every mutation.
pub trait SessionStore: Send + Sync {
    /// Short backend name used in logs and the health payload.
    fn backend(&self) -> &'static str;
    /// Read every stored key. An empty record means nothing was persisted yet.
    fn load(&self) -> BoxFuture<'static, StorageResult<SessionRecord>>;
    /// Write every key of `record`, replacing previous values.
    fn save(&self, record: SessionRecord) -> BoxFuture<'static, StorageResult<()>>;
    /// Cheap probe telling whether the backend currently accepts writes.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
