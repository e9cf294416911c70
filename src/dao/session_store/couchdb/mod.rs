//! CouchDB backend: the session mirrored as a single revisioned document.

mod config;
mod error;
mod models;
mod store;

pub use config::{CouchConfig, DEFAULT_SESSION_DOC};
pub use error::{CouchError, CouchResult};
pub use store::CouchSessionStore;

use crate::dao::storage::StorageError;

impl From<CouchError> for StorageError {
    fn from(err: CouchError) -> Self {
        match err {
            CouchError::Decode { .. } => StorageError::corrupt(err.to_string(), err),
            _ => StorageError::unavailable(err.to_string(), err),
        }
    }
}
