/// Catalog and easter egg file loaders.
pub mod catalog;
/// Persisted session model definitions.
pub mod models;
/// Session persistence backends.
pub mod session_store;
/// Storage abstraction layer errors.
pub mod storage;
