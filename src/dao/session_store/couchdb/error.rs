use reqwest::StatusCode;
use thiserror::Error;

pub type CouchResult<T> = Result<T, CouchError>;

/// Failures talking to CouchDB.
#[derive(Debug, Error)]
pub enum CouchError {
    #[error("missing CouchDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    #[error("failed to build CouchDB client")]
    Client(#[source] reqwest::Error),
    /// The request never got an answer.
    #[error("CouchDB {action} failed")]
    Transport {
        action: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("CouchDB answered {status} to {action}")]
    Status {
        action: &'static str,
        status: StatusCode,
    },
    /// The answer was not the JSON we expected.
    #[error("unreadable CouchDB reply to {action}")]
    Decode {
        action: &'static str,
        #[source]
        source: reqwest::Error,
    },
}
