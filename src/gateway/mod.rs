//! Flag verification gateway: the only authority on whether an answer is right.

mod catalog;
#[cfg(feature = "remote-verifier")]
mod http;

use futures::future::BoxFuture;
use thiserror::Error;

pub use catalog::CatalogVerifier;
#[cfg(feature = "remote-verifier")]
pub use http::HttpVerifier;

/// Answer returned by a verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    /// Whether the candidate flag is right.
    pub correct: bool,
    /// Points the verifier associates with the challenge, when it reports any.
    pub points: Option<u64>,
}

impl Verdict {
    /// Wrong answer.
    pub const fn incorrect() -> Self {
        Self {
            correct: false,
            points: None,
        }
    }
}

/// The verifier could not produce a verdict.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// The verifier could not be reached.
    #[error("verifier unreachable: {0}")]
    Transport(String),
    /// The verifier answered with an unexpected status.
    #[error("verifier answered with status {0}")]
    Status(u16),
    /// The verifier answer could not be decoded.
    #[error("verifier answer is malformed: {0}")]
    Decode(String),
}

/// Checks candidate flags. Implementations must not retain session state.
pub trait FlagVerifier: Send + Sync {
    /// Judge `answer` for `challenge_id`.
    fn verify(&self, challenge_id: &str, answer: &str)
    -> BoxFuture<'static, Result<Verdict, VerifyError>>;
}
