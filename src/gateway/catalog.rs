use std::sync::Arc;

use futures::future::BoxFuture;

use crate::{
    gateway::{FlagVerifier, Verdict, VerifyError},
    state::Rules,
};

/// In-process verifier comparing answers against the catalog's flag material.
#[derive(Clone)]
pub struct CatalogVerifier {
    rules: Arc<Rules>,
}

impl CatalogVerifier {
    /// Verifier reading flags from `rules`.
    pub fn new(rules: Arc<Rules>) -> Self {
        Self { rules }
    }

    /// Synchronous check, also used by the public submit endpoint.
    pub fn judge(&self, challenge_id: &str, answer: &str) -> Verdict {
        let Some(challenge) = self.rules.catalog.challenge(challenge_id) else {
            return Verdict::incorrect();
        };
        if !challenge.flag.matches(answer) {
            return Verdict::incorrect();
        }
        Verdict {
            correct: true,
            points: Some(self.rules.tables.points(challenge.difficulty)),
        }
    }
}

impl FlagVerifier for CatalogVerifier {
    fn verify(
        &self,
        challenge_id: &str,
        answer: &str,
    ) -> BoxFuture<'static, Result<Verdict, VerifyError>> {
        let verdict = self.judge(challenge_id, answer);
        Box::pin(async move { Ok(verdict) })
    }
}
