use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::gateway::{FlagVerifier, Verdict, VerifyError};

/// Verifier delegating to a remote `POST {challengeId, flag} → {ok, points?}` endpoint.
#[derive(Clone)]
pub struct HttpVerifier {
    client: Client,
    url: Arc<str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VerifyRequest<'a> {
    challenge_id: &'a str,
    flag: &'a str,
}

#[derive(Deserialize)]
struct VerifyResponse {
    ok: bool,
    #[serde(default)]
    points: Option<u64>,
}

impl HttpVerifier {
    /// Build a verifier posting to `url`. `timeout` bounds every request.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, VerifyError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| VerifyError::Transport(err.to_string()))?;
        let url: String = url.into();
        Ok(Self {
            client,
            url: Arc::from(url),
        })
    }
}

impl FlagVerifier for HttpVerifier {
    fn verify(
        &self,
        challenge_id: &str,
        answer: &str,
    ) -> BoxFuture<'static, Result<Verdict, VerifyError>> {
        let verifier = self.clone();
        let challenge_id = challenge_id.to_string();
        let answer = answer.to_string();
        Box::pin(async move {
            let response = verifier
                .client
                .post(verifier.url.as_ref())
                .json(&VerifyRequest {
                    challenge_id: &challenge_id,
                    flag: &answer,
                })
                .send()
                .await
                .map_err(|err| VerifyError::Transport(err.to_string()))?;

            if !response.status().is_success() {
                return Err(VerifyError::Status(response.status().as_u16()));
            }

            let body = response
                .json::<VerifyResponse>()
                .await
                .map_err(|err| VerifyError::Decode(err.to_string()))?;
            Ok(Verdict {
                correct: body.ok,
                points: body.points,
            })
        })
    }
}
