use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tokio::sync::Mutex;

use crate::dao::{models::SessionRecord, session_store::SessionStore, storage::StorageResult};

use super::{
    config::CouchConfig,
    error::{CouchError, CouchResult},
    models::{SessionDocument, WriteReply},
};

const READ: &str = "session read";
const WRITE: &str = "session write";

/// Session store keeping the whole session in one CouchDB document.
///
/// Each save replaces the document in a single request, so a reader never sees keys from two
/// different snapshots. The last known revision is cached; a conflict refreshes it and the
/// write is retried once.
#[derive(Clone)]
pub struct CouchSessionStore {
    client: Client,
    database_url: Arc<str>,
    document_url: Arc<str>,
    document_id: Arc<str>,
    credentials: Option<Arc<(String, String)>>,
    revision: Arc<Mutex<Option<String>>>,
}

impl CouchSessionStore {
    /// Build the client and create the database if it does not exist yet.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder().build().map_err(CouchError::Client)?;
        let database_url = format!("{}/{}", config.server.trim_end_matches('/'), config.database);
        let document_url = format!("{database_url}/{}", config.document);

        let store = Self {
            client,
            database_url: database_url.into(),
            document_url: document_url.into(),
            document_id: config.document.into(),
            credentials: config.credentials.map(Arc::new),
            revision: Arc::new(Mutex::new(None)),
        };
        store.create_database().await?;
        Ok(store)
    }

    async fn send(&self, action: &'static str, builder: RequestBuilder) -> CouchResult<Response> {
        let builder = match self.credentials.as_deref() {
            Some((user, password)) => builder.basic_auth(user, Some(password)),
            None => builder,
        };
        builder
            .send()
            .await
            .map_err(|source| CouchError::Transport { action, source })
    }

    async fn create_database(&self) -> CouchResult<()> {
        const ACTION: &str = "database creation";
        let response = self
            .send(ACTION, self.client.put(self.database_url.as_ref()))
            .await?;
        match response.status() {
            // 412: the database already exists.
            status if status.is_success() || status == StatusCode::PRECONDITION_FAILED => Ok(()),
            status => Err(CouchError::Status {
                action: ACTION,
                status,
            }),
        }
    }

    async fn fetch(&self) -> CouchResult<Option<SessionDocument>> {
        let response = self
            .send(READ, self.client.get(self.document_url.as_ref()))
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .json()
                .await
                .map(Some)
                .map_err(|source| CouchError::Decode {
                    action: READ,
                    source,
                }),
            status => Err(CouchError::Status {
                action: READ,
                status,
            }),
        }
    }

    /// Write `document` and return its new revision.
    async fn put(&self, document: &SessionDocument) -> CouchResult<String> {
        let response = self
            .send(WRITE, self.client.put(self.document_url.as_ref()).json(document))
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CouchError::Status {
                action: WRITE,
                status,
            });
        }
        response
            .json::<WriteReply>()
            .await
            .map(|reply| reply.rev)
            .map_err(|source| CouchError::Decode {
                action: WRITE,
                source,
            })
    }
}

impl SessionStore for CouchSessionStore {
    fn backend(&self) -> &'static str {
        "couchdb"
    }

    fn load(&self) -> BoxFuture<'static, StorageResult<SessionRecord>> {
        let store = self.clone();
        Box::pin(async move {
            let document = store.fetch().await?;
            *store.revision.lock().await = document.as_ref().and_then(|doc| doc.rev.clone());
            Ok(document
                .map(SessionDocument::into_record)
                .unwrap_or_default())
        })
    }

    fn save(&self, record: SessionRecord) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            // Held for the whole write so concurrent saves never race on the revision.
            let mut revision = store.revision.lock().await;
            let mut document = SessionDocument {
                id: store.document_id.to_string(),
                rev: revision.clone(),
                fields: record,
            };

            let rev = match store.put(&document).await {
                Err(CouchError::Status {
                    status: StatusCode::CONFLICT,
                    ..
                }) => {
                    document.rev = store.fetch().await?.and_then(|current| current.rev);
                    store.put(&document).await?
                }
                written => written?,
            };
            *revision = Some(rev);
            Ok(())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            const ACTION: &str = "health check";
            let response = store
                .send(ACTION, store.client.get(store.database_url.as_ref()))
                .await?;
            let status = response.status();
            if status.is_success() {
                Ok(())
            } else {
                Err(CouchError::Status {
                    action: ACTION,
                    status,
                }
                .into())
            }
        })
    }
}
