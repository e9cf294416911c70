use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use futures::future::BoxFuture;
use serde_json::Value;
use tokio::fs;
use uuid::Uuid;

use crate::dao::{
    models::SessionRecord,
    session_store::SessionStore,
    storage::{StorageError, StorageResult},
};

/// Session kept as a single JSON object on disk.
///
/// Each write goes to its own sibling temporary file which is then renamed over the target, so
/// a crash mid-write leaves the previous snapshot intact and overlapping saves never share a
/// half-written file.
#[derive(Clone)]
pub struct FileSessionStore {
    path: Arc<Path>,
}

impl FileSessionStore {
    /// Store backed by `path`; the file is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path: PathBuf = path.into();
        Self {
            path: Arc::from(path),
        }
    }

    /// Location of the session file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "session.json".into());
        name.push(format!(".{}.tmp", Uuid::new_v4().simple()));
        self.path.with_file_name(name)
    }

    fn parent(&self) -> Option<&Path> {
        self.path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
    }
}

impl SessionStore for FileSessionStore {
    fn backend(&self) -> &'static str {
        "file"
    }

    fn load(&self) -> BoxFuture<'static, StorageResult<SessionRecord>> {
        let store = self.clone();
        Box::pin(async move {
            let path = store.path.display().to_string();
            let bytes = match fs::read(&store.path).await {
                Ok(bytes) => bytes,
                Err(err) if err.kind() == ErrorKind::NotFound => return Ok(SessionRecord::new()),
                Err(err) => return Err(StorageError::unavailable(format!("reading {path}"), err)),
            };
            if bytes.iter().all(u8::is_ascii_whitespace) {
                return Ok(SessionRecord::new());
            }

            match serde_json::from_slice::<Value>(&bytes) {
                Ok(Value::Object(record)) => Ok(record),
                Ok(_) => Err(StorageError::corrupt(
                    format!("{path} does not hold a JSON object"),
                    std::io::Error::new(ErrorKind::InvalidData, "expected a JSON object"),
                )),
                Err(err) => Err(StorageError::corrupt(format!("parsing {path}"), err)),
            }
        })
    }

    fn save(&self, record: SessionRecord) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let path = store.path.display().to_string();
            let payload = serde_json::to_vec_pretty(&Value::Object(record))
                .map_err(|err| StorageError::corrupt(format!("encoding {path}"), err))?;

            if let Some(parent) = store.parent() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|err| StorageError::unavailable(format!("creating dir for {path}"), err))?;
            }

            let temp = store.temp_path();
            fs::write(&temp, payload)
                .await
                .map_err(|err| StorageError::unavailable(format!("writing {}", temp.display()), err))?;
            fs::rename(&temp, &store.path)
                .await
                .map_err(|err| StorageError::unavailable(format!("replacing {path}"), err))
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let Some(parent) = store.parent() else {
                return Ok(());
            };
            match fs::metadata(parent).await {
                Ok(meta) if meta.permissions().readonly() => Err(StorageError::unavailable(
                    format!("{} is read-only", parent.display()),
                    std::io::Error::from(ErrorKind::PermissionDenied),
                )),
                Ok(_) => Ok(()),
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
                Err(err) => Err(StorageError::unavailable(
                    format!("probing {}", parent.display()),
                    err,
                )),
            }
        })
    }
}
