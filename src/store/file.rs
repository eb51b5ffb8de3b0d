// JSON snapshot store guarded by an OS file lock, so separate processes
// (e.g. several CLI invocations) share one compare-and-swap domain.

use async_trait::async_trait;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

use super::tables::{Snapshot, Tables};
use super::traits::{ConditionalWrite, StoreError, WorkflowStore};
use crate::model::{Project, ProjectFilter, ProjectId, Quote, QuoteFilter, QuoteId};

#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock_path: PathBuf,
    writer: Mutex<()>,
}

#[derive(Clone, Copy)]
enum LockMode {
    Shared,
    Exclusive,
}

impl FileStore {
    /// Opens (creating if needed) the snapshot at `path`
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut lock_name = path.as_os_str().to_owned();
        lock_name.push(".lock");

        let store = Self {
            path,
            lock_path: PathBuf::from(lock_name),
            writer: Mutex::new(()),
        };
        // Validates an existing snapshot up front
        store.read(|_| ()).await?;
        debug!(path = %store.path.display(), "Opened file store");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn locked<T, F>(&self, mode: LockMode, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Path) -> Result<T, StoreError> + Send + 'static,
    {
        let path = self.path.clone();
        let lock_path = self.lock_path.clone();

        tokio::task::spawn_blocking(move || {
            let lock_file = OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .truncate(false)
                .open(&lock_path)?;
            let mut lock = fd_lock::RwLock::new(lock_file);
            match mode {
                LockMode::Shared => {
                    let _guard = lock.read()?;
                    op(&path)
                }
                LockMode::Exclusive => {
                    let _guard = lock.write()?;
                    op(&path)
                }
            }
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }

    async fn read<T, F>(&self, view: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Tables) -> T + Send + 'static,
    {
        self.locked(LockMode::Shared, move |path| Ok(view(&load(path)?)))
            .await
    }
}

fn load(path: &Path) -> Result<Tables, StoreError> {
    match fs::read(path) {
        Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Tables::default()),
        Ok(bytes) => {
            let snapshot: Snapshot =
                serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
                    reason: format!("{}: {e}", path.display()),
                })?;
            Ok(Tables::from_snapshot(snapshot))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Tables::default()),
        Err(e) => Err(e.into()),
    }
}

fn persist(path: &Path, tables: &Tables) -> Result<(), StoreError> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let bytes = serde_json::to_vec_pretty(&tables.to_snapshot())?;
    let mut tmp = fs::File::create(&tmp_path)?;
    tmp.write_all(&bytes)?;
    tmp.sync_all()?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[async_trait]
impl WorkflowStore for FileStore {
    async fn get_quote(&self, id: QuoteId) -> Result<Option<Quote>, StoreError> {
        self.read(move |tables| tables.get_quote(id)).await
    }

    async fn list_quotes(&self, filter: &QuoteFilter) -> Result<Vec<Quote>, StoreError> {
        let filter = filter.clone();
        self.read(move |tables| tables.list_quotes(&filter)).await
    }

    async fn get_project(&self, id: ProjectId) -> Result<Option<Project>, StoreError> {
        self.read(move |tables| tables.get_project(id)).await
    }

    async fn list_projects(&self, filter: &ProjectFilter) -> Result<Vec<Project>, StoreError> {
        let filter = filter.clone();
        self.read(move |tables| tables.list_projects(&filter)).await
    }

    async fn apply(&self, writes: Vec<ConditionalWrite>) -> Result<(), StoreError> {
        let _writer = self.writer.lock().await;
        self.locked(LockMode::Exclusive, move |path| {
            let mut tables = load(path)?;
            tables.apply(writes)?;
            persist(path, &tables)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActorId, QuoteDraft};
    use chrono::Utc;

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("workflow.json");

        let quote = Quote::new(ActorId::new("c1"), QuoteDraft::default(), Utc::now());
        {
            let store = FileStore::open(&path).await.unwrap();
            store.apply(vec![ConditionalWrite::insert_quote(quote.clone())]).await.unwrap();
        }

        let reopened = FileStore::open(&path).await.unwrap();
        assert_eq!(reopened.get_quote(quote.id).await.unwrap(), Some(quote));
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workflow.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let err = FileStore::open(&path).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }
}
