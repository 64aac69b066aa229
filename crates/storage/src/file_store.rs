// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-process store kept in a JSON document
//!
//! Every transaction takes an exclusive advisory lock on a sidecar
//! `.lock` file, loads the document, applies one keyspace transition and
//! writes the result back through a temp file and rename. Any number of
//! processes may open the same path; the lock serializes them.

use async_trait::async_trait;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use wl_core::{
    Keyspace, LeaseStore, PoolKeys, PoolSnapshot, ReleaseOutcome, ResourceId, StoreError, SyncPlan,
};

/// Current on-disk format version
const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    version: u32,
    keyspace: Keyspace,
}

/// Lease store persisted to a locked JSON file
#[derive(Clone, Debug)]
pub struct FileStore {
    path: PathBuf,
    lock_path: PathBuf,
    poll_interval: Duration,
}

impl FileStore {
    /// Open (or lazily create) the store at `path`
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut lock_name = path.as_os_str().to_owned();
        lock_name.push(".lock");

        Ok(Self {
            path,
            lock_path: PathBuf::from(lock_name),
            poll_interval: Duration::from_millis(50),
        })
    }

    /// How often a blocked `move_to_busy` re-checks the available queue
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole keyspace under a shared lock
    pub fn load(&self) -> Result<Keyspace, StoreError> {
        let lock = self.open_lock()?;
        FileExt::lock_shared(&lock)?;
        read_document(&self.path).map(|doc| doc.keyspace)
    }

    fn open_lock(&self) -> io::Result<File> {
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&self.lock_path)
    }

    /// Apply `f` to the keyspace as one exclusive transaction
    fn transact_blocking<T>(&self, f: impl FnOnce(&mut Keyspace) -> T) -> Result<T, StoreError> {
        // Released when `lock` is dropped
        let lock = self.open_lock()?;
        lock.lock_exclusive()?;

        let mut doc = read_document(&self.path)?;
        let before = doc.keyspace.clone();
        let out = f(&mut doc.keyspace);
        if doc.keyspace != before {
            doc.version = FORMAT_VERSION;
            write_document(&self.path, &doc)?;
            tracing::trace!(path = %self.path.display(), "store document written");
        }
        Ok(out)
    }

    async fn transact<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Keyspace) -> T + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.transact_blocking(f))
            .await
            .map_err(|e| StoreError::Unavailable(format!("store task failed: {}", e)))?
    }

    async fn read<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Keyspace) -> T + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.load().map(|keyspace| f(&keyspace)))
            .await
            .map_err(|e| StoreError::Unavailable(format!("store task failed: {}", e)))?
    }
}

fn read_document(path: &Path) -> Result<StoreDocument, StoreError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(StoreDocument::default()),
        Err(e) => return Err(e.into()),
    };
    if contents.trim().is_empty() {
        return Ok(StoreDocument::default());
    }
    let doc: StoreDocument = serde_json::from_str(&contents)?;
    if doc.version > FORMAT_VERSION {
        return Err(StoreError::Unavailable(format!(
            "store format version {} is newer than supported {}",
            doc.version, FORMAT_VERSION
        )));
    }
    Ok(doc)
}

fn write_document(path: &Path, doc: &StoreDocument) -> Result<(), StoreError> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let mut file = File::create(&tmp_path)?;
    serde_json::to_writer(&mut file, doc)?;
    file.flush()?;
    file.sync_all()?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

#[async_trait]
impl LeaseStore for FileStore {
    async fn seed(&self, keys: &PoolKeys, ids: &[ResourceId]) -> Result<bool, StoreError> {
        let (keys, ids) = (keys.clone(), ids.to_vec());
        self.transact(move |ks| ks.seed(&keys, &ids)).await
    }

    async fn move_to_busy(
        &self,
        keys: &PoolKeys,
        wait: Duration,
        expires_at: &(dyn Fn() -> u64 + Send + Sync),
    ) -> Result<Option<ResourceId>, StoreError> {
        let deadline = tokio::time::Instant::now().checked_add(wait);
        loop {
            let attempt_keys = keys.clone();
            let expires_at_ms = expires_at();
            if let Some(id) = self
                .transact(move |ks| ks.move_to_busy(&attempt_keys, expires_at_ms))
                .await?
            {
                return Ok(Some(id));
            }

            let pause = match deadline {
                Some(deadline) => {
                    let now = tokio::time::Instant::now();
                    if now >= deadline {
                        tracing::debug!(key = %keys.available, ?wait, "no resource freed before deadline");
                        return Ok(None);
                    }
                    self.poll_interval.min(deadline - now)
                }
                None => self.poll_interval,
            };
            tokio::time::sleep(pause).await;
        }
    }

    async fn release(
        &self,
        keys: &PoolKeys,
        id: &ResourceId,
    ) -> Result<ReleaseOutcome, StoreError> {
        let (keys, id) = (keys.clone(), id.clone());
        self.transact(move |ks| ks.release(&keys, &id)).await
    }

    async fn reclaim(
        &self,
        keys: &PoolKeys,
        id: &ResourceId,
        now_ms: u64,
    ) -> Result<ReleaseOutcome, StoreError> {
        let (keys, id) = (keys.clone(), id.clone());
        self.transact(move |ks| ks.reclaim(&keys, &id, now_ms)).await
    }

    async fn add(&self, keys: &PoolKeys, ids: &[ResourceId]) -> Result<(), StoreError> {
        let (keys, ids) = (keys.clone(), ids.to_vec());
        self.transact(move |ks| ks.add(&keys, &ids)).await
    }

    async fn remove(&self, keys: &PoolKeys, ids: &[ResourceId]) -> Result<(), StoreError> {
        let (keys, ids) = (keys.clone(), ids.to_vec());
        self.transact(move |ks| ks.remove(&keys, &ids)).await
    }

    async fn apply_sync(&self, keys: &PoolKeys, plan: &SyncPlan) -> Result<(), StoreError> {
        let (keys, plan) = (keys.clone(), plan.clone());
        self.transact(move |ks| ks.apply_sync(&keys, &plan)).await
    }

    async fn registry(&self, keys: &PoolKeys) -> Result<Vec<ResourceId>, StoreError> {
        let keys = keys.clone();
        self.read(move |ks| ks.registry(&keys)).await
    }

    async fn registry_len(&self, keys: &PoolKeys) -> Result<usize, StoreError> {
        let keys = keys.clone();
        self.read(move |ks| ks.registry_len(&keys)).await
    }

    async fn snapshot(&self, keys: &PoolKeys) -> Result<PoolSnapshot, StoreError> {
        let keys = keys.clone();
        self.read(move |ks| ks.snapshot(&keys)).await
    }

    async fn expired(&self, keys: &PoolKeys, now_ms: u64) -> Result<Vec<ResourceId>, StoreError> {
        let keys = keys.clone();
        self.read(move |ks| ks.expired(&keys, now_ms)).await
    }

    async fn delete(&self, keys: &PoolKeys) -> Result<(), StoreError> {
        let keys = keys.clone();
        self.transact(move |ks| ks.delete(&keys)).await
    }
}

#[cfg(test)]
#[path = "file_store_tests.rs"]
mod tests;
