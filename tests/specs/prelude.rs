//! Shared helpers for coordinator specs

#![allow(dead_code)]

pub use std::time::{Duration, Instant};
pub use wl_adapters::MemoryStore;
pub use wl_core::{LeaseStore, ReleaseOutcome, ResourceId, Settings};
pub use wl_engine::{Coordinator, CoordinatorError, DestroyOptions, PoolInfo};
pub use wl_storage::FileStore;

/// Run each async check once per store backend.
///
/// Each check takes a [`Backend`] and builds its coordinators from it.
macro_rules! on_every_backend {
    ($($check:ident),* $(,)?) => {
        $(
            mod $check {
                #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
                async fn memory() {
                    super::$check(crate::prelude::Backend::memory()).await;
                }

                #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
                async fn file() {
                    super::$check(crate::prelude::Backend::file()).await;
                }
            }
        )*
    };
}

/// A store shared by every coordinator built from it, like one server
/// shared by many processes
pub enum Backend {
    Memory(MemoryStore),
    File {
        store: FileStore,
        _dir: tempfile::TempDir,
    },
}

impl Backend {
    pub fn memory() -> Self {
        Backend::Memory(MemoryStore::new())
    }

    pub fn file() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("store.json"))
            .unwrap()
            .with_poll_interval(Duration::from_millis(10));
        Backend::File { store, _dir: dir }
    }

    /// A coordinator that has not been started
    pub fn coordinator(&self, name: &str, resources: &[&str], settings: Settings) -> Pool {
        let resources = resources.iter().copied();
        match self {
            Backend::Memory(store) => Pool::Memory(
                Coordinator::new(name, resources, settings, store.clone()).unwrap(),
            ),
            Backend::File { store, .. } => Pool::File(
                Coordinator::new(name, resources, settings, store.clone()).unwrap(),
            ),
        }
    }

    /// A started coordinator with one-second timeouts and an idle reaper
    pub async fn pool(&self, name: &str, resources: &[&str]) -> Pool {
        self.started(name, resources, settings()).await
    }

    pub async fn started(&self, name: &str, resources: &[&str], settings: Settings) -> Pool {
        let pool = self.coordinator(name, resources, settings);
        pool.start().await.unwrap();
        pool
    }
}

/// One-second lease and wait, reaper effectively off
pub fn settings() -> Settings {
    Settings::default()
        .with_max_timeout_to_release(Duration::from_secs(1))
        .with_max_timeout_to_wait(Duration::from_secs(1))
        .with_interval_to_check_release(Duration::from_secs(60))
}

pub fn ids(list: &[&str]) -> Vec<ResourceId> {
    list.iter().copied().map(ResourceId::from).collect()
}

/// Coordinator over either backend
#[derive(Clone)]
pub enum Pool {
    Memory(Coordinator<MemoryStore>),
    File(Coordinator<FileStore>),
}

macro_rules! dispatch {
    ($self:ident, $c:ident => $body:expr) => {
        match $self {
            Pool::Memory($c) => $body,
            Pool::File($c) => $body,
        }
    };
}

impl Pool {
    pub async fn start(&self) -> Result<(), CoordinatorError> {
        dispatch!(self, c => c.start().await.map(|_| ()))
    }

    pub async fn stop(&self) -> Result<(), CoordinatorError> {
        dispatch!(self, c => c.stop().await)
    }

    pub async fn destroy(&self, options: DestroyOptions) -> Result<(), CoordinatorError> {
        dispatch!(self, c => c.destroy(options).await)
    }

    pub async fn acquire(&self) -> Result<ResourceId, CoordinatorError> {
        dispatch!(self, c => c.acquire().await)
    }

    pub async fn release(&self, id: &str) -> Result<ReleaseOutcome, CoordinatorError> {
        dispatch!(self, c => c.release(id).await)
    }

    pub async fn add(&self, list: &[&str]) -> Result<(), CoordinatorError> {
        dispatch!(self, c => c.add(list.iter().copied()).await)
    }

    pub async fn remove(&self, list: &[&str]) -> Result<(), CoordinatorError> {
        dispatch!(self, c => c.remove(list.iter().copied()).await)
    }

    pub async fn sync(&self, list: &[&str]) -> Result<(), CoordinatorError> {
        dispatch!(self, c => c.sync(list.iter().copied()).await.map(|_| ()))
    }

    pub async fn info(&self) -> Result<PoolInfo, CoordinatorError> {
        dispatch!(self, c => c.info().await)
    }

    pub async fn release_expired(&self) -> Result<Vec<ResourceId>, CoordinatorError> {
        dispatch!(self, c => c.release_expired().await)
    }

    pub fn is_stopped(&self) -> bool {
        dispatch!(self, c => c.is_stopped())
    }
}

pub fn is_already_stopped<T: std::fmt::Debug>(result: Result<T, CoordinatorError>) -> bool {
    matches!(result, Err(CoordinatorError::AlreadyStopped))
}
