//! In-memory collaborators for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::runx::{RunXError, RunXRef, RunXResolver};
use crate::search::{PackageVersion, ResolveResponse, SearchError, SearchService};
use crate::store::{StoreError, StoreResolver};

type Key = (String, String);

fn key(name: &str, version: &str) -> Key {
    (name.to_string(), version.to_string())
}

/// Search service answering from fixed tables; unknown packages are not found.
#[derive(Debug, Default)]
pub struct MockSearch {
    single: HashMap<Key, PackageVersion>,
    versioned: HashMap<Key, ResolveResponse>,
    fail_versioned: bool,
    hang_single: bool,
    calls: AtomicUsize,
}

impl MockSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_single(mut self, name: &str, version: &str, record: PackageVersion) -> Self {
        self.single.insert(key(name, version), record);
        self
    }

    pub fn with_versioned(mut self, name: &str, version: &str, record: ResolveResponse) -> Self {
        self.versioned.insert(key(name, version), record);
        self
    }

    /// Every enriched lookup fails with a server error.
    pub fn failing_versioned(mut self) -> Self {
        self.fail_versioned = true;
        self
    }

    /// Legacy lookups never complete.
    pub fn hanging_single(mut self) -> Self {
        self.hang_single = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchService for MockSearch {
    async fn resolve_single(
        &self,
        name: &str,
        version: &str,
    ) -> Result<PackageVersion, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hang_single {
            std::future::pending::<()>().await;
        }
        self.single
            .get(&key(name, version))
            .cloned()
            .ok_or(SearchError::NotFound)
    }

    async fn resolve_versioned(
        &self,
        _cancel: &CancellationToken,
        name: &str,
        version: &str,
    ) -> Result<ResolveResponse, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_versioned {
            return Err(SearchError::Status {
                status: 500,
                url: "mock://v2/resolve".into(),
            });
        }
        self.versioned
            .get(&key(name, version))
            .cloned()
            .ok_or(SearchError::NotFound)
    }
}

/// Binary cache keyed by store hash; unknown hashes miss.
#[derive(Debug, Default)]
pub struct MockStore {
    paths: HashMap<String, String>,
    hanging: HashSet<String>,
    panicking: HashSet<String>,
    calls: AtomicUsize,
    cache_urls: Mutex<Vec<String>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path(mut self, hash: &str, path: &str) -> Self {
        self.paths.insert(hash.to_string(), path.to_string());
        self
    }

    /// Lookups of `hash` never complete.
    pub fn hanging(mut self, hash: &str) -> Self {
        self.hanging.insert(hash.to_string());
        self
    }

    /// Lookups of `hash` panic.
    pub fn panicking(mut self, hash: &str) -> Self {
        self.panicking.insert(hash.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn cache_urls(&self) -> Vec<String> {
        self.cache_urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl StoreResolver for MockStore {
    async fn resolve(
        &self,
        _cancel: &CancellationToken,
        store_hash: &str,
        cache_url: &str,
    ) -> Result<String, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.cache_urls.lock().unwrap().push(cache_url.to_string());
        if self.panicking.contains(store_hash) {
            panic!("mock store lookup panicked for {store_hash}");
        }
        if self.hanging.contains(store_hash) {
            std::future::pending::<()>().await;
        }
        self.paths
            .get(store_hash)
            .cloned()
            .ok_or_else(|| StoreError::Miss {
                hash: store_hash.to_string(),
            })
    }
}

/// Pins `latest` to `v1.0.0` and keeps explicit versions as given. A
/// cancelled token fails the lookup.
#[derive(Debug, Default)]
pub struct MockRunX {
    calls: AtomicUsize,
}

impl MockRunX {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RunXResolver for MockRunX {
    async fn resolve(
        &self,
        cancel: &CancellationToken,
        reference: &str,
    ) -> Result<RunXRef, RunXError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if cancel.is_cancelled() {
            return Err(RunXError::Cancelled);
        }
        let pkg = RunXRef::parse(reference)?;
        Ok(if pkg.is_latest() {
            pkg.with_version("v1.0.0")
        } else {
            pkg
        })
    }
}
