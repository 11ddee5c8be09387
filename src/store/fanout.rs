//! Concurrent per-platform store path resolution.
//!
//! One task per platform, all queried against the same binary cache. A
//! lookup that fails only drops its own platform: the caller can still
//! install that platform through the slow path, and the platforms that did
//! resolve are kept. The call itself fails only when the group of tasks
//! breaks down (caller cancellation, a task that panicked).

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{StoreRef, StoreResolver, DEFAULT_CACHE_URL};
use crate::error::{ResolveError, Result};

#[derive(Clone)]
pub struct StorePathFanout {
    resolver: Arc<dyn StoreResolver>,
    cache_url: String,
}

impl StorePathFanout {
    pub fn new(resolver: Arc<dyn StoreResolver>) -> Self {
        Self::with_cache(resolver, DEFAULT_CACHE_URL)
    }

    pub fn with_cache(resolver: Arc<dyn StoreResolver>, cache_url: impl Into<String>) -> Self {
        Self {
            resolver,
            cache_url: cache_url.into(),
        }
    }

    /// Resolve every complete [`StoreRef`] to a store path, keyed by platform.
    ///
    /// Returns once every lookup has finished, with whichever subset
    /// succeeded.
    pub async fn resolve(
        &self,
        cancel: &CancellationToken,
        systems: HashMap<String, StoreRef>,
    ) -> Result<BTreeMap<String, String>> {
        let store_paths: Arc<Mutex<BTreeMap<String, String>>> =
            Arc::new(Mutex::new(BTreeMap::new()));
        let mut tasks = JoinSet::new();

        for (system, store_ref) in systems.into_iter().filter(|(_, r)| r.is_complete()) {
            let resolver = Arc::clone(&self.resolver);
            let store_paths = Arc::clone(&store_paths);
            let cache_url = self.cache_url.clone();
            let cancel = cancel.clone();

            tasks.spawn(async move {
                match resolver.resolve_ref(&cancel, &store_ref, &cache_url).await {
                    Ok(path) => {
                        store_paths.lock().await.insert(system, path);
                    }
                    Err(err) => {
                        debug!(
                            system = %system,
                            store_hash = %store_ref.hash,
                            error = %err,
                            "failed to resolve store path, skipping"
                        );
                    }
                }
            });
        }

        let launched = tasks.len();
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tasks.abort_all();
                    return Err(ResolveError::Cancelled);
                }
                next = tasks.join_next() => match next {
                    None => break,
                    Some(Ok(())) => {}
                    Some(Err(err)) => {
                        tasks.abort_all();
                        return Err(ResolveError::Fanout(err.to_string()));
                    }
                },
            }
        }

        let resolved = std::mem::take(&mut *store_paths.lock().await);
        info!(
            launched,
            resolved = resolved.len(),
            "store path fan-out finished"
        );
        Ok(resolved)
    }
}

impl std::fmt::Debug for StorePathFanout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorePathFanout")
            .field("cache_url", &self.cache_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;
    use crate::testing::MockStore;
    use pretty_assertions::assert_eq;

    fn refs(entries: &[(&str, &str, &str)]) -> HashMap<String, StoreRef> {
        entries
            .iter()
            .map(|(system, hash, name)| {
                (
                    system.to_string(),
                    StoreRef {
                        hash: hash.to_string(),
                        name: name.to_string(),
                    },
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn drops_incomplete_refs_without_lookup() {
        let store = Arc::new(MockStore::new().with_path("h1", "/nix/store/h1-a"));
        let fanout = StorePathFanout::new(store.clone());
        let result = fanout
            .resolve(
                &CancellationToken::new(),
                refs(&[
                    ("x86_64-linux", "h1", "a"),
                    ("aarch64-linux", "", "a"),
                    ("x86_64-darwin", "h3", ""),
                ]),
            )
            .await
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test]
    async fn one_failure_omits_only_that_platform() {
        let store = Arc::new(
            MockStore::new()
                .with_path("h1", "/nix/store/h1-a")
                .with_path("h2", "/nix/store/h2-a"),
        );
        let fanout = StorePathFanout::new(store.clone());
        let result = fanout
            .resolve(
                &CancellationToken::new(),
                refs(&[
                    ("x86_64-linux", "h1", "a"),
                    ("aarch64-linux", "h2", "a"),
                    ("aarch64-darwin", "missing", "a"),
                ]),
            )
            .await
            .unwrap();

        let expected: BTreeMap<String, String> = [
            ("aarch64-linux".to_string(), "/nix/store/h2-a".to_string()),
            ("x86_64-linux".to_string(), "/nix/store/h1-a".to_string()),
        ]
        .into();
        assert_eq!(result, expected);
        assert_eq!(store.calls(), 3);
    }

    #[tokio::test]
    async fn all_failures_return_empty() {
        let store = Arc::new(MockStore::new());
        let fanout = StorePathFanout::new(store);
        let result = fanout
            .resolve(
                &CancellationToken::new(),
                refs(&[("x86_64-linux", "h1", "a"), ("aarch64-linux", "h2", "a")]),
            )
            .await
            .unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn empty_input_returns_empty() {
        let fanout = StorePathFanout::new(Arc::new(MockStore::new()));
        let result = fanout
            .resolve(&CancellationToken::new(), HashMap::new())
            .await
            .unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn passes_cache_location() {
        let store = Arc::new(MockStore::new().with_path("h1", "/nix/store/h1-a"));
        let fanout = StorePathFanout::with_cache(store.clone(), "https://cache.example.org");
        fanout
            .resolve(&CancellationToken::new(), refs(&[("x86_64-linux", "h1", "a")]))
            .await
            .unwrap();
        assert_eq!(
            store.cache_urls(),
            vec!["https://cache.example.org".to_string()]
        );
    }

    #[tokio::test]
    async fn cancellation_is_fatal() {
        let store = Arc::new(MockStore::new().hanging("slow"));
        let fanout = StorePathFanout::new(store);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = fanout
            .resolve(&cancel, refs(&[("x86_64-linux", "slow", "a")]))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Cancelled));
    }

    #[tokio::test]
    async fn panicking_lookup_is_fatal() {
        let store = Arc::new(MockStore::new().panicking("boom"));
        let fanout = StorePathFanout::new(store);
        let err = fanout
            .resolve(&CancellationToken::new(), refs(&[("x86_64-linux", "boom", "a")]))
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Fanout(_)));
    }

    #[test]
    fn miss_error_names_hash() {
        let err = StoreError::Miss { hash: "h1".into() };
        assert_eq!(err.to_string(), "h1 is not in the binary cache");
    }
}
