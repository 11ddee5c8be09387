//! Binary cache lookups: turning a store hash into a verified store path.

pub mod fanout;
#[cfg(feature = "http")]
pub mod http;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub use fanout::StorePathFanout;
#[cfg(feature = "http")]
pub use http::HttpStoreResolver;

/// The public NixOS binary cache.
pub const DEFAULT_CACHE_URL: &str = "https://cache.nixos.org";

pub const STORE_DIR: &str = "/nix/store";

/// `/nix/store/<32 char nix-base32 hash>-<name>`
static STORE_PATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^/nix/store/([0-9a-df-np-sv-z]{32})-([A-Za-z0-9+\-._?=]+)$")
        .unwrap()
});

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{hash} is not in the binary cache")]
    Miss { hash: String },

    #[error("binary cache returned status {status} for {hash}")]
    Status { status: u16, hash: String },

    #[error("narinfo for {hash} has no StorePath")]
    MalformedNarinfo { hash: String },

    #[error("{path:?} is not a valid store path for hash {hash}")]
    InvalidPath { path: String, hash: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("lookup cancelled")]
    Cancelled,
}

/// Hash and name of a build output as reported by the search service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreRef {
    pub hash: String,
    pub name: String,
}

impl StoreRef {
    /// Upstream data is sometimes missing one half; such refs are not looked up.
    pub fn is_complete(&self) -> bool {
        !self.hash.is_empty() && !self.name.is_empty()
    }
}

/// Resolves a store hash against a binary cache. Returned paths must
/// already be verified.
#[async_trait]
pub trait StoreResolver: Send + Sync {
    async fn resolve(
        &self,
        cancel: &CancellationToken,
        store_hash: &str,
        cache_url: &str,
    ) -> Result<String, StoreError>;

    /// Resolve a full ref. Implementations that can see the cached path
    /// should also check its name half; the default checks only the hash.
    async fn resolve_ref(
        &self,
        cancel: &CancellationToken,
        store_ref: &StoreRef,
        cache_url: &str,
    ) -> Result<String, StoreError> {
        self.resolve(cancel, &store_ref.hash, cache_url).await
    }
}

/// Check that `path` is a well-formed store path whose hash part is `hash`
/// and, when given, whose name part is `name`.
pub fn verify_store_path(path: &str, hash: &str, name: Option<&str>) -> Result<(), StoreError> {
    let verified = STORE_PATH_RE.captures(path).is_some_and(|c| {
        c.get(1).is_some_and(|m| m.as_str() == hash)
            && name.map_or(true, |name| c.get(2).is_some_and(|m| m.as_str() == name))
    });
    if verified {
        Ok(())
    } else {
        Err(StoreError::InvalidPath {
            path: path.to_string(),
            hash: hash.to_string(),
        })
    }
}
