//! Remote package search service: wire records and the collaborator trait.
//!
//! Two protocols exist. The legacy `/v1/resolve` endpoint returns one
//! record per platform carrying a nixpkgs commit, attribute paths and
//! (optionally) the store hash of the build. The enriched `/v2/resolve`
//! endpoint returns a flake installable per platform along with the
//! outputs' store paths, already checked against the binary cache.

#[cfg(feature = "http")]
pub mod http;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::store::StoreRef;

#[cfg(feature = "http")]
pub use http::HttpSearchClient;

/// Default search service endpoint.
pub const DEFAULT_SEARCH_URL: &str = "https://search.devbox.sh";

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("package not found")]
    NotFound,

    #[error("search service returned status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("malformed search response: {0}")]
    Decode(String),

    #[error("request cancelled")]
    Cancelled,
}

/// Remote resolution service keyed by exact name and version.
#[async_trait]
pub trait SearchService: Send + Sync {
    /// Legacy protocol.
    async fn resolve_single(&self, name: &str, version: &str)
        -> Result<PackageVersion, SearchError>;

    /// Enriched protocol.
    async fn resolve_versioned(
        &self,
        cancel: &CancellationToken,
        name: &str,
        version: &str,
    ) -> Result<ResolveResponse, SearchError>;
}

/// Legacy `/v1/resolve` response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageVersion {
    #[serde(default)]
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub systems: HashMap<String, PackageInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageInfo {
    #[serde(default)]
    pub attr_paths: Vec<String>,
    pub commit_hash: String,
    /// Unix seconds.
    #[serde(default)]
    pub last_updated: i64,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub store_hash: String,
    #[serde(default)]
    pub store_name: String,
    #[serde(default)]
    pub store_version: String,
}

impl PackageInfo {
    pub fn store_ref(&self) -> StoreRef {
        StoreRef {
            hash: self.store_hash.clone(),
            name: self.store_name.clone(),
        }
    }
}

/// Enriched `/v2/resolve` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveResponse {
    #[serde(default)]
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub systems: HashMap<String, SystemOutputs>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemOutputs {
    pub flake_installable: FlakeInstallable,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub outputs: Vec<Output>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Output {
    #[serde(default)]
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub default: bool,
}

/// A flake reference plus the attribute path inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlakeInstallable {
    #[serde(rename = "ref")]
    pub flake_ref: FlakeRef,
    #[serde(default)]
    pub attr_path: String,
}

impl std::fmt::Display for FlakeInstallable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.attr_path.is_empty() {
            write!(f, "{}", self.flake_ref)
        } else {
            write!(f, "{}#{}", self.flake_ref, self.attr_path)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlakeRef {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub owner: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub repo: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub rev: String,
    #[serde(rename = "ref", default, skip_serializing_if = "String::is_empty")]
    pub git_ref: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dir: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
}

impl FlakeRef {
    /// nixpkgs pinned to a commit, as the legacy protocol locates packages.
    pub fn nixpkgs(rev: impl Into<String>) -> Self {
        Self {
            kind: "github".into(),
            owner: "NixOS".into(),
            repo: "nixpkgs".into(),
            rev: rev.into(),
            ..Self::default()
        }
    }

    fn rev_or_ref(&self) -> &str {
        if self.rev.is_empty() {
            &self.git_ref
        } else {
            &self.rev
        }
    }
}

impl std::fmt::Display for FlakeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind.as_str() {
            "github" | "gitlab" | "sourcehut" => {
                write!(f, "{}:{}/{}", self.kind, self.owner, self.repo)?;
                let pin = self.rev_or_ref();
                if !pin.is_empty() {
                    write!(f, "/{pin}")?;
                }
            }
            "indirect" => {
                write!(f, "flake:{}", self.id)?;
                for part in [&self.git_ref, &self.rev] {
                    if !part.is_empty() {
                        write!(f, "/{part}")?;
                    }
                }
            }
            "path" => write!(f, "path:{}", self.path)?,
            _ if self.url.starts_with(&format!("{}+", self.kind)) => write!(f, "{}", self.url)?,
            _ => write!(f, "{}+{}", self.kind, self.url)?,
        }
        if !self.dir.is_empty() {
            write!(f, "?dir={}", self.dir)?;
        }
        Ok(())
    }
}
