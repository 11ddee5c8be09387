pub mod spec;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use spec::PackageSpec;

/// Provenance tag recorded with every search-backed resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackageSource {
    RemoteSearch,
}

impl std::fmt::Display for PackageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RemoteSearch => write!(f, "remote-search"),
        }
    }
}

/// A pinned package, in the shape the lock file writer persists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPackage {
    /// Resolved version. Never empty on a returned record.
    pub version: String,
    /// Installable locator (flake reference or runx reference).
    pub resolved: String,
    /// RFC 3339 UTC timestamp of the upstream revision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<PackageSource>,
    /// Verified store paths keyed by platform id.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub systems: BTreeMap<String, SystemInfo>,
}

/// Per-platform result. Only built from a verified store path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub store_path: String,
}

impl SystemInfo {
    pub fn new(store_path: impl Into<String>) -> Self {
        Self {
            store_path: store_path.into(),
        }
    }
}

impl ResolvedPackage {
    /// Store path for `system`, if one was verified.
    pub fn store_path(&self, system: &str) -> Option<&str> {
        self.systems.get(system).map(|s| s.store_path.as_str())
    }
}
