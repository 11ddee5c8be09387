use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::resolver::{Protocol, Strategy};
use crate::runx::DEFAULT_GITHUB_API_URL;
use crate::search::DEFAULT_SEARCH_URL;
use crate::store::DEFAULT_CACHE_URL;
use crate::system::SystemSelector;

/// Top-level configuration from `.pkgresolve.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub runx: RunXConfig,
    #[serde(default)]
    pub http: HttpConfig,
    /// Platform treated as "this machine" when picking a representative
    /// system. Defaults to the build target.
    #[serde(default)]
    pub host_system: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_search_url")]
    pub url: String,
    #[serde(default)]
    pub protocol: Protocol,
    /// Verify per-platform store paths against the binary cache (legacy only).
    #[serde(default)]
    pub store_paths: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_url")]
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunXConfig {
    #[serde(default = "default_github_api_url")]
    pub api_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout. Unset means requests are bounded only by
    /// cancellation.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_search_url() -> String {
    DEFAULT_SEARCH_URL.to_string()
}

fn default_cache_url() -> String {
    DEFAULT_CACHE_URL.to_string()
}

fn default_github_api_url() -> String {
    DEFAULT_GITHUB_API_URL.to_string()
}

fn default_user_agent() -> String {
    format!("pkgresolve/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            url: default_search_url(),
            protocol: Protocol::default(),
            store_paths: false,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: default_cache_url(),
        }
    }
}

impl Default for RunXConfig {
    fn default() -> Self {
        Self {
            api_url: default_github_api_url(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            user_agent: default_user_agent(),
        }
    }
}

impl Config {
    /// Load config from a TOML file. Returns default if file doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn strategy(&self) -> Strategy {
        Strategy {
            protocol: self.search.protocol,
            store_paths: self.search.store_paths,
        }
    }

    pub fn selector(&self) -> SystemSelector {
        match &self.host_system {
            Some(host) => SystemSelector::new(host.clone()),
            None => SystemSelector::for_host(),
        }
    }

    /// Generate a starter config file.
    pub fn starter_toml() -> &'static str {
        r#"# pkgresolve configuration

# Treat this platform as the host when picking a representative system.
# host_system = "aarch64-darwin"

[search]
# Search service base URL.
url = "https://search.devbox.sh"

# Resolution protocol: "legacy" (/v1/resolve) or "enriched" (/v2/resolve).
protocol = "legacy"

# Legacy only: verify per-platform store paths against the binary cache.
store_paths = false

[cache]
url = "https://cache.nixos.org"

[runx]
api_url = "https://api.github.com"

[http]
# Per-request timeout in seconds. Unset means no timeout.
# timeout_secs = 30
"#
    }
}
