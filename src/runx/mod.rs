//! runx packages: binaries published as GitHub releases, referenced as
//! `runx:owner/repo@version` and pinned to a concrete release tag.

#[cfg(feature = "http")]
pub mod github;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[cfg(feature = "http")]
pub use github::GithubRunXResolver;

pub const RUNX_PREFIX: &str = "runx:";

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

#[derive(Error, Debug)]
pub enum RunXError {
    #[error("invalid runx reference {0:?}, expected runx:owner/repo@version")]
    InvalidReference(String),

    #[error("no release {version} found for {owner}/{repo}")]
    ReleaseNotFound {
        owner: String,
        repo: String,
        version: String,
    },

    #[error("release API returned status {0}")]
    Status(u16),

    #[error("request failed: {0}")]
    Transport(String),

    #[error("request cancelled")]
    Cancelled,
}

/// A runx package pinned to a release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunXRef {
    pub owner: String,
    pub repo: String,
    pub version: String,
}

impl RunXRef {
    /// Parse `runx:owner/repo@version`. The version may be `latest`.
    pub fn parse(reference: &str) -> Result<Self, RunXError> {
        let invalid = || RunXError::InvalidReference(reference.to_string());
        let rest = reference.strip_prefix(RUNX_PREFIX).ok_or_else(invalid)?;
        let (path, version) = rest.rsplit_once('@').ok_or_else(invalid)?;
        let (owner, repo) = path.split_once('/').ok_or_else(invalid)?;
        if owner.is_empty() || repo.is_empty() || repo.contains('/') || version.is_empty() {
            return Err(invalid());
        }
        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            version: version.to_string(),
        })
    }

    pub fn is_latest(&self) -> bool {
        self.version == "latest"
    }

    pub fn with_version(&self, version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..self.clone()
        }
    }
}

impl std::fmt::Display for RunXRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{RUNX_PREFIX}{}/{}@{}", self.owner, self.repo, self.version)
    }
}

/// Pins a runx reference to a concrete release.
#[async_trait]
pub trait RunXResolver: Send + Sync {
    async fn resolve(&self, cancel: &CancellationToken, reference: &str)
        -> Result<RunXRef, RunXError>;
}
