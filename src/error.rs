use thiserror::Error;

use crate::runx::RunXError;
use crate::search::SearchError;

pub type Result<T, E = ResolveError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("No version specified for {name:?}.")]
    MissingVersion { name: String },

    #[error("Invalid package spec: {0}")]
    InvalidSpec(String),

    #[error("{name}@{version}: package not found")]
    PackageNotFound { name: String, version: String },

    #[error("no systems found")]
    NoSystemsAvailable,

    #[error("no attr paths found for package {name:?}")]
    NoAttrPaths { name: String },

    #[error("Search service error: {0}")]
    Search(#[from] SearchError),

    #[error("runx resolution error: {0}")]
    RunX(#[from] RunXError),

    #[error("resolution was cancelled")]
    Cancelled,

    #[error("store path fan-out failed: {0}")]
    Fanout(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[cfg(feature = "http")]
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ResolveError {
    /// Input and not-found errors are the user's to fix; everything else is ours.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::MissingVersion { .. }
            | Self::InvalidSpec(_)
            | Self::PackageNotFound { .. }
            | Self::Config(_) => 1,
            _ => 2,
        }
    }
}
