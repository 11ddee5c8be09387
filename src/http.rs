//! Shared HTTP plumbing for the network-backed collaborators.

use std::time::Duration;

use url::Url;

use crate::config::HttpConfig;
use crate::error::{ResolveError, Result};

/// Build the client shared by the search, cache and release lookups.
///
/// No timeout is applied unless one is configured.
pub fn client(config: &HttpConfig) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
    if let Some(secs) = config.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    Ok(builder.build()?)
}

/// Parse a base URL so that relative joins append to its path.
pub fn base_url(raw: &str) -> Result<Url> {
    let mut url =
        Url::parse(raw).map_err(|e| ResolveError::Config(format!("invalid URL {raw:?}: {e}")))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
