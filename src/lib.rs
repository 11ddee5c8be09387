//! pkgresolve: pin `name@version` package specs to installable references.
//!
//! A spec is resolved against a remote search service into a flake
//! installable for a representative platform, and optionally into verified
//! per-platform store paths looked up concurrently in a binary cache.
//! `runx:owner/repo@version` specs are pinned to GitHub releases instead.
//!
//! # Quick Start
//!
//! ```no_run
//! use pkgresolve::config::Config;
//! use pkgresolve::resolver::Strategy;
//!
//! # async fn run() -> pkgresolve::error::Result<()> {
//! let config = Config::default();
//! let resolver = pkgresolve::resolver_from_config(&config)?;
//! let strategy = Strategy::legacy().with_store_paths(true);
//! let pkg = resolver.resolve("python@3.11.4", &strategy).await?;
//! println!("{} -> {}", pkg.version, pkg.resolved);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
#[cfg(feature = "http")]
pub mod http;
pub mod logging;
pub mod output;
pub mod package;
pub mod resolver;
pub mod runx;
pub mod search;
pub mod store;
pub mod system;

#[cfg(test)]
pub(crate) mod testing;

use futures_util::future;
use tokio_util::sync::CancellationToken;

use error::Result;
use package::ResolvedPackage;
use resolver::{PackageResolver, Strategy};

/// A requested spec and what it resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub spec: String,
    pub package: ResolvedPackage,
}

/// Build a resolver backed by the HTTP collaborators named in `config`.
#[cfg(feature = "http")]
pub fn resolver_from_config(config: &config::Config) -> Result<PackageResolver> {
    use std::sync::Arc;

    let client = http::client(&config.http)?;
    let search = search::HttpSearchClient::new(client.clone(), &config.search.url)?;
    let runx = runx::GithubRunXResolver::new(client.clone(), &config.runx.api_url)?;
    let fanout = store::StorePathFanout::with_cache(
        Arc::new(store::HttpStoreResolver::new(client)),
        config.cache.url.clone(),
    );
    Ok(
        PackageResolver::new(Arc::new(search), Arc::new(runx), fanout)
            .with_selector(config.selector()),
    )
}

/// Resolve several specs concurrently. Results come back in input order,
/// each spec succeeding or failing on its own.
pub async fn resolve_all(
    resolver: &PackageResolver,
    cancel: &CancellationToken,
    specs: &[String],
    strategy: &Strategy,
) -> Vec<(String, Result<ResolvedPackage>)> {
    let lookups = specs.iter().map(|spec| async move {
        let result = resolver.resolve_with(cancel, spec, strategy).await;
        (spec.clone(), result)
    });
    future::join_all(lookups).await
}
