//! Turns a `name@version` spec into a [`ResolvedPackage`].

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::error::{ResolveError, Result};
use crate::package::{PackageSource, PackageSpec, ResolvedPackage, SystemInfo};
use crate::runx::{RunXError, RunXResolver};
use crate::search::{FlakeInstallable, FlakeRef, SearchError, SearchService};
use crate::store::StorePathFanout;
use crate::system::SystemSelector;

/// Which search service protocol to speak.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// `/v1/resolve`: commit + attribute paths, store paths need a fan-out.
    #[default]
    Legacy,
    /// `/v2/resolve`: flake installables with verified outputs inline.
    Enriched,
}

impl Protocol {
    pub fn from_str_lenient(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "legacy" | "v1" => Some(Self::Legacy),
            "enriched" | "v2" => Some(Self::Enriched),
            _ => None,
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Legacy => write!(f, "legacy"),
            Self::Enriched => write!(f, "enriched"),
        }
    }
}

/// How a single resolution should run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Strategy {
    pub protocol: Protocol,
    /// Legacy only: look up store paths in the binary cache for every
    /// platform that reports a store hash.
    pub store_paths: bool,
}

impl Strategy {
    pub fn legacy() -> Self {
        Self::default()
    }

    pub fn enriched() -> Self {
        Self {
            protocol: Protocol::Enriched,
            store_paths: false,
        }
    }

    pub fn with_store_paths(mut self, enabled: bool) -> Self {
        self.store_paths = enabled;
        self
    }
}

pub struct PackageResolver {
    search: Arc<dyn SearchService>,
    runx: Arc<dyn RunXResolver>,
    fanout: StorePathFanout,
    selector: SystemSelector,
}

impl PackageResolver {
    pub fn new(
        search: Arc<dyn SearchService>,
        runx: Arc<dyn RunXResolver>,
        fanout: StorePathFanout,
    ) -> Self {
        Self {
            search,
            runx,
            fanout,
            selector: SystemSelector::for_host(),
        }
    }

    pub fn with_selector(mut self, selector: SystemSelector) -> Self {
        self.selector = selector;
        self
    }

    /// Resolve `spec` without an external cancellation signal.
    pub async fn resolve(&self, spec: &str, strategy: &Strategy) -> Result<ResolvedPackage> {
        self.resolve_with(&CancellationToken::new(), spec, strategy)
            .await
    }

    /// Resolve `spec`. Cancelling `cancel` aborts any in-flight lookups.
    #[instrument(skip(self, cancel), fields(protocol = %strategy.protocol))]
    pub async fn resolve_with(
        &self,
        cancel: &CancellationToken,
        spec: &str,
        strategy: &Strategy,
    ) -> Result<ResolvedPackage> {
        let spec = PackageSpec::parse(spec);
        let Some(version) = spec.version.clone() else {
            return Err(ResolveError::MissingVersion { name: spec.name });
        };

        let pkg = if spec.is_runx() {
            self.resolve_runx(cancel, &spec).await?
        } else {
            match strategy.protocol {
                Protocol::Legacy => {
                    self.resolve_legacy(cancel, &spec.name, &version, strategy.store_paths)
                        .await?
                }
                Protocol::Enriched => self.resolve_enriched(cancel, &spec.name, &version).await?,
            }
        };

        info!(
            resolved = %pkg.resolved,
            version = %pkg.version,
            systems = pkg.systems.len(),
            "resolved package"
        );
        Ok(pkg)
    }

    async fn resolve_runx(
        &self,
        cancel: &CancellationToken,
        spec: &PackageSpec,
    ) -> Result<ResolvedPackage> {
        let pinned = self
            .runx
            .resolve(cancel, spec.raw())
            .await
            .map_err(|err| match err {
                RunXError::InvalidReference(reference) => ResolveError::InvalidSpec(reference),
                RunXError::Cancelled => ResolveError::Cancelled,
                other => other.into(),
            })?;
        Ok(ResolvedPackage {
            resolved: pinned.to_string(),
            version: pinned.version,
            last_modified: None,
            source: None,
            systems: BTreeMap::new(),
        })
    }

    async fn resolve_legacy(
        &self,
        cancel: &CancellationToken,
        name: &str,
        version: &str,
        store_paths: bool,
    ) -> Result<ResolvedPackage> {
        let lookup = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ResolveError::Cancelled),
            result = self.search.resolve_single(name, version) => result,
        };
        let record = lookup.map_err(|err| {
            debug!(error = %err, "legacy resolve failed");
            not_found(name, version)
        })?;

        let (system, info) = self.selector.select_entry(&record.systems)?;
        debug!(system, "selected representative system");
        let attr_path = info
            .attr_paths
            .first()
            .ok_or_else(|| ResolveError::NoAttrPaths {
                name: name.to_string(),
            })?;

        let systems: BTreeMap<String, SystemInfo> = if store_paths {
            let refs = record
                .systems
                .iter()
                .map(|(system, info)| (system.clone(), info.store_ref()))
                .collect();
            self.fanout
                .resolve(cancel, refs)
                .await?
                .into_iter()
                .map(|(system, path)| (system, SystemInfo::new(path)))
                .collect()
        } else {
            BTreeMap::new()
        };

        let installable = FlakeInstallable {
            flake_ref: FlakeRef::nixpkgs(info.commit_hash.clone()),
            attr_path: attr_path.clone(),
        };

        Ok(ResolvedPackage {
            version: first_non_empty(&[info.version.as_str(), record.version.as_str(), version]),
            resolved: installable.to_string(),
            last_modified: unix_to_rfc3339(info.last_updated),
            source: Some(PackageSource::RemoteSearch),
            systems,
        })
    }

    async fn resolve_enriched(
        &self,
        cancel: &CancellationToken,
        name: &str,
        version: &str,
    ) -> Result<ResolvedPackage> {
        let resolved = match self.search.resolve_versioned(cancel, name, version).await {
            Ok(resolved) => resolved,
            Err(SearchError::NotFound) => return Err(not_found(name, version)),
            Err(SearchError::Cancelled) => return Err(ResolveError::Cancelled),
            Err(err) => return Err(err.into()),
        };

        let representative = self.selector.select(&resolved.systems)?;

        let systems: BTreeMap<String, SystemInfo> = resolved
            .systems
            .iter()
            .filter_map(|(system, info)| {
                info.outputs
                    .first()
                    .map(|out| (system.clone(), SystemInfo::new(out.path.clone())))
            })
            .collect();

        Ok(ResolvedPackage {
            version: first_non_empty(&[resolved.version.as_str(), version]),
            resolved: representative.flake_installable.to_string(),
            last_modified: Some(to_rfc3339(representative.last_updated)),
            source: Some(PackageSource::RemoteSearch),
            systems,
        })
    }
}

impl std::fmt::Debug for PackageResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageResolver")
            .field("fanout", &self.fanout)
            .field("selector", &self.selector)
            .finish_non_exhaustive()
    }
}

fn not_found(name: &str, version: &str) -> ResolveError {
    ResolveError::PackageNotFound {
        name: name.to_string(),
        version: version.to_string(),
    }
}

fn first_non_empty(candidates: &[&str]) -> String {
    candidates
        .iter()
        .find(|v| !v.is_empty())
        .map(|v| v.to_string())
        .unwrap_or_default()
}

fn to_rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Zero or negative means the service had no timestamp.
fn unix_to_rfc3339(secs: i64) -> Option<String> {
    if secs <= 0 {
        return None;
    }
    DateTime::<Utc>::from_timestamp(secs, 0).map(to_rfc3339)
}
