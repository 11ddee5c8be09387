//! Parsing of `name@version` package references.

use crate::runx::RUNX_PREFIX;

/// A package reference as typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    pub name: String,
    pub version: Option<String>,
    raw: String,
}

impl PackageSpec {
    /// Split on the last `@`. Some package names contain `@` themselves, so
    /// only the final one delimits the version. A leading `@` belongs to the
    /// name and an empty version counts as no version.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let (name, version) = match raw.rfind('@') {
            Some(idx) if idx > 0 => {
                let version = &raw[idx + 1..];
                let version = (!version.is_empty()).then(|| version.to_string());
                (raw[..idx].to_string(), version)
            }
            _ => (raw.to_string(), None),
        };
        Self {
            name,
            version,
            raw: raw.to_string(),
        }
    }

    /// True for references served by the runx resolver instead of search.
    pub fn is_runx(&self) -> bool {
        self.raw.starts_with(RUNX_PREFIX)
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}
