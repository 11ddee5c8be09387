//! Picking one representative platform out of a per-platform record.

use std::collections::HashMap;

use crate::error::{ResolveError, Result};

/// Fallback platform when the host's own platform is not offered.
pub const DEFAULT_SYSTEM: &str = "x86_64-linux";

/// The platform id of the machine this binary was built for, in
/// `<arch>-<os>` form (`x86_64-linux`, `aarch64-darwin`, ...).
pub fn host_system() -> String {
    let arch = match std::env::consts::ARCH {
        "x86" => "i686",
        "arm" => "armv7l",
        other => other,
    };
    let os = match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    };
    format!("{arch}-{os}")
}

/// Selects a value from a platform-keyed map.
///
/// Order: the host platform, then [`DEFAULT_SYSTEM`], then whichever entry
/// the map yields first. The last tier has no defined tie-break.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemSelector {
    host: String,
}

impl SystemSelector {
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }

    /// Selector for the running machine.
    pub fn for_host() -> Self {
        Self::new(host_system())
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn select<'a, V>(&self, systems: &'a HashMap<String, V>) -> Result<&'a V> {
        self.select_entry(systems).map(|(_, v)| v)
    }

    /// Like [`select`](Self::select) but also returns the chosen platform id.
    pub fn select_entry<'a, V>(
        &self,
        systems: &'a HashMap<String, V>,
    ) -> Result<(&'a str, &'a V)> {
        if let Some((k, v)) = systems.get_key_value(self.host.as_str()) {
            return Ok((k.as_str(), v));
        }
        if let Some((k, v)) = systems.get_key_value(DEFAULT_SYSTEM) {
            return Ok((k.as_str(), v));
        }
        systems
            .iter()
            .next()
            .map(|(k, v)| (k.as_str(), v))
            .ok_or(ResolveError::NoSystemsAvailable)
    }
}

impl Default for SystemSelector {
    fn default() -> Self {
        Self::for_host()
    }
}
