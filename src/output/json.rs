use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::Result;
use crate::package::ResolvedPackage;
use crate::Resolution;

/// Same shape as the `packages` table of a lock file.
#[derive(Serialize)]
struct JsonReport<'a> {
    packages: BTreeMap<&'a str, &'a ResolvedPackage>,
}

/// Render resolutions as a JSON document keyed by the requested spec.
pub fn render(resolutions: &[Resolution]) -> Result<String> {
    let packages = resolutions
        .iter()
        .map(|r| (r.spec.as_str(), &r.package))
        .collect();
    let json = serde_json::to_string_pretty(&JsonReport { packages })?;
    Ok(json)
}
