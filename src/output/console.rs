use crate::Resolution;

/// Render resolutions as a human-readable listing.
pub fn render(resolutions: &[Resolution]) -> String {
    let mut output = String::new();

    if resolutions.is_empty() {
        output.push_str("\n  Nothing resolved.\n\n");
        return output;
    }

    output.push('\n');
    for Resolution { spec, package } in resolutions {
        output.push_str(&format!("  {}\n", spec));
        output.push_str(&format!("    version:       {}\n", package.version));
        output.push_str(&format!("    resolved:      {}\n", package.resolved));
        if let Some(last_modified) = &package.last_modified {
            output.push_str(&format!("    last modified: {}\n", last_modified));
        }
        if let Some(source) = package.source {
            output.push_str(&format!("    source:        {}\n", source));
        }
        if package.systems.is_empty() {
            output.push_str("    systems:       (none verified)\n");
        } else {
            output.push_str("    systems:\n");
            let width = package.systems.keys().map(String::len).max().unwrap_or(0);
            for (system, info) in &package.systems {
                output.push_str(&format!(
                    "      {:<width$}  {}\n",
                    system,
                    info.store_path,
                    width = width
                ));
            }
        }
        output.push('\n');
    }

    output
}
