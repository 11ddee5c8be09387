use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{ResolveError, Result};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "pkgresolve=warn";

/// Initialize logging to stderr.
///
/// `RUST_LOG` takes precedence. Otherwise `verbose` raises the crate's level
/// to debug, which surfaces per-platform cache misses.
pub fn init(verbose: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .try_init()
        .map_err(|e| ResolveError::Config(format!("failed to initialize logging: {e}")))
}

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "pkgresolve=debug"
    } else {
        DEFAULT_FILTER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_raises_level() {
        assert_eq!(default_directive(false), "pkgresolve=warn");
        assert_eq!(default_directive(true), "pkgresolve=debug");
    }
}
