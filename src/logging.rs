//! Tracing subscriber setup.
//!
//! Logs go to stderr so `focusia ask --json` output on stdout stays
//! machine-readable. `RUST_LOG` takes precedence over `[logging].level`.

use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Filter used when `RUST_LOG` is unset. `level` applies to this crate and
/// its core; dependencies stay at `warn`.
pub fn default_filter(level: &str) -> String {
    format!("warn,focusia={level},focusia_core={level}")
}

pub fn init_logging(level: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter(level)))?;

    let console_layer = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_ansi(atty::is(atty::Stream::Stderr));

    Registry::default()
        .with(env_filter)
        .with(console_layer)
        .try_init()?;

    tracing::debug!(level, "logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_parses() {
        let filter = default_filter("debug");
        assert_eq!(filter, "warn,focusia=debug,focusia_core=debug");
        assert!(EnvFilter::try_new(filter).is_ok());
    }
}
