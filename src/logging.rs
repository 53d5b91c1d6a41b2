//! Logging initialisation
//!
//! Built on `tracing` and `tracing-subscriber`. Log lines go to stderr so
//! command output on stdout stays pipeable.
//!
//! # Environment
//! - `RUST_LOG`: full filter directive, takes precedence
//!   (e.g. `RUST_LOG=ilt::core=debug`)
//! - `ILT_LOG`: same syntax, used when `RUST_LOG` is unset
//! - `ILT_LOG_FORMAT=json`: one JSON object per line

use tracing_subscriber::{fmt, EnvFilter};

/// Level used when no filter variable is set
pub fn default_level(verbose: bool, quiet: bool) -> &'static str {
    match (verbose, quiet) {
        (true, _) => "debug",
        (false, true) => "error",
        (false, false) => "warn",
    }
}

/// Pick the filter directive from the environment, falling back to the CLI flags
fn filter_directive(env: impl Fn(&str) -> Option<String>, verbose: bool, quiet: bool) -> String {
    env("RUST_LOG")
        .or_else(|| env("ILT_LOG"))
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| default_level(verbose, quiet).to_string())
}

/// Initialise the global subscriber for the CLI
///
/// ```no_run
/// ilt::logging::init(false, false);
/// ```
pub fn init(verbose: bool, quiet: bool) {
    let directive = filter_directive(|k| std::env::var(k).ok(), verbose, quiet);
    let filter = EnvFilter::try_new(&directive)
        .unwrap_or_else(|_| EnvFilter::new(default_level(verbose, quiet)));

    let json = std::env::var("ILT_LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    // A second init (e.g. from a test harness) keeps the first subscriber
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.without_time().try_init()
    };
}

/// Initialise logging for tests
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_level() {
        assert_eq!(default_level(false, false), "warn");
        assert_eq!(default_level(true, false), "debug");
        assert_eq!(default_level(false, true), "error");
        assert_eq!(default_level(true, true), "debug");
    }

    #[test]
    fn test_filter_precedence() {
        let env: HashMap<&str, &str> =
            HashMap::from([("RUST_LOG", "trace"), ("ILT_LOG", "info")]);
        let lookup = |k: &str| env.get(k).map(|v| v.to_string());
        assert_eq!(filter_directive(lookup, false, false), "trace");

        let env: HashMap<&str, &str> = HashMap::from([("ILT_LOG", "ilt=info")]);
        let lookup = |k: &str| env.get(k).map(|v| v.to_string());
        assert_eq!(filter_directive(lookup, true, false), "ilt=info");

        assert_eq!(filter_directive(|_| None, true, false), "debug");
        assert_eq!(filter_directive(|_| Some(" ".into()), false, false), "warn");
    }

    #[test]
    fn test_init_test_is_idempotent() {
        init_test();
        init_test();
        tracing::debug!("logging initialised twice");
    }
}
