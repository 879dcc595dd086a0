//! Structured logging to stderr via `tracing-subscriber`.

use tracing_subscriber::EnvFilter;

/// How much the process logs when `RUST_LOG` is not set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Warnings; the progress bar carries the rest.
    Normal,
    /// Info lines, used when there is no terminal to draw a bar on.
    Headless,
    /// Everything including per-stage debug lines.
    Verbose,
}

impl Verbosity {
    pub fn from_flags(verbose: bool, quiet: bool, interactive: bool) -> Self {
        if verbose {
            Verbosity::Verbose
        } else if quiet {
            Verbosity::Quiet
        } else if interactive {
            Verbosity::Normal
        } else {
            Verbosity::Headless
        }
    }

    fn directive(self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Headless => "info",
            Verbosity::Verbose => "debug",
        }
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `verbosity`.
/// Calling it twice is harmless.
pub fn init(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mlanalyzer={}", verbosity.directive())));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_to_verbosity() {
        assert_eq!(Verbosity::from_flags(true, false, true), Verbosity::Verbose);
        assert_eq!(Verbosity::from_flags(false, true, true), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(false, false, true), Verbosity::Normal);
        assert_eq!(Verbosity::from_flags(false, false, false), Verbosity::Headless);
    }

    #[test]
    fn init_twice_does_not_panic() {
        init(Verbosity::Quiet);
        init(Verbosity::Verbose);
    }
}
