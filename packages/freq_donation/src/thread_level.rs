use std::process;

use tracing::{debug, error, warn};

use crate::{ConcurrencyLevel, StartupConfig};

/// Determines the concurrency level to request from the group runtime.
///
/// The configured thread level name is matched case-insensitively. If async progress is
/// requested, the result is always [`ConcurrencyLevel::Multiple`], whatever the configured name
/// says, because the progress agent runs on its own thread.
///
/// # Errors
///
/// Returns [`Error::UnrecognizedThreadLevel`][crate::Error::UnrecognizedThreadLevel] if the
/// configured name is not a concurrency level. This is checked even when async progress would
/// override the level.
///
/// # Example
///
/// ```
/// use freq_donation::{ConcurrencyLevel, StartupConfig, resolve_thread_level};
///
/// let config = StartupConfig::new()
///     .default_thread_level("funneled")
///     .async_progress(true);
///
/// assert_eq!(
///     resolve_thread_level(&config).unwrap(),
///     ConcurrencyLevel::Multiple
/// );
/// ```
pub fn resolve_thread_level(config: &StartupConfig) -> crate::Result<ConcurrencyLevel> {
    let configured: ConcurrencyLevel = config.thread_level_name().parse()?;

    let resolved = if config.is_async_progress_requested() {
        ConcurrencyLevel::Multiple
    } else {
        configured
    };

    debug!(%configured, %resolved, "resolved thread level");

    Ok(resolved)
}

/// Same as [`resolve_thread_level()`] but terminates the process with exit status 1 if the
/// configured thread level is not recognized.
///
/// Intended for hosts that have no way to report a structured error at the point where the
/// configuration is read, which is before any group runtime state exists.
#[must_use]
#[cfg_attr(test, mutants::skip)] // Cannot test process termination in-process.
#[expect(
    clippy::exit,
    reason = "no group runtime state exists yet to report the error through"
)]
pub fn resolve_thread_level_or_exit(config: &StartupConfig) -> ConcurrencyLevel {
    match resolve_thread_level(config) {
        Ok(level) => level,
        Err(e) => {
            error!(error = %e, "invalid startup configuration");
            eprintln!("{e}");
            process::exit(1)
        }
    }
}

/// What became of the async progress request once the group runtime reported the granted level.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[expect(
    clippy::exhaustive_enums,
    reason = "the request can only ever end in one of these three ways"
)]
pub enum AsyncProgress {
    /// Async progress was not requested.
    NotRequested,

    /// `Multiple` was granted, so the async progress agent is to be started.
    Enabled,

    /// `Multiple` was not granted, so async progress was dropped with a warning.
    Downgraded {
        /// The level the group runtime granted instead.
        granted: ConcurrencyLevel,
    },
}

/// Decides whether the async progress agent can run, given what the group runtime granted.
///
/// A missing `Multiple` grant is not fatal. The request is downgraded with a warning.
#[must_use]
pub fn negotiate_async_progress(requested: bool, granted: ConcurrencyLevel) -> AsyncProgress {
    if !requested {
        return AsyncProgress::NotRequested;
    }

    if granted == ConcurrencyLevel::Multiple {
        AsyncProgress::Enabled
    } else {
        warn!(
            %granted,
            "async progress requires thread level MULTIPLE, continuing without it"
        );

        AsyncProgress::Downgraded { granted }
    }
}
