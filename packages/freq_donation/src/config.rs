use std::env;

use crate::{Error, RendezvousStrategy};

/// Environment variable naming the default thread level (`SINGLE`, `FUNNELED`, `SERIALIZED` or
/// `MULTIPLE`, case-insensitive).
pub const DEFAULT_THREAD_LEVEL_VAR: &str = "FREQ_DONATION_DEFAULT_THREAD_LEVEL";

/// Environment variable enabling the async progress agent (a boolean).
pub const ASYNC_PROGRESS_VAR: &str = "FREQ_DONATION_ASYNC_PROGRESS";

/// Environment variable selecting the rendezvous strategy (`sequential` or `all-gather`).
pub const RENDEZVOUS_VAR: &str = "FREQ_DONATION_RENDEZVOUS";

const DEFAULT_THREAD_LEVEL: &str = "SINGLE";

/// Settings read once at process startup.
///
/// # Example
///
/// ```
/// use freq_donation::{RendezvousStrategy, StartupConfig};
///
/// let config = StartupConfig::new()
///     .default_thread_level("funneled")
///     .async_progress(true)
///     .rendezvous_strategy(RendezvousStrategy::AllGather);
///
/// assert!(config.is_async_progress_requested());
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StartupConfig {
    default_thread_level: String,
    async_progress: bool,
    rendezvous_strategy: RendezvousStrategy,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl StartupConfig {
    /// Creates a configuration with the default settings: thread level `SINGLE`, no async
    /// progress and the sequential broadcast rendezvous.
    #[must_use]
    pub fn new() -> Self {
        Self {
            default_thread_level: DEFAULT_THREAD_LEVEL.to_string(),
            async_progress: false,
            rendezvous_strategy: RendezvousStrategy::SequentialBroadcast,
        }
    }

    /// Reads the configuration from the process environment.
    ///
    /// Variables that are not set keep their default value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSetting`] if a boolean or strategy variable has a value that
    /// cannot be interpreted. The thread level is not validated here.
    pub fn from_env() -> crate::Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads the configuration through an arbitrary lookup function, which receives the name of
    /// an environment variable and returns its value if it is set.
    ///
    /// # Errors
    ///
    /// Same as [`from_env()`][Self::from_env].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> crate::Result<Self> {
        let mut config = Self::new();

        if let Some(level) = lookup(DEFAULT_THREAD_LEVEL_VAR) {
            config.default_thread_level = level;
        }

        if let Some(value) = lookup(ASYNC_PROGRESS_VAR) {
            config.async_progress = parse_bool(ASYNC_PROGRESS_VAR, &value)?;
        }

        if let Some(value) = lookup(RENDEZVOUS_VAR) {
            config.rendezvous_strategy = parse_strategy(&value)?;
        }

        Ok(config)
    }

    /// Sets the name of the default thread level.
    #[must_use]
    pub fn default_thread_level(mut self, level: impl Into<String>) -> Self {
        self.default_thread_level = level.into();
        self
    }

    /// Sets whether the async progress agent is requested.
    #[must_use]
    pub fn async_progress(mut self, requested: bool) -> Self {
        self.async_progress = requested;
        self
    }

    /// Sets how ranks exchange their processor affinity.
    #[must_use]
    pub fn rendezvous_strategy(mut self, strategy: RendezvousStrategy) -> Self {
        self.rendezvous_strategy = strategy;
        self
    }

    /// The configured name of the default thread level, not yet validated.
    #[must_use]
    pub fn thread_level_name(&self) -> &str {
        &self.default_thread_level
    }

    /// Whether the async progress agent is requested.
    #[must_use]
    pub fn is_async_progress_requested(&self) -> bool {
        self.async_progress
    }

    /// How ranks exchange their processor affinity.
    #[must_use]
    pub fn strategy(&self) -> RendezvousStrategy {
        self.rendezvous_strategy
    }
}

fn parse_bool(name: &'static str, value: &str) -> crate::Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::InvalidSetting {
            name,
            value: value.to_string(),
            problem: "expected a boolean (1/0, true/false, yes/no, on/off)".to_string(),
        }),
    }
}

fn parse_strategy(value: &str) -> crate::Result<RendezvousStrategy> {
    match value.trim().to_ascii_lowercase().as_str() {
        "sequential" => Ok(RendezvousStrategy::SequentialBroadcast),
        "all-gather" | "allgather" => Ok(RendezvousStrategy::AllGather),
        _ => Err(Error::InvalidSetting {
            name: RENDEZVOUS_VAR,
            value: value.to_string(),
            problem: "expected 'sequential' or 'all-gather'".to_string(),
        }),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();

        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = StartupConfig::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config, StartupConfig::new());
        assert_eq!(config.thread_level_name(), "SINGLE");
        assert!(!config.is_async_progress_requested());
        assert_eq!(config.strategy(), RendezvousStrategy::SequentialBroadcast);
    }

    #[test]
    fn reads_every_setting() {
        let config = StartupConfig::from_lookup(lookup_from(&[
            (DEFAULT_THREAD_LEVEL_VAR, "serialized"),
            (ASYNC_PROGRESS_VAR, "Yes"),
            (RENDEZVOUS_VAR, "all-gather"),
        ]))
        .unwrap();

        assert_eq!(config.thread_level_name(), "serialized");
        assert!(config.is_async_progress_requested());
        assert_eq!(config.strategy(), RendezvousStrategy::AllGather);
    }

    #[test]
    fn thread_level_is_not_validated_when_read() {
        let config =
            StartupConfig::from_lookup(lookup_from(&[(DEFAULT_THREAD_LEVEL_VAR, "bogus")]))
                .unwrap();

        assert_eq!(config.thread_level_name(), "bogus");
    }

    #[test]
    fn rejects_malformed_boolean() {
        let error = StartupConfig::from_lookup(lookup_from(&[(ASYNC_PROGRESS_VAR, "maybe")]))
            .unwrap_err();

        assert!(matches!(
            error,
            Error::InvalidSetting {
                name: ASYNC_PROGRESS_VAR,
                ..
            }
        ));
    }

    #[test]
    fn rejects_unknown_strategy() {
        let error =
            StartupConfig::from_lookup(lookup_from(&[(RENDEZVOUS_VAR, "gossip")])).unwrap_err();

        assert!(matches!(
            error,
            Error::InvalidSetting {
                name: RENDEZVOUS_VAR,
                ..
            }
        ));
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = StartupConfig::new()
            .default_thread_level("MPI_THREAD_MULTIPLE")
            .async_progress(true)
            .rendezvous_strategy(RendezvousStrategy::AllGather);

        assert_eq!(config.thread_level_name(), "MPI_THREAD_MULTIPLE");
        assert!(config.is_async_progress_requested());
        assert_eq!(config.strategy(), RendezvousStrategy::AllGather);
    }
}
