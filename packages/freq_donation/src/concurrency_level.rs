use std::str::FromStr;

use derive_more::Display;

use crate::Error;

/// Prefix that the group runtime uses for its own names of the concurrency levels.
///
/// Configured names may carry it or omit it, so `MPI_THREAD_FUNNELED` and `funneled` are equal.
/// No other variation besides letter case is accepted, not even surrounding whitespace.
const RUNTIME_NAME_PREFIX: &str = "MPI_THREAD_";

/// How much concurrency a process requests from (and is granted by) the group runtime.
///
/// Levels are ordered from least to most permissive, so a granted level can be compared against
/// a requested one with the usual comparison operators.
///
/// # Example
///
/// ```
/// use freq_donation::ConcurrencyLevel;
///
/// let level: ConcurrencyLevel = "serialized".parse().unwrap();
///
/// assert_eq!(level, ConcurrencyLevel::Serialized);
/// assert!(level < ConcurrencyLevel::Multiple);
/// ```
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[expect(
    clippy::exhaustive_enums,
    reason = "mirroring the fixed set of levels defined by the group runtime"
)]
pub enum ConcurrencyLevel {
    /// Only one thread exists in the process.
    #[display("SINGLE")]
    Single,

    /// Many threads may exist but only the main thread calls into the group runtime.
    #[display("FUNNELED")]
    Funneled,

    /// Any thread may call into the group runtime but never two at the same time.
    #[display("SERIALIZED")]
    Serialized,

    /// Any thread may call into the group runtime at any time.
    #[display("MULTIPLE")]
    Multiple,
}

impl ConcurrencyLevel {
    /// All levels, from least to most permissive.
    pub const ALL: [Self; 4] = [
        Self::Single,
        Self::Funneled,
        Self::Serialized,
        Self::Multiple,
    ];
}

impl FromStr for ConcurrencyLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s
            .get(..RUNTIME_NAME_PREFIX.len())
            .filter(|prefix| prefix.eq_ignore_ascii_case(RUNTIME_NAME_PREFIX))
            .and_then(|_| s.get(RUNTIME_NAME_PREFIX.len()..))
            .unwrap_or(s);

        Self::ALL
            .into_iter()
            .find(|level| level.to_string().eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::UnrecognizedThreadLevel {
                value: s.to_string(),
            })
    }
}
