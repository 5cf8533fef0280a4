use std::io;

use thiserror::Error;

use crate::{GroupError, RankId};

/// Errors that abort startup coordination.
///
/// Conditions that only degrade the local rank's result (unreadable frequency files, a quota that
/// cannot be computed, async progress not being available) are not errors. They are logged and
/// reflected in the [`StartupContext`][crate::StartupContext] instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The configured default thread level does not name any [`ConcurrencyLevel`][1].
    ///
    /// [1]: crate::ConcurrencyLevel
    #[error("unrecognized thread level '{value}'")]
    UnrecognizedThreadLevel {
        /// The configured value, verbatim.
        value: String,
    },

    /// A configuration setting had a value that could not be interpreted.
    #[error("invalid value '{value}' for setting {name}: {problem}")]
    InvalidSetting {
        /// Name of the setting.
        name: &'static str,

        /// The configured value, verbatim.
        value: String,

        /// A human-readable description of the problem.
        problem: String,
    },

    /// The operating system could not tell which processor the current thread is executing on.
    #[error("unable to determine the processor the current thread is executing on")]
    AffinityUnavailable {
        /// The error reported by the operating system.
        #[source]
        source: io::Error,
    },

    /// The group runtime failed to initialize.
    #[error("process group initialization failed")]
    GroupInitialization {
        /// The error reported by the group runtime.
        #[source]
        source: GroupError,
    },

    /// The group runtime granted `MULTIPLE` but failed to start the async progress agent.
    #[error("failed to start the async progress agent")]
    AsyncProgressStart {
        /// The error reported by the group runtime.
        #[source]
        source: GroupError,
    },

    /// A collective operation failed while exchanging processor affinity between ranks.
    ///
    /// No rank may use a partially populated affinity table, so this is always fatal.
    #[error("processor affinity rendezvous failed in round {round}")]
    Rendezvous {
        /// The rendezvous round (equal to the rank whose value was being exchanged) in which
        /// the failure occurred.
        round: RankId,

        /// The error reported by the group runtime.
        #[source]
        source: GroupError,
    },

    /// The group runtime returned a different number of entries than there are ranks.
    #[error("processor affinity table has {actual} entries but the group has {expected} ranks")]
    InconsistentTable {
        /// The group size.
        expected: usize,

        /// The number of entries received.
        actual: usize,
    },
}

/// A specialized `Result` type for startup coordination, returning the crate's [`Error`] type as
/// the error value.
pub type Result<T> = std::result::Result<T, Error>;
