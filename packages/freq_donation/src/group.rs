use derive_more::Display;
use thiserror::Error;

use crate::{ConcurrencyLevel, GroupSize, ProcessorId, RankId};

/// The process group runtime that startup coordination is layered on.
///
/// This crate does not implement a group runtime. Hosts implement this trait on top of whatever
/// runtime they use. Every collective operation (`broadcast`, `barrier`, `all_gather`) must be
/// called by all ranks of the group in the same order and blocks until the whole group has
/// reached it.
///
/// Any error returned from a collective operation is treated as fatal for the whole group. A
/// runtime that reports a failure on one rank is expected to also fail (rather than hang) the
/// matching operation on every other rank, as is the convention for group runtimes that abort
/// the whole job on error.
pub trait ProcessGroup {
    /// The rank of the calling process. Only valid after [`initialize()`][Self::initialize].
    fn rank(&self) -> RankId;

    /// The number of ranks in the group. Only valid after [`initialize()`][Self::initialize].
    fn size(&self) -> GroupSize;

    /// Initializes the group runtime, requesting the given concurrency level.
    ///
    /// Returns the level actually granted, which may be lower than the requested one.
    fn initialize(&self, requested: ConcurrencyLevel) -> Result<ConcurrencyLevel, GroupError>;

    /// Starts a background agent that makes progress on communication operations independently
    /// of the application threads. Only called if `Multiple` was granted.
    fn start_async_progress(&self) -> Result<(), GroupError>;

    /// Broadcasts one value from the `root` rank to every rank in the group.
    ///
    /// The root passes `Some(value)`, every other rank passes `None`. All ranks receive the
    /// value provided by the root.
    fn broadcast(
        &self,
        value: Option<ProcessorId>,
        root: RankId,
    ) -> Result<ProcessorId, GroupError>;

    /// Blocks until every rank in the group has called `barrier()`.
    fn barrier(&self) -> Result<(), GroupError>;

    /// Aborts the whole group on behalf of the calling rank, after a fatal error that the other
    /// ranks cannot observe on their own.
    ///
    /// Every pending and future collective operation of every rank must fail instead of waiting
    /// for the calling rank. Runtimes that have no way to notify the other ranks terminate the
    /// job. Calling it more than once, or after the group has already been aborted, has no
    /// further effect.
    fn abort(&self);

    /// Collects one value from every rank, returning them indexed by rank on every rank.
    ///
    /// The default implementation performs one broadcast per rank. Runtimes with a native
    /// all-gather operation should override it.
    fn all_gather(&self, value: ProcessorId) -> Result<Vec<ProcessorId>, GroupError> {
        let rank = self.rank();

        (0..self.size())
            .map(|root| self.broadcast((root == rank).then_some(value), root))
            .collect()
    }
}

/// A collective operation of a [`ProcessGroup`], used to describe failures.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum CollectiveOperation {
    /// [`ProcessGroup::broadcast`] from the given root rank.
    #[display("broadcast from rank {root}")]
    Broadcast {
        /// The rank whose value was being broadcast.
        root: RankId,
    },

    /// [`ProcessGroup::barrier`].
    #[display("barrier")]
    Barrier,

    /// [`ProcessGroup::all_gather`].
    #[display("all-gather")]
    AllGather,
}

/// Errors reported by a [`ProcessGroup`].
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum GroupError {
    /// Another rank failed and the group runtime aborted the operation on this rank.
    #[error("process group was aborted by rank {by_rank}")]
    Aborted {
        /// The rank whose failure aborted the group.
        by_rank: RankId,
    },

    /// The operation failed on this rank.
    #[error("rank {rank} failed during {operation}")]
    Failed {
        /// The failing rank.
        rank: RankId,

        /// The operation that failed.
        operation: CollectiveOperation,
    },

    /// Ranks entered different collective operations in the same round.
    #[error("ranks disagree on the collective operation: {expected} versus {actual}")]
    Mismatched {
        /// The operation the first rank of the round entered.
        expected: CollectiveOperation,

        /// The operation a later rank entered.
        actual: CollectiveOperation,
    },

    /// A runtime-specific failure.
    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::cell::RefCell;
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(GroupError: Send, Sync, Debug, Clone);

    /// A group where every broadcast returns a value derived from the root, recording the calls.
    #[derive(Debug, Default)]
    struct RecordingGroup {
        broadcasts: RefCell<Vec<(Option<ProcessorId>, RankId)>>,
    }

    impl ProcessGroup for RecordingGroup {
        fn rank(&self) -> RankId {
            1
        }

        fn size(&self) -> GroupSize {
            3
        }

        fn initialize(&self, requested: ConcurrencyLevel) -> Result<ConcurrencyLevel, GroupError> {
            Ok(requested)
        }

        fn start_async_progress(&self) -> Result<(), GroupError> {
            Ok(())
        }

        fn broadcast(
            &self,
            value: Option<ProcessorId>,
            root: RankId,
        ) -> Result<ProcessorId, GroupError> {
            self.broadcasts.borrow_mut().push((value, root));
            Ok(value.unwrap_or(root * 10))
        }

        fn barrier(&self) -> Result<(), GroupError> {
            Ok(())
        }

        fn abort(&self) {}
    }

    #[test]
    fn default_all_gather_broadcasts_from_every_rank() {
        let group = RecordingGroup::default();

        let gathered = group.all_gather(7).unwrap();

        assert_eq!(gathered, vec![0, 7, 20]);
        assert_eq!(
            *group.broadcasts.borrow(),
            vec![(None, 0), (Some(7), 1), (None, 2)]
        );
    }

    #[test]
    fn operations_display_root() {
        assert_eq!(
            CollectiveOperation::Broadcast { root: 4 }.to_string(),
            "broadcast from rank 4"
        );
        assert_eq!(
            GroupError::Failed {
                rank: 2,
                operation: CollectiveOperation::Barrier
            }
            .to_string(),
            "rank 2 failed during barrier"
        );
    }
}
