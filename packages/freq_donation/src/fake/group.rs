//! In-process simulation of a process group, one thread per rank.

use std::any::type_name;
use std::fmt;
use std::mem;
use std::num::NonZero;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use parking_lot::{Condvar, Mutex};

use crate::{
    CollectiveOperation, ConcurrencyLevel, GroupError, GroupSize, ProcessGroup, ProcessorId,
    RankId,
};

/// Builder for a simulated process group.
///
/// # Example
///
/// ```
/// use std::num::NonZero;
///
/// use freq_donation::fake::GroupBuilder;
/// use freq_donation::{ConcurrencyLevel, ProcessGroup};
///
/// let ranks = GroupBuilder::new(NonZero::new(4).unwrap())
///     .max_concurrency_level(ConcurrencyLevel::Serialized)
///     .build();
///
/// assert_eq!(ranks.len(), 4);
/// assert_eq!(
///     ranks[0].initialize(ConcurrencyLevel::Multiple).unwrap(),
///     ConcurrencyLevel::Serialized
/// );
/// ```
#[derive(Clone, Debug)]
pub struct GroupBuilder {
    size: NonZero<GroupSize>,
    max_concurrency_level: ConcurrencyLevel,
    fail_async_progress: bool,
    failing_collective: Option<(RankId, u32)>,
}

impl GroupBuilder {
    /// Creates a builder for a group with `size` ranks that grants any concurrency level.
    #[must_use]
    pub fn new(size: NonZero<GroupSize>) -> Self {
        Self {
            size,
            max_concurrency_level: ConcurrencyLevel::Multiple,
            fail_async_progress: false,
            failing_collective: None,
        }
    }

    /// Sets the highest concurrency level the group grants. Requests for higher levels are
    /// granted this level instead.
    #[must_use]
    pub fn max_concurrency_level(mut self, level: ConcurrencyLevel) -> Self {
        self.max_concurrency_level = level;
        self
    }

    /// Makes starting the async progress agent fail on every rank.
    #[must_use]
    pub fn fail_async_progress_start(mut self) -> Self {
        self.fail_async_progress = true;
        self
    }

    /// Makes `rank` fail its collective operation number `call_index` (counting broadcasts,
    /// barriers and all-gathers together, from zero). The failure aborts the whole group.
    ///
    /// In the sequential rendezvous, round `r` consists of calls `2r` (broadcast) and `2r + 1`
    /// (barrier).
    ///
    /// # Panics
    ///
    /// Panics if `rank` is not part of the group.
    #[must_use]
    pub fn fail_collective(mut self, rank: RankId, call_index: u32) -> Self {
        assert!(
            rank < self.size.get(),
            "rank {rank} is not part of a group of {} ranks",
            self.size
        );

        self.failing_collective = Some((rank, call_index));
        self
    }

    /// Creates the group, returning the handle of every rank in rank order.
    ///
    /// Each handle is meant to be moved to its own thread.
    #[must_use]
    pub fn build(&self) -> Vec<FakeRank> {
        let shared = Arc::new(SharedGroup {
            size: self.size.get(),
            max_concurrency_level: self.max_concurrency_level,
            fail_async_progress: self.fail_async_progress,
            failing_collective: self.failing_collective,
            round: Mutex::new(Round::new(self.size.get())),
            round_changed: Condvar::new(),
        });

        (0..self.size.get())
            .map(|rank| FakeRank::new(rank, Arc::clone(&shared)))
            .collect()
    }
}

/// State of the collective operation in progress, guarded by the group's mutex.
#[derive(Debug)]
struct Round {
    /// Incremented every time all ranks have arrived.
    generation: u64,

    /// The operation that the first arriving rank entered.
    operation: Option<CollectiveOperation>,

    arrived: GroupSize,
    contributions: Vec<Option<ProcessorId>>,

    /// Contributions of the most recently completed round.
    completed: Vec<Option<ProcessorId>>,

    aborted_by: Option<RankId>,
}

impl Round {
    fn new(size: GroupSize) -> Self {
        Self {
            generation: 0,
            operation: None,
            arrived: 0,
            contributions: vec![None; size as usize],
            completed: vec![None; size as usize],
            aborted_by: None,
        }
    }
}

#[derive(Debug)]
struct SharedGroup {
    size: GroupSize,
    max_concurrency_level: ConcurrencyLevel,
    fail_async_progress: bool,
    failing_collective: Option<(RankId, u32)>,

    round: Mutex<Round>,
    round_changed: Condvar,
}

impl SharedGroup {
    fn abort(&self, by_rank: RankId) {
        let mut round = self.round.lock();

        round.aborted_by.get_or_insert(by_rank);
        self.round_changed.notify_all();
    }
}

/// The handle of one rank of a simulated process group.
///
/// Collective operations block until every rank of the group has entered the same operation. A
/// rank whose operation fails aborts the group, which fails every pending and future collective
/// operation on every rank with [`GroupError::Aborted`].
pub struct FakeRank {
    rank: RankId,
    shared: Arc<SharedGroup>,

    collective_calls: AtomicU32,
    broadcasts: AtomicU32,
    barriers: AtomicU32,
    all_gathers: AtomicU32,
    async_progress_started: AtomicBool,
}

impl fmt::Debug for FakeRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("rank", &self.rank)
            .field("size", &self.shared.size)
            .field("broadcasts", &self.broadcasts)
            .field("barriers", &self.barriers)
            .field("all_gathers", &self.all_gathers)
            .finish_non_exhaustive()
    }
}

impl FakeRank {
    fn new(rank: RankId, shared: Arc<SharedGroup>) -> Self {
        Self {
            rank,
            shared,
            collective_calls: AtomicU32::new(0),
            broadcasts: AtomicU32::new(0),
            barriers: AtomicU32::new(0),
            all_gathers: AtomicU32::new(0),
            async_progress_started: AtomicBool::new(false),
        }
    }

    /// The number of broadcasts this rank has entered, including failed ones.
    #[must_use]
    pub fn broadcast_count(&self) -> u32 {
        self.broadcasts.load(Ordering::Relaxed)
    }

    /// The number of barriers this rank has entered, including failed ones.
    #[must_use]
    pub fn barrier_count(&self) -> u32 {
        self.barriers.load(Ordering::Relaxed)
    }

    /// The number of all-gathers this rank has entered, including failed ones.
    #[must_use]
    pub fn all_gather_count(&self) -> u32 {
        self.all_gathers.load(Ordering::Relaxed)
    }

    /// Whether the async progress agent was started on this rank.
    #[must_use]
    pub fn is_async_progress_started(&self) -> bool {
        self.async_progress_started.load(Ordering::Relaxed)
    }

    /// Aborts the group on behalf of this rank and returns `error` for this rank to report.
    fn abort_with(&self, error: GroupError) -> GroupError {
        self.shared.abort(self.rank);
        error
    }

    /// Runs one collective operation, returning the contributions of all ranks once every rank
    /// has entered it.
    fn collective(
        &self,
        operation: CollectiveOperation,
        contribution: Option<ProcessorId>,
    ) -> Result<Vec<Option<ProcessorId>>, GroupError> {
        let call_index = self.collective_calls.fetch_add(1, Ordering::Relaxed);

        if self.shared.failing_collective == Some((self.rank, call_index)) {
            self.shared.abort(self.rank);

            return Err(GroupError::Failed {
                rank: self.rank,
                operation,
            });
        }

        let mut round = self.shared.round.lock();

        if let Some(by_rank) = round.aborted_by {
            return Err(GroupError::Aborted { by_rank });
        }

        match round.operation {
            None => round.operation = Some(operation),
            Some(expected) if expected != operation => {
                round.aborted_by = Some(self.rank);
                self.shared.round_changed.notify_all();

                return Err(GroupError::Mismatched {
                    expected,
                    actual: operation,
                });
            }
            Some(_) => {}
        }

        if let Some(slot) = round.contributions.get_mut(self.rank as usize) {
            *slot = contribution;
        }

        #[expect(
            clippy::arithmetic_side_effects,
            reason = "bounded by the group size, which fits in GroupSize"
        )]
        {
            round.arrived += 1;
        }

        if round.arrived == self.shared.size {
            let fresh = vec![None; self.shared.size as usize];
            round.completed = mem::replace(&mut round.contributions, fresh);
            round.arrived = 0;
            round.operation = None;
            round.generation = round.generation.wrapping_add(1);

            self.shared.round_changed.notify_all();

            return Ok(round.completed.clone());
        }

        let generation = round.generation;

        loop {
            self.shared.round_changed.wait(&mut round);

            // A rank cannot enter the next round before it has read the result of this one,
            // so `completed` still holds the result of our round.
            if round.generation != generation {
                return Ok(round.completed.clone());
            }

            if let Some(by_rank) = round.aborted_by {
                return Err(GroupError::Aborted { by_rank });
            }
        }
    }
}

impl ProcessGroup for FakeRank {
    fn rank(&self) -> RankId {
        self.rank
    }

    fn size(&self) -> GroupSize {
        self.shared.size
    }

    fn initialize(&self, requested: ConcurrencyLevel) -> Result<ConcurrencyLevel, GroupError> {
        Ok(requested.min(self.shared.max_concurrency_level))
    }

    fn start_async_progress(&self) -> Result<(), GroupError> {
        if self.shared.fail_async_progress {
            return Err(GroupError::Other(
                "async progress agent could not be started".to_string(),
            ));
        }

        self.async_progress_started.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn broadcast(
        &self,
        value: Option<ProcessorId>,
        root: RankId,
    ) -> Result<ProcessorId, GroupError> {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);

        if root >= self.shared.size {
            return Err(self.abort_with(GroupError::Other(format!(
                "broadcast root {root} is not part of a group of {} ranks",
                self.shared.size
            ))));
        }

        if root == self.rank && value.is_none() {
            return Err(self.abort_with(GroupError::Other(format!(
                "broadcast root {root} did not provide a value"
            ))));
        }

        let contributions = self.collective(CollectiveOperation::Broadcast { root }, value)?;

        contributions
            .get(root as usize)
            .copied()
            .flatten()
            .ok_or_else(|| {
                self.abort_with(GroupError::Other(format!("rank {root} broadcast no value")))
            })
    }

    fn barrier(&self) -> Result<(), GroupError> {
        self.barriers.fetch_add(1, Ordering::Relaxed);

        self.collective(CollectiveOperation::Barrier, None).map(|_| ())
    }

    fn abort(&self) {
        self.shared.abort(self.rank);
    }

    fn all_gather(&self, value: ProcessorId) -> Result<Vec<ProcessorId>, GroupError> {
        self.all_gathers.fetch_add(1, Ordering::Relaxed);

        let contributions = self.collective(CollectiveOperation::AllGather, Some(value))?;

        contributions
            .into_iter()
            .zip(0..)
            .map(|(value, rank)| {
                value.ok_or_else(|| {
                    self.abort_with(GroupError::Other(format!("rank {rank} gathered no value")))
                })
            })
            .collect()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use new_zealand::nz;
    use static_assertions::assert_impl_all;
    use testing::{run_ranks, with_watchdog};

    use super::*;

    assert_impl_all!(FakeRank: Send, Sync);

    #[test]
    fn broadcast_reaches_every_rank() {
        let results = run_ranks(GroupBuilder::new(nz!(4)).build(), |rank| {
            let value = (rank.rank() == 2).then_some(77);
            rank.broadcast(value, 2).unwrap()
        });

        assert_eq!(results, vec![77; 4]);
    }

    #[test]
    fn all_gather_collects_in_rank_order() {
        let results = run_ranks(GroupBuilder::new(nz!(3)).build(), |rank| {
            rank.all_gather(rank.rank() * 10).unwrap()
        });

        for gathered in results {
            assert_eq!(gathered, vec![0, 10, 20]);
        }
    }

    #[test]
    fn consecutive_rounds_do_not_mix() {
        let results = run_ranks(GroupBuilder::new(nz!(3)).build(), |rank| {
            (0..3)
                .map(|root| {
                    let value = (rank.rank() == root).then_some(root + 50);
                    rank.broadcast(value, root).unwrap()
                })
                .collect::<Vec<_>>()
        });

        for received in results {
            assert_eq!(received, vec![50, 51, 52]);
        }
    }

    #[test]
    fn failure_aborts_every_rank() {
        let results = run_ranks(
            GroupBuilder::new(nz!(3)).fail_collective(1, 0).build(),
            |rank| rank.barrier(),
        );

        assert_eq!(
            results,
            vec![
                Err(GroupError::Aborted { by_rank: 1 }),
                Err(GroupError::Failed {
                    rank: 1,
                    operation: CollectiveOperation::Barrier
                }),
                Err(GroupError::Aborted { by_rank: 1 }),
            ]
        );
    }

    #[test]
    fn mismatched_operations_abort_the_group() {
        let results = run_ranks(GroupBuilder::new(nz!(2)).build(), |rank| {
            if rank.rank() == 0 {
                rank.barrier().map(|()| 0)
            } else {
                rank.broadcast(None, 0)
            }
        });

        // Whichever rank arrives second detects the mismatch, the other one is aborted.
        assert!(results.iter().all(Result::is_err));
        assert!(
            results
                .iter()
                .any(|r| matches!(r, Err(GroupError::Mismatched { .. })))
        );
    }

    #[test]
    fn grants_at_most_the_configured_level() {
        let ranks = GroupBuilder::new(nz!(1))
            .max_concurrency_level(ConcurrencyLevel::Funneled)
            .build();
        let rank = ranks.first().unwrap();

        assert_eq!(
            rank.initialize(ConcurrencyLevel::Single).unwrap(),
            ConcurrencyLevel::Single
        );
        assert_eq!(
            rank.initialize(ConcurrencyLevel::Multiple).unwrap(),
            ConcurrencyLevel::Funneled
        );
    }

    #[test]
    fn counts_operations() {
        let ranks = GroupBuilder::new(nz!(1)).build();
        let rank = ranks.first().unwrap();

        rank.broadcast(Some(1), 0).unwrap();
        rank.barrier().unwrap();
        rank.barrier().unwrap();
        rank.all_gather(1).unwrap();

        assert_eq!(rank.broadcast_count(), 1);
        assert_eq!(rank.barrier_count(), 2);
        assert_eq!(rank.all_gather_count(), 1);
    }

    #[test]
    fn rejects_invalid_broadcasts() {
        let ranks = GroupBuilder::new(nz!(1)).build();
        let rank = ranks.first().unwrap();

        assert!(matches!(rank.broadcast(Some(1), 1), Err(GroupError::Other(_))));
        assert!(matches!(rank.broadcast(None, 0), Err(GroupError::Other(_))));
    }

    #[test]
    fn root_without_value_aborts_the_group() {
        let results = with_watchdog(|| {
            run_ranks(GroupBuilder::new(nz!(2)).build(), |rank| {
                rank.broadcast(None, 0)
            })
        });

        assert!(matches!(results[0], Err(GroupError::Other(_))));
        assert_eq!(results[1], Err(GroupError::Aborted { by_rank: 0 }));
    }

    #[test]
    fn root_outside_group_aborts_the_group() {
        let results = with_watchdog(|| {
            run_ranks(GroupBuilder::new(nz!(2)).build(), |rank| {
                if rank.rank() == 0 {
                    rank.broadcast(Some(1), 5)
                } else {
                    rank.barrier().map(|()| 0)
                }
            })
        });

        assert!(matches!(results[0], Err(GroupError::Other(_))));
        assert_eq!(results[1], Err(GroupError::Aborted { by_rank: 0 }));
    }

    #[test]
    fn explicit_abort_fails_waiting_ranks() {
        let results = with_watchdog(|| {
            run_ranks(GroupBuilder::new(nz!(3)).build(), |rank| {
                if rank.rank() == 1 {
                    rank.abort();
                    // Aborting again has no further effect.
                    rank.abort();
                    Ok(())
                } else {
                    rank.barrier()
                }
            })
        });

        assert_eq!(
            results,
            vec![
                Err(GroupError::Aborted { by_rank: 1 }),
                Ok(()),
                Err(GroupError::Aborted { by_rank: 1 }),
            ]
        );
    }

    #[test]
    fn async_progress_start_can_fail() {
        let ranks = GroupBuilder::new(nz!(1)).fail_async_progress_start().build();
        let rank = ranks.first().unwrap();

        assert!(rank.start_async_progress().is_err());
        assert!(!rank.is_async_progress_started());
    }

    #[test]
    #[should_panic(expected = "is not part of a group")]
    fn failing_rank_must_exist() {
        drop(GroupBuilder::new(nz!(2)).fail_collective(2, 0));
    }
}
