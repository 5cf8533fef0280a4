use derive_more::Display;
use tracing::debug;

use crate::{Error, ProcessGroup, ProcessorId, RankId};

/// How ranks exchange their processor affinity with each other.
///
/// Both strategies produce the same result: on return, every rank holds an identical table with
/// one entry per rank.
#[derive(Clone, Copy, Debug, Default, Display, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum RendezvousStrategy {
    /// One broadcast from each rank in turn, each followed by a barrier.
    ///
    /// This only depends on the most basic collective operations but takes as many collective
    /// rounds as there are ranks, so it scales poorly to large groups.
    #[default]
    #[display("sequential")]
    SequentialBroadcast,

    /// A single [`ProcessGroup::all_gather`] operation.
    #[display("all-gather")]
    AllGather,
}

/// The processor each rank of the group was executing on at startup, indexed by rank.
///
/// Every rank builds its own copy during the rendezvous and all copies are identical.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct CoreAffinityTable {
    cores: Box<[ProcessorId]>,
}

impl CoreAffinityTable {
    /// The processor of the given rank, or `None` if the rank is not part of the group.
    #[must_use]
    pub fn get(&self, rank: RankId) -> Option<ProcessorId> {
        self.cores.get(rank as usize).copied()
    }

    /// The number of ranks in the table, equal to the group size.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cores.len()
    }

    /// Whether the table has no entries, which can only happen for an empty group.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cores.is_empty()
    }

    /// The processors of all ranks, indexed by rank.
    #[must_use]
    pub fn as_slice(&self) -> &[ProcessorId] {
        &self.cores
    }

    /// Iterates over `(rank, processor)` pairs in rank order.
    pub fn iter(&self) -> impl Iterator<Item = (RankId, ProcessorId)> + '_ {
        (0..).zip(self.cores.iter().copied())
    }
}

impl From<Vec<ProcessorId>> for CoreAffinityTable {
    fn from(cores: Vec<ProcessorId>) -> Self {
        Self {
            cores: cores.into_boxed_slice(),
        }
    }
}

/// Exchanges the processor of the calling rank with every other rank of the group.
///
/// This is a collective operation: every rank of the group must call it with the same strategy.
/// It does not return on any rank until every rank has contributed its processor.
///
/// # Errors
///
/// Any failure of a collective operation fails the whole rendezvous with [`Error::Rendezvous`].
/// There is no partial result. If the group runtime returns a table of the wrong size,
/// [`Error::InconsistentTable`] is returned.
pub fn exchange_core_affinity<G>(
    group: &G,
    local_core: ProcessorId,
    strategy: RendezvousStrategy,
) -> crate::Result<CoreAffinityTable>
where
    G: ProcessGroup + ?Sized,
{
    let cores = match strategy {
        RendezvousStrategy::SequentialBroadcast => sequential_broadcast(group, local_core)?,
        RendezvousStrategy::AllGather => all_gather(group, local_core)?,
    };

    let expected = group.size() as usize;
    if cores.len() != expected {
        return Err(Error::InconsistentTable {
            expected,
            actual: cores.len(),
        });
    }

    Ok(CoreAffinityTable::from(cores))
}

fn sequential_broadcast<G>(group: &G, local_core: ProcessorId) -> crate::Result<Vec<ProcessorId>>
where
    G: ProcessGroup + ?Sized,
{
    let rank = group.rank();
    let size = group.size();

    let mut cores = Vec::with_capacity(size as usize);

    for round in 0..size {
        let contribution = (round == rank).then_some(local_core);

        let core = group
            .broadcast(contribution, round)
            .map_err(|source| Error::Rendezvous { round, source })?;
        cores.push(core);

        // No rank may start the next round before every rank has finished this one.
        group
            .barrier()
            .map_err(|source| Error::Rendezvous { round, source })?;

        debug!(rank, round, core, "rendezvous round complete");
    }

    Ok(cores)
}

fn all_gather<G>(group: &G, local_core: ProcessorId) -> crate::Result<Vec<ProcessorId>>
where
    G: ProcessGroup + ?Sized,
{
    let cores = group
        .all_gather(local_core)
        .map_err(|source| Error::Rendezvous { round: 0, source })?;

    debug!(rank = group.rank(), ?cores, "all-gather rendezvous complete");

    Ok(cores)
}
