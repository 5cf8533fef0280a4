use tracing::{error, info, warn};

use crate::{
    AsyncProgress, ConcurrencyLevel, CoreAffinityTable, DonationQuota, Error,
    FrequencyCapabilities, GroupSize, Host, ProcessGroup, ProcessorId, RankId, StartupConfig,
    exchange_core_affinity, negotiate_async_progress, resolve_thread_level,
};

/// Everything a rank learned while joining its process group, owned by the rank for the rest of
/// the run.
///
/// Every rank of the group holds an identical [`core_affinity()`][Self::core_affinity] table.
/// The frequency data and the donation quota describe only the calling rank's own processor.
#[derive(Clone, Debug)]
pub struct StartupContext {
    requested_level: ConcurrencyLevel,
    granted_level: ConcurrencyLevel,
    async_progress: AsyncProgress,

    rank: RankId,
    group_size: GroupSize,

    core_affinity: CoreAffinityTable,
    capabilities: FrequencyCapabilities,
    donation_quota: Option<DonationQuota>,
}

impl StartupContext {
    /// Joins the process group and runs the startup coordination of the calling rank.
    ///
    /// This is a collective operation: every rank of `group` must call it with the same
    /// configuration. The steps are:
    ///
    /// 1. Resolve the thread level to request. No collective operation is attempted if the
    ///    configuration is invalid.
    /// 2. Initialize the group, then start the async progress agent if it was requested and the
    ///    group granted [`ConcurrencyLevel::Multiple`].
    /// 3. Probe the processor the calling thread is executing on.
    /// 4. Exchange processors with every other rank.
    /// 5. Probe the frequency capabilities of this rank's processor and calculate its donation
    ///    quota.
    ///
    /// # Errors
    ///
    /// Configuration errors, group runtime failures, an unavailable processor affinity and a
    /// failed rendezvous are fatal and returned as an error. Once the group is initialized, a
    /// fatal error also aborts the group via [`ProcessGroup::abort()`], so the other ranks fail
    /// their rendezvous instead of waiting for this one. No rank ever holds a partial table.
    ///
    /// Frequency probing problems are not fatal: the rank is returned without a donation quota.
    pub fn initialize<G>(config: &StartupConfig, group: &G, host: &Host) -> crate::Result<Self>
    where
        G: ProcessGroup + ?Sized,
    {
        let requested_level = resolve_thread_level(config)?;

        let granted_level = group
            .initialize(requested_level)
            .map_err(|source| Error::GroupInitialization { source })?;

        Self::coordinate(config, group, host, requested_level, granted_level).inspect_err(|e| {
            error!(
                rank = group.rank(),
                error = %e,
                "startup coordination failed, aborting the process group"
            );

            group.abort();
        })
    }

    /// The steps after group initialization. Any error returned from here must abort the group,
    /// as the other ranks may already be waiting for this one in a collective operation.
    fn coordinate<G>(
        config: &StartupConfig,
        group: &G,
        host: &Host,
        requested_level: ConcurrencyLevel,
        granted_level: ConcurrencyLevel,
    ) -> crate::Result<Self>
    where
        G: ProcessGroup + ?Sized,
    {
        let async_progress =
            negotiate_async_progress(config.is_async_progress_requested(), granted_level);

        if async_progress == AsyncProgress::Enabled {
            group
                .start_async_progress()
                .map_err(|source| Error::AsyncProgressStart { source })?;
        }

        let rank = group.rank();
        let local_core = host.current_core()?;

        let core_affinity = exchange_core_affinity(group, local_core, config.strategy())?;

        // The table entry of this rank is what every other rank believes our processor to be.
        let core = core_affinity.get(rank).unwrap_or(local_core);

        let capabilities = FrequencyCapabilities::probe(host, core);

        let donation_quota = match DonationQuota::calculate(&capabilities) {
            Ok(quota) => Some(quota),
            Err(e) => {
                warn!(rank, core, error = %e, "no frequency donation quota for this rank");
                None
            }
        };

        info!(
            rank,
            size = group.size(),
            %granted_level,
            ?async_progress,
            core,
            quota = donation_quota.map(DonationQuota::get),
            "startup coordination complete"
        );

        Ok(Self {
            requested_level,
            granted_level,
            async_progress,
            rank,
            group_size: group.size(),
            core_affinity,
            capabilities,
            donation_quota,
        })
    }

    /// The concurrency level requested from the group runtime.
    #[must_use]
    pub fn requested_level(&self) -> ConcurrencyLevel {
        self.requested_level
    }

    /// The concurrency level the group runtime granted, which may be lower than requested.
    #[must_use]
    pub fn granted_level(&self) -> ConcurrencyLevel {
        self.granted_level
    }

    /// Whether the async progress agent was started.
    #[must_use]
    pub fn async_progress(&self) -> AsyncProgress {
        self.async_progress
    }

    /// The rank of the calling process within its group.
    #[must_use]
    pub fn rank(&self) -> RankId {
        self.rank
    }

    /// The number of ranks in the group.
    #[must_use]
    pub fn group_size(&self) -> GroupSize {
        self.group_size
    }

    /// The processor of every rank, identical on all ranks.
    #[must_use]
    pub fn core_affinity(&self) -> &CoreAffinityTable {
        &self.core_affinity
    }

    /// The processor of the calling rank.
    #[must_use]
    pub fn local_core(&self) -> ProcessorId {
        self.capabilities.core()
    }

    /// What the frequency driver reported about the calling rank's processor.
    #[must_use]
    pub fn frequency_capabilities(&self) -> &FrequencyCapabilities {
        &self.capabilities
    }

    /// The donation quota of the calling rank, or `None` if it could not be calculated.
    #[must_use]
    pub fn donation_quota(&self) -> Option<DonationQuota> {
        self.donation_quota
    }
}
