//! Public handle to the operating system of the machine a rank runs on, supporting both the real
//! host and fake hosts for testing.

#[cfg(any(test, feature = "test-util"))]
use std::borrow::Borrow;
use std::sync::OnceLock;

use tracing::debug;

#[cfg(any(test, feature = "test-util"))]
use crate::fake::{FakePlatform, HostBuilder};
use crate::pal::{Platform, PlatformFacade};
use crate::{Error, ProcessorId};

/// The real host singleton, initialized on first access.
static CURRENT_HOST: OnceLock<Host> = OnceLock::new();

/// Handle to the host operating system, used to probe processor affinity and frequencies.
///
/// A `Host` can represent either the real machine (via [`Host::current()`]) or a simulated
/// machine for testing (via `Host::fake()` when the `test-util` feature is enabled). Code that
/// needs to be testable should accept a `Host` instead of always calling `Host::current()`.
///
/// # Example
///
/// ```
/// use freq_donation::Host;
///
/// match Host::current().current_core() {
///     Ok(core) => println!("This thread is executing on processor {core}"),
///     Err(e) => println!("Processor affinity is not available: {e}"),
/// }
/// ```
#[derive(Clone, Debug)]
pub struct Host {
    platform: PlatformFacade,
}

impl Host {
    /// Returns a handle to the real host.
    #[must_use]
    pub fn current() -> &'static Self {
        CURRENT_HOST.get_or_init(|| Self::from_platform(PlatformFacade::target()))
    }

    /// Creates a fake host for testing purposes.
    ///
    /// Each fake host is independent, so multiple fake hosts (e.g. one per simulated rank) can
    /// coexist in parallel tests without interference.
    ///
    /// # Example
    ///
    /// ```
    /// use freq_donation::Host;
    /// use freq_donation::fake::{CoreBuilder, HostBuilder};
    ///
    /// let host = Host::fake(
    ///     HostBuilder::new()
    ///         .current_core(2)
    ///         .core(CoreBuilder::new(2).available_frequencies("2400000 1200000")),
    /// );
    ///
    /// assert_eq!(host.current_core().unwrap(), 2);
    /// ```
    #[cfg(any(test, feature = "test-util"))]
    #[must_use]
    pub fn fake(builder: impl Borrow<HostBuilder>) -> Self {
        Self::from_platform(PlatformFacade::from_fake(FakePlatform::from_builder(
            builder.borrow(),
        )))
    }

    pub(crate) fn from_platform(platform: PlatformFacade) -> Self {
        Self { platform }
    }

    pub(crate) fn platform(&self) -> &PlatformFacade {
        &self.platform
    }

    /// Returns the processor the calling thread is executing on right now.
    ///
    /// This is a point-in-time snapshot, not a binding guarantee. Startup coordination treats it
    /// as the processor assigned to the rank for the rest of the run.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AffinityUnavailable`] if the operating system cannot report it.
    pub fn current_core(&self) -> crate::Result<ProcessorId> {
        let core = self
            .platform
            .current_processor_id()
            .map_err(|source| Error::AffinityUnavailable { source })?;

        debug!(core, "probed current processor");

        Ok(core)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::io;

    use static_assertions::assert_impl_all;

    use super::*;
    use crate::pal::MockPlatform;
    use crate::pal::fallback::BUILD_TARGET_PLATFORM as FALLBACK_PLATFORM;

    assert_impl_all!(Host: Send, Sync, Clone);

    #[test]
    fn current_core_from_platform() {
        let mut platform = MockPlatform::new();
        platform
            .expect_current_processor_id()
            .times(1)
            .returning(|| Ok(42));

        let host = Host::from_platform(PlatformFacade::from_mock(platform));

        assert_eq!(host.current_core().unwrap(), 42);
    }

    #[test]
    fn affinity_failure_is_fatal_error() {
        let mut platform = MockPlatform::new();
        platform
            .expect_current_processor_id()
            .returning(|| Err(io::Error::from(io::ErrorKind::Unsupported)));

        let host = Host::from_platform(PlatformFacade::from_mock(platform));

        let error = host.current_core().unwrap_err();

        assert!(matches!(
            error,
            Error::AffinityUnavailable { ref source } if source.kind() == io::ErrorKind::Unsupported
        ));
    }

    #[test]
    fn fallback_platform_has_no_affinity() {
        let host = Host::from_platform(PlatformFacade::Fallback(&FALLBACK_PLATFORM));

        assert!(matches!(
            host.current_core(),
            Err(Error::AffinityUnavailable { .. })
        ));
    }

    #[cfg(all(target_os = "linux", not(miri)))]
    #[test]
    fn real_host_reports_plausible_core() {
        let core = Host::current()
            .current_core()
            .expect("sched_getcpu is always available on Linux");

        let processor_count = std::thread::available_parallelism().map_or(1, |n| n.get());

        // Processor IDs may have gaps (offline processors), so this is only a sanity bound.
        assert!((core as usize) < processor_count.saturating_mul(64));
    }
}
