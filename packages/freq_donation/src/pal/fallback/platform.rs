use std::io;

use crate::ProcessorId;
use crate::pal::Platform;

/// Fallback platform implementation for operating systems without native support.
///
/// There is no portable way to ask which processor a thread is executing on or which frequencies
/// a processor supports, so every operation reports [`io::ErrorKind::Unsupported`]. Startup
/// coordination treats the affinity failure as fatal and the frequency failures as a degraded
/// quota, exactly as it would on a Linux system without a frequency driver.
#[derive(Debug)]
pub(crate) struct BuildTargetPlatform;

/// Singleton instance of `BuildTargetPlatform`, used by public API types
/// to hook up to the correct PAL implementation.
pub(crate) static BUILD_TARGET_PLATFORM: BuildTargetPlatform = BuildTargetPlatform;

fn unsupported(what: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        format!("{what} is not available on this platform"),
    )
}

impl Platform for BuildTargetPlatform {
    fn current_processor_id(&self) -> io::Result<ProcessorId> {
        Err(unsupported("current processor query"))
    }

    fn scaling_available_frequencies(&self, _processor_id: ProcessorId) -> io::Result<String> {
        Err(unsupported("processor frequency scaling information"))
    }

    fn current_frequency(&self, _processor_id: ProcessorId) -> io::Result<String> {
        Err(unsupported("current processor frequency"))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn every_operation_is_unsupported() {
        let platform = &BUILD_TARGET_PLATFORM;

        assert_eq!(
            platform.current_processor_id().unwrap_err().kind(),
            io::ErrorKind::Unsupported
        );
        assert_eq!(
            platform.scaling_available_frequencies(0).unwrap_err().kind(),
            io::ErrorKind::Unsupported
        );
        assert_eq!(
            platform.current_frequency(0).unwrap_err().kind(),
            io::ErrorKind::Unsupported
        );
    }
}
