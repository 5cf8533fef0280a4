use std::io;

use crate::ProcessorId;
use crate::pal::Platform;
use crate::pal::linux::{Bindings, BindingsFacade, Filesystem, FilesystemFacade};

/// Singleton instance of `BuildTargetPlatform`, used by public API types
/// to hook up to the correct PAL implementation.
pub(crate) static BUILD_TARGET_PLATFORM: BuildTargetPlatform =
    BuildTargetPlatform::new(BindingsFacade::target(), FilesystemFacade::target());

/// The platform that matches the crate's build target.
///
/// You would only use a different platform in unit tests that need to mock the platform.
#[derive(Debug)]
pub(crate) struct BuildTargetPlatform {
    bindings: BindingsFacade,
    fs: FilesystemFacade,
}

impl BuildTargetPlatform {
    pub(crate) const fn new(bindings: BindingsFacade, fs: FilesystemFacade) -> Self {
        Self { bindings, fs }
    }
}

impl Platform for BuildTargetPlatform {
    fn current_processor_id(&self) -> io::Result<ProcessorId> {
        let cpu = self.bindings.sched_getcpu()?;

        ProcessorId::try_from(cpu).map_err(io::Error::other)
    }

    fn scaling_available_frequencies(&self, processor_id: ProcessorId) -> io::Result<String> {
        self.fs
            .get_scaling_available_frequencies_contents(processor_id)
    }

    fn current_frequency(&self, processor_id: ProcessorId) -> io::Result<String> {
        self.fs.get_cpuinfo_cur_freq_contents(processor_id)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use mockall::predicate::eq;

    use super::*;
    use crate::pal::linux::{MockBindings, MockFilesystem};

    fn platform_with(bindings: MockBindings, fs: MockFilesystem) -> BuildTargetPlatform {
        BuildTargetPlatform::new(
            BindingsFacade::from_mock(bindings),
            FilesystemFacade::from_mock(fs),
        )
    }

    #[test]
    fn current_processor_id_comes_from_sched_getcpu() {
        let mut bindings = MockBindings::new();
        bindings.expect_sched_getcpu().times(1).returning(|| Ok(13));

        let platform = platform_with(bindings, MockFilesystem::new());

        assert_eq!(platform.current_processor_id().unwrap(), 13);
    }

    #[test]
    fn sched_getcpu_failure_is_reported() {
        let mut bindings = MockBindings::new();
        bindings
            .expect_sched_getcpu()
            .times(1)
            .returning(|| Err(io::Error::from(io::ErrorKind::Unsupported)));

        let platform = platform_with(bindings, MockFilesystem::new());

        let error = platform.current_processor_id().unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::Unsupported);
    }

    #[test]
    fn frequency_files_are_read_for_requested_processor() {
        let mut fs = MockFilesystem::new();
        fs.expect_get_scaling_available_frequencies_contents()
            .with(eq(5))
            .times(1)
            .returning(|_| Ok("3000000 2400000 1800000\n".to_string()));
        fs.expect_get_cpuinfo_cur_freq_contents()
            .with(eq(5))
            .times(1)
            .returning(|_| Ok("2600000\n".to_string()));

        let platform = platform_with(MockBindings::new(), fs);

        assert_eq!(
            platform.scaling_available_frequencies(5).unwrap(),
            "3000000 2400000 1800000\n"
        );
        assert_eq!(platform.current_frequency(5).unwrap(), "2600000\n");
    }

    #[test]
    fn missing_frequency_file_is_error() {
        let mut fs = MockFilesystem::new();
        fs.expect_get_cpuinfo_cur_freq_contents()
            .returning(|_| Err(io::Error::from(io::ErrorKind::PermissionDenied)));

        let platform = platform_with(MockBindings::new(), fs);

        let error = platform.current_frequency(0).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::PermissionDenied);
    }
}
