use std::fmt::Debug;
use std::{fs, io};

use crate::pal::linux::Filesystem;

/// The virtual filesystem for the real operating system that the build is targeting.
///
/// You would only use different filesystems in PAL unit tests that need to use a mock filesystem.
#[derive(Debug, Default)]
pub(crate) struct BuildTargetFilesystem;

// Real filesystem bindings are excluded from coverage measurement because the cpufreq files are
// not available on all test systems (e.g. virtual machines without a frequency driver).
#[cfg_attr(coverage_nightly, coverage(off))]
impl Filesystem for BuildTargetFilesystem {
    fn get_scaling_available_frequencies_contents(&self, cpu_index: u32) -> io::Result<String> {
        fs::read_to_string(format!(
            "/sys/devices/system/cpu/cpu{cpu_index}/cpufreq/scaling_available_frequencies"
        ))
    }

    fn get_cpuinfo_cur_freq_contents(&self, cpu_index: u32) -> io::Result<String> {
        fs::read_to_string(format!(
            "/sys/devices/system/cpu/cpu{cpu_index}/cpufreq/cpuinfo_cur_freq"
        ))
    }
}
