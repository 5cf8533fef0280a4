use std::fmt::Debug;
use std::io;

/// Linux exposes processor frequency management as a virtual filesystem under
/// `/sys/devices/system/cpu`. This trait abstracts that filesystem to allow it to be mocked.
///
/// All I/O is synchronous and blocking because the data is never on a real storage device.
/// Files that do not exist (e.g. because the processor has no frequency driver or the process
/// lacks the privileges to read them) are reported as errors, not as empty content.
#[cfg_attr(test, mockall::automock)]
pub(crate) trait Filesystem: Debug + Send + Sync + 'static {
    /// Gets the contents of the
    /// `/sys/devices/system/cpu/cpu{}/cpufreq/scaling_available_frequencies` file.
    ///
    /// This is a single line of whitespace-separated frequencies in kHz (+ newline), in the
    /// order the driver lists them.
    fn get_scaling_available_frequencies_contents(&self, cpu_index: u32) -> io::Result<String>;

    /// Gets the contents of the `/sys/devices/system/cpu/cpu{}/cpufreq/cpuinfo_cur_freq` file.
    ///
    /// This is a single line with one frequency in kHz (+ newline). Reading it typically
    /// requires elevated privileges.
    fn get_cpuinfo_cur_freq_contents(&self, cpu_index: u32) -> io::Result<String>;
}
