use std::fmt::Debug;
use std::io;

use crate::ProcessorId;

/// The operating system services that startup coordination depends on.
///
/// File contents are returned raw. Parsing them is the job of the layers above, which are shared
/// by all implementations.
#[cfg_attr(test, mockall::automock)]
pub(crate) trait Platform: Debug + Send + Sync + 'static {
    /// The processor that the current thread is executing on at the moment of the call.
    ///
    /// This is a snapshot. Unless the thread is pinned, the operating system may move it to a
    /// different processor at any time.
    fn current_processor_id(&self) -> io::Result<ProcessorId>;

    /// The list of frequencies the frequency governor of the processor can select, as published
    /// in `/sys/devices/system/cpu/cpu{id}/cpufreq/scaling_available_frequencies` on Linux.
    fn scaling_available_frequencies(&self, processor_id: ProcessorId) -> io::Result<String>;

    /// The current frequency of the processor as reported by the hardware, as published in
    /// `/sys/devices/system/cpu/cpu{id}/cpufreq/cpuinfo_cur_freq` on Linux.
    fn current_frequency(&self, processor_id: ProcessorId) -> io::Result<String>;
}
