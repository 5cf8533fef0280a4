/// Identifies a specific processor.
///
/// This will match the numeric identifier used by standard tooling of the operating system and
/// by the `/sys/devices/system/cpu/cpu{id}` directory layout on Linux.
pub type ProcessorId = u32;

/// Identifies a process within a process group.
///
/// Rank identifiers are assigned by the group runtime, start from zero and are contiguous.
pub type RankId = u32;

/// A processor frequency, in the unit the operating system reports it in (kHz on Linux).
pub type Frequency = u64;

/// Number of ranks in a process group. Constant for the lifetime of the group.
pub type GroupSize = u32;
