use std::fmt::Debug;
use std::io;

/// Bindings for FFI calls into the operating system.
///
/// All PAL FFI calls must go through this trait, enabling them to be mocked.
#[cfg_attr(test, mockall::automock)]
pub(crate) trait Bindings: Debug + Send + Sync + 'static {
    /// `sched_getcpu()`, with a negative return value translated to the `errno` it set.
    fn sched_getcpu(&self) -> Result<i32, io::Error>;
}
