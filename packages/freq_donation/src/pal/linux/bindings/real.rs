use std::fmt::Debug;
use std::io;

use crate::pal::linux::Bindings;

/// FFI bindings that target the real operating system that the build is targeting.
///
/// You would only use different bindings in PAL unit tests that need to use mock bindings.
#[derive(Debug, Default)]
pub(crate) struct BuildTargetBindings;

// Real OS bindings are excluded from coverage measurement because the error path requires an
// OS-level failure that is impractical to trigger in tests.
#[cfg_attr(coverage_nightly, coverage(off))]
impl Bindings for BuildTargetBindings {
    fn sched_getcpu(&self) -> Result<i32, io::Error> {
        // SAFETY: No safety requirements.
        let result = unsafe { libc::sched_getcpu() };

        if result >= 0 {
            Ok(result)
        } else {
            Err(io::Error::last_os_error())
        }
    }
}
