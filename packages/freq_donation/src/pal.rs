//! Platform Abstraction Layer (PAL). Everything that touches the operating system goes through
//! the [`Platform`] trait so it can be swapped for a fake or a mock in tests.

mod abstractions;
pub(crate) use abstractions::*;

mod facade;
pub(crate) use facade::*;

#[cfg(all(target_os = "linux", not(miri)))]
mod linux;
#[cfg(all(target_os = "linux", not(miri)))]
pub(crate) use linux::*;

// The fallback module is compiled in test mode on all platforms, under Miri, and as the primary
// implementation on unsupported platforms. We only glob-import it when it is the primary
// implementation. On Linux in test mode, it must be accessed via the explicit `fallback::` path.
#[cfg(any(test, miri, not(target_os = "linux")))]
pub(crate) mod fallback;

#[cfg(any(miri, not(target_os = "linux")))]
pub(crate) use fallback::*;
