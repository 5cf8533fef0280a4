//! Simulated hosts and process groups for testing.
//!
//! Only available when the `test-util` feature is enabled.
//!
//! A simulated group runs every rank on its own thread within one process. Each rank gets a
//! [`FakeRank`] handle implementing [`ProcessGroup`][crate::ProcessGroup] and, typically, its own
//! fake [`Host`][crate::Host] that decides which processor the rank is executing on and what its
//! frequency files contain.
//!
//! # Example
//!
//! ```
//! use std::num::NonZero;
//! use std::thread;
//!
//! use freq_donation::fake::{CoreBuilder, GroupBuilder, HostBuilder};
//! use freq_donation::{Host, ProcessGroup, StartupConfig, StartupContext};
//!
//! let ranks = GroupBuilder::new(NonZero::new(2).unwrap()).build();
//!
//! let threads: Vec<_> = ranks
//!     .into_iter()
//!     .map(|rank| {
//!         thread::spawn(move || {
//!             // Rank 0 runs on processor 4, rank 1 on processor 6.
//!             let core = 4 + 2 * rank.rank();
//!             let host = Host::fake(
//!                 HostBuilder::new().current_core(core).core(
//!                     CoreBuilder::new(core)
//!                         .available_frequencies("3000000 2400000 1800000")
//!                         .current_frequency("2600000"),
//!                 ),
//!             );
//!
//!             StartupContext::initialize(&StartupConfig::new(), &rank, &host).unwrap()
//!         })
//!     })
//!     .collect();
//!
//! for thread in threads {
//!     let context = thread.join().unwrap();
//!
//!     assert_eq!(context.core_affinity().as_slice(), &[4, 6]);
//!     assert_eq!(context.donation_quota().unwrap().get(), 200_000);
//! }
//! ```
//!
//! # Failure injection
//!
//! [`GroupBuilder::fail_collective()`] makes one rank fail one of its collective operations. As
//! with real group runtimes that abort the whole job on error, the failure aborts the group:
//! every other rank's pending and future collective operations fail too, so no rank can finish
//! a rendezvous with a partial result.

mod group;
mod host;

pub use group::{FakeRank, GroupBuilder};
pub(crate) use host::FakePlatform;
pub use host::{CoreBuilder, HostBuilder};
