#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Startup coordination for processor frequency donation across the ranks of a process group.
//!
//! When a parallel job starts, each of its processes (ranks) joins a process group. This package
//! runs the steps that every rank performs while joining:
//!
//! 1. Decide which [`ConcurrencyLevel`] to request from the group runtime, based on
//!    [`StartupConfig`]. Requesting async progress forces [`ConcurrencyLevel::Multiple`].
//! 2. Find out which processor the rank is executing on ([`Host::current_core()`]).
//! 3. Exchange that processor with every other rank, so each rank holds an identical
//!    [`CoreAffinityTable`] ([`exchange_core_affinity()`]).
//! 4. Read the frequency operating points and the current frequency of the rank's processor
//!    ([`FrequencyCapabilities::probe()`]).
//! 5. Calculate how much frequency headroom the rank could donate to its peers
//!    ([`DonationQuota::calculate()`]).
//!
//! [`StartupContext::initialize()`] runs all of these in order and returns what the rank
//! learned.
//!
//! # Example
//!
//! ```ignore
//! use freq_donation::{Host, StartupConfig, StartupContext};
//!
//! // `group` is the rank's handle to the group runtime, implementing `ProcessGroup`.
//! let config = StartupConfig::from_env()?;
//! let context = StartupContext::initialize(&config, &group, Host::current())?;
//!
//! println!(
//!     "rank {} runs on processor {}, quota {:?}",
//!     context.rank(),
//!     context.local_core(),
//!     context.donation_quota()
//! );
//! ```
//!
//! # Process groups
//!
//! The group runtime itself is outside the scope of this package. It is represented by the
//! [`ProcessGroup`] trait, which exposes the handful of collective operations the startup
//! coordination needs. With the `test-util` feature, the [`fake`] module provides an in-process
//! simulation of a process group and of the host, for testing code built on top of this package.
//!
//! # Failure model
//!
//! Invalid configuration, a failing group runtime and an unavailable processor affinity are fatal
//! and returned as [`Error`]. A failed collective operation on any rank fails the rendezvous on
//! every rank; there is no partial result.
//!
//! Problems with frequency data only affect the rank that owns the processor. They are logged as
//! warnings and the rank ends up without a [`DonationQuota`].
//!
//! # Logging
//!
//! The package emits structured events through the `tracing` facade and never installs a
//! subscriber of its own.
//!
//! # Platform support
//!
//! Processor affinity and frequency data are read from the operating system on Linux. On other
//! platforms, [`Host::current_core()`] returns [`Error::AffinityUnavailable`].

mod concurrency_level;
mod config;
mod error;
mod frequency;
mod group;
mod host;
mod primitive_types;
mod quota;
mod rendezvous;
mod startup;
mod thread_level;

#[cfg(any(test, feature = "test-util"))]
pub mod fake;

pub use concurrency_level::*;
pub use config::*;
pub use error::*;
pub use frequency::*;
pub use group::*;
pub use host::Host;
pub use primitive_types::*;
pub use quota::*;
pub use rendezvous::*;
pub use startup::*;
pub use thread_level::*;

mod pal;
