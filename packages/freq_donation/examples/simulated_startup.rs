//! Runs the startup coordination of a simulated process group on the real host.
//!
//! Every rank runs on its own thread of this process, so the ranks see whichever processors the
//! operating system happens to schedule those threads on. The configuration is read from the
//! `FREQ_DONATION_*` environment variables, e.g. `FREQ_DONATION_RENDEZVOUS=all-gather` or
//! `FREQ_DONATION_ASYNC_PROGRESS=1`.
//!
//! Usage: `cargo run --example simulated_startup --features test-util [-- <rank count>]`

use std::env;
use std::num::NonZero;
use std::process::ExitCode;
use std::thread;

use freq_donation::fake::GroupBuilder;
use freq_donation::{GroupSize, Host, StartupConfig, StartupContext};
use tracing::Level;

const DEFAULT_RANK_COUNT: GroupSize = 4;

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_max_level(Level::DEBUG).init();

    let rank_count = env::args()
        .nth(1)
        .and_then(|arg| arg.parse::<GroupSize>().ok())
        .and_then(NonZero::new)
        .unwrap_or(NonZero::new(DEFAULT_RANK_COUNT).expect("default rank count is non-zero"));

    let config = match StartupConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    println!(
        "Starting {rank_count} ranks (thread level {}, async progress {}, {} rendezvous)",
        config.thread_level_name(),
        config.is_async_progress_requested(),
        config.strategy()
    );

    let ranks = GroupBuilder::new(rank_count).build();

    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = ranks
            .iter()
            .map(|rank| {
                let config = &config;
                scope.spawn(move || StartupContext::initialize(config, rank, Host::current()))
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| handle.join().expect("rank thread panicked"))
            .collect()
    });

    let mut exit_code = ExitCode::SUCCESS;

    for (rank, result) in results.into_iter().enumerate() {
        match result {
            Ok(context) => {
                println!(
                    "rank {rank}: granted {}, processor {}, table {:?}, operating points {:?}",
                    context.granted_level(),
                    context.local_core(),
                    context.core_affinity().as_slice(),
                    context.frequency_capabilities().operating_points()
                );

                match context.donation_quota() {
                    Some(quota) => println!("rank {rank}: donation quota {quota}"),
                    None => println!("rank {rank}: no donation quota"),
                }
            }
            Err(e) => {
                println!("rank {rank}: startup failed: {e}");
                exit_code = ExitCode::FAILURE;
            }
        }
    }

    exit_code
}
