//! An unrecognized thread level terminates the process before any rendezvous takes place.
//!
//! One test per file to enforce process isolation. The test runs itself again as a child process
//! that resolves the thread level from its environment and is expected to exit.

use std::env;
use std::process::Command;

use freq_donation::{DEFAULT_THREAD_LEVEL_VAR, StartupConfig, resolve_thread_level_or_exit};

/// Set in the child process, which runs the resolution instead of supervising it.
const CHILD_VAR: &str = "FREQ_DONATION_EXIT_CHILD";

const REACHED_RENDEZVOUS: &str = "continued to the rendezvous";

#[test]
#[cfg_attr(miri, ignore)] // Miri cannot spawn processes.
fn unrecognized_thread_level_exits_with_status_1() {
    if env::var(CHILD_VAR).as_deref() == Ok("1") {
        let config = StartupConfig::from_env().unwrap();

        let _level = resolve_thread_level_or_exit(&config);

        println!("{REACHED_RENDEZVOUS}");
        return;
    }

    let output = Command::new(env::current_exe().unwrap())
        .args([
            "--exact",
            "unrecognized_thread_level_exits_with_status_1",
            "--nocapture",
            "--test-threads=1",
        ])
        .env(CHILD_VAR, "1")
        .env(DEFAULT_THREAD_LEVEL_VAR, "THREADED")
        .output()
        .unwrap();

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(1), "stdout: {stdout}\nstderr: {stderr}");
    assert!(!stdout.contains(REACHED_RENDEZVOUS), "stdout: {stdout}");
    assert!(
        stderr.contains("unrecognized thread level 'THREADED'"),
        "stderr: {stderr}"
    );
}
