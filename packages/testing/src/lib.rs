#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))] // This is all test code, no need to test it.

//! Private helpers for tests, benchmarks and examples in the workspace.

use std::panic;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// Runs a test on a separate thread and fails it if it does not finish in time.
///
/// Collective operations block until every participant arrives, so a bug in a multi-rank test
/// tends to hang instead of fail. The watchdog turns such a hang into a panic after 10 seconds
/// (60 seconds under Miri).
///
/// Setting the `MUTATION_TESTING` environment variable to `1` disables the watchdog and runs the
/// test directly, so that mutation testing can detect mutations that cause hangs.
///
/// # Panics
///
/// Panics if the test does not finish in time. A panic of the test itself is propagated.
///
/// # Example
///
/// ```rust
/// use testing::with_watchdog;
///
/// let answer = with_watchdog(|| 6 * 7);
/// assert_eq!(answer, 42);
/// ```
#[cfg_attr(test, mutants::skip)] // Mutating the timeout only changes how long a hang takes.
pub fn with_watchdog<F, R>(test_fn: F) -> R
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    if std::env::var("MUTATION_TESTING").as_deref() == Ok("1") {
        return test_fn();
    }

    let timeout = if cfg!(miri) {
        Duration::from_secs(60)
    } else {
        Duration::from_secs(10)
    };

    let (tx, rx) = mpsc::channel();

    let handle = thread::spawn(move || {
        // The receiver is gone if the watchdog already fired.
        drop(tx.send(test_fn()));
    });

    match rx.recv_timeout(timeout) {
        Ok(result) => {
            handle.join().expect("test thread already delivered its result");
            result
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            panic!("test did not finish within {} seconds", timeout.as_secs())
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => match handle.join() {
            Ok(()) => panic!("test thread exited without a result"),
            Err(payload) => panic::resume_unwind(payload),
        },
    }
}

/// Runs `f` once for each item, every call on its own thread, and returns the results in item
/// order.
///
/// Intended for simulated process groups, where each item is the handle of one rank and all
/// ranks must run concurrently for their collective operations to complete.
///
/// # Panics
///
/// If any call panics, the panic is propagated after all threads have finished.
///
/// # Example
///
/// ```rust
/// use testing::run_ranks;
///
/// let doubled = run_ranks(vec![1, 2, 3], |n| n * 2);
/// assert_eq!(doubled, vec![2, 4, 6]);
/// ```
pub fn run_ranks<T, R, F>(items: Vec<T>, f: F) -> Vec<R>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Sync,
{
    let f = &f;

    thread::scope(|scope| {
        let handles: Vec<_> = items
            .into_iter()
            .map(|item| scope.spawn(move || f(item)))
            .collect();

        let outcomes: Vec<_> = handles.into_iter().map(|h| h.join()).collect();

        outcomes
            .into_iter()
            .map(|outcome| outcome.unwrap_or_else(|payload| panic::resume_unwind(payload)))
            .collect()
    })
}
