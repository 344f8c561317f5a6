use std::time::{Duration, Instant};

/// Runs `f` once and logs how long it took.
pub fn timed<T>(operation: &'static str, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let result = f();
    log_elapsed(operation, start.elapsed(), 1);
    result
}

/// Runs `f` `iterations` times (at least once), logs the average run time and
/// returns the result of the last run.
pub fn timed_average<T>(operation: &'static str, iterations: u32, mut f: impl FnMut() -> T) -> T {
    let iterations = iterations.max(1);
    let start = Instant::now();
    let mut result = f();
    for _ in 1..iterations {
        result = f();
    }
    log_elapsed(operation, start.elapsed() / iterations, iterations);
    result
}

fn elapsed_micros(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX)
}

fn log_elapsed(operation: &'static str, elapsed: Duration, iterations: u32) {
    tracing::info!(
        operation,
        iterations,
        elapsed_us = elapsed_micros(elapsed),
        "finished"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timed_returns_the_closure_result() {
        assert_eq!(timed("sum", || 2 + 2), 4);
    }

    #[test]
    fn elapsed_micros_saturate_instead_of_wrapping() {
        assert_eq!(elapsed_micros(Duration::MAX), u64::MAX);
        assert_eq!(elapsed_micros(Duration::from_millis(3)), 3_000);
    }

    #[test]
    fn timed_average_runs_at_least_once() {
        let mut calls = 0;
        let last = timed_average("count", 0, || {
            calls += 1;
            calls
        });
        assert_eq!(calls, 1);
        assert_eq!(last, 1);

        let mut calls = 0;
        let last = timed_average("count", 3, || {
            calls += 1;
            calls
        });
        assert_eq!(calls, 3);
        assert_eq!(last, 3);
    }
}
