//! Fixed-interval driver.
//!
//! The next run is due one interval after the previous run finished. Runs
//! are executed on the calling thread, so a slow run pushes the next tick
//! back rather than overlapping it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Longest sleep between shutdown-flag checks.
const POLL_GRANULARITY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    interval: Duration,
    run_immediately: bool,
}

impl Scheduler {
    pub fn new(interval: Duration, run_immediately: bool) -> Self {
        Self {
            interval,
            run_immediately,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Invoke `job` every interval until `shutdown` is set or `max_ticks`
    /// jobs have run. Returns the number of jobs run.
    pub fn run<F>(&self, shutdown: &AtomicBool, max_ticks: Option<u64>, mut job: F) -> u64
    where
        F: FnMut(u64),
    {
        let mut ticks = 0u64;
        let mut next_due = if self.run_immediately {
            Instant::now()
        } else {
            Instant::now() + self.interval
        };

        tracing::info!(
            interval_secs = self.interval.as_secs_f64(),
            run_immediately = self.run_immediately,
            "scheduler started"
        );

        loop {
            if max_ticks.is_some_and(|max| ticks >= max) {
                break;
            }
            if !self.sleep_until(next_due, shutdown) {
                tracing::info!(ticks, "shutdown requested; scheduler stopping");
                break;
            }

            ticks += 1;
            tracing::info!(tick = ticks, "job started");
            job(ticks);
            next_due = Instant::now() + self.interval;
        }

        ticks
    }

    /// Sleep until `deadline`, waking periodically to check `shutdown`.
    /// Returns false if shutdown was requested.
    fn sleep_until(&self, deadline: Instant, shutdown: &AtomicBool) -> bool {
        let step = POLL_GRANULARITY.min(self.interval.max(Duration::from_millis(1)));
        loop {
            if shutdown.load(Ordering::SeqCst) {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep(step.min(deadline - now));
        }
    }
}
