//! Fixed-interval polling loop on a dedicated thread.
//!
//! Ticks never overlap: the next check is scheduled only after the current
//! one returns. A check that overruns skips the missed ticks rather than
//! firing back-to-back. Per-tick errors are logged and polling continues.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::detector::{Decision, Detector, Notice};
use crate::notifier::Notifier;

/// Time between checks
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// What the loop does after the first terminating decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AfterFire {
    /// Exit the loop once the notifier is raised
    #[default]
    Stop,
    /// Keep polling; repeat detections are no-ops
    Continue,
}

/// Counters reported when the loop ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    pub ticks: u64,
    pub errors: u64,
    /// This poller raised the notifier
    pub fired: bool,
}

/// Next tick deadline after `prev`, skipping any already in the past.
pub fn next_deadline(prev: Instant, interval: Duration, now: Instant) -> Instant {
    let next = prev + interval;
    if next > now || interval.is_zero() {
        return next.max(now);
    }
    let behind = now.duration_since(next);
    let skipped = behind.as_nanos() / interval.as_nanos() + 1;
    // Bounded by `behind / interval`, fits comfortably in u32 for sane intervals
    next + interval * u32::try_from(skipped).unwrap_or(u32::MAX)
}

pub struct Poller {
    detector: Detector,
    interval: Duration,
    notifier: Arc<Notifier<Notice>>,
    after_fire: AfterFire,
}

impl Poller {
    pub fn new(detector: Detector, interval: Duration, notifier: Arc<Notifier<Notice>>) -> Self {
        Self {
            detector,
            interval,
            notifier,
            after_fire: AfterFire::default(),
        }
    }

    pub fn after_fire(mut self, policy: AfterFire) -> Self {
        self.after_fire = policy;
        self
    }

    /// Run one check. Returns `true` if the decision was terminating.
    pub fn tick(&self, stats: &mut PollStats) -> bool {
        stats.ticks += 1;
        match self.detector.check() {
            Ok(Decision::NotTerminating) => {
                log::debug!("tick {}: not terminating", stats.ticks);
                false
            }
            Ok(Decision::Terminating(notice)) => {
                if self.notifier.raise(notice.clone()) {
                    log::warn!("Termination scheduled: {notice}");
                    stats.fired = true;
                } else {
                    log::debug!("tick {}: termination still scheduled ({notice})", stats.ticks);
                }
                true
            }
            Err(e) => {
                stats.errors += 1;
                log::warn!("{} check failed: {e}", self.detector.kind());
                false
            }
        }
    }

    /// Poll until `stop` is raised (or the first termination, with [`AfterFire::Stop`]).
    ///
    /// The first check runs immediately.
    pub fn run(&self, stop: &Notifier) -> PollStats {
        let mut stats = PollStats::default();
        let mut deadline = Instant::now();

        while !stop.is_raised() {
            let terminating = self.tick(&mut stats);
            if terminating && self.after_fire == AfterFire::Stop {
                break;
            }

            let now = Instant::now();
            deadline = next_deadline(deadline, self.interval, now);
            if stop.wait_timeout(deadline - now).is_some() {
                break;
            }
        }

        log::debug!(
            "poller stopped after {} ticks ({} errors)",
            stats.ticks,
            stats.errors
        );
        stats
    }

    /// Start the loop on its own thread.
    pub fn spawn(self) -> std::io::Result<PollerHandle> {
        let stop = Arc::new(Notifier::new());
        let thread_stop = stop.clone();
        let thread = std::thread::Builder::new()
            .name("spotwatch-poller".to_string())
            .spawn(move || self.run(&thread_stop))?;
        Ok(PollerHandle { stop, thread })
    }
}

/// Handle to a running poller thread
pub struct PollerHandle {
    stop: Arc<Notifier>,
    thread: JoinHandle<PollStats>,
}

impl PollerHandle {
    /// Cancel the next tick without waiting. An in-flight check completes.
    pub fn cancel(&self) {
        self.stop.raise(());
    }

    /// Cancel and wait for the loop to exit.
    pub fn stop(self) -> PollStats {
        self.cancel();
        self.join()
    }

    /// Wait for the loop to exit on its own.
    pub fn join(self) -> PollStats {
        self.thread.join().unwrap_or_else(|_| {
            log::error!("poller thread panicked");
            PollStats::default()
        })
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEC: Duration = Duration::from_secs(1);

    #[test]
    fn next_deadline_on_time() {
        let start = Instant::now();
        let now = start + Duration::from_millis(200);
        assert_eq!(next_deadline(start, SEC, now), start + SEC);
    }

    #[test]
    fn next_deadline_skips_missed_ticks() {
        let start = Instant::now();
        // Check overran by 2.5 intervals
        let now = start + Duration::from_millis(2500);
        assert_eq!(next_deadline(start, SEC, now), start + 3 * SEC);
    }

    #[test]
    fn next_deadline_exact_boundary_skips() {
        let start = Instant::now();
        let now = start + SEC;
        assert_eq!(next_deadline(start, SEC, now), start + 2 * SEC);
    }

    #[test]
    fn next_deadline_zero_interval_never_in_past() {
        let start = Instant::now();
        let now = start + Duration::from_millis(10);
        assert_eq!(next_deadline(start, Duration::ZERO, now), now);
    }

    #[test]
    fn after_fire_defaults_to_stop() {
        assert_eq!(AfterFire::default(), AfterFire::Stop);
    }
}
