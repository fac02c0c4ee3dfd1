//! Watch driver: poll in the background, block until reclaimed.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::client::{DEFAULT_TIMEOUT, MetadataClient};
use crate::detector::{DEFAULT_BASE_URL, Detector, DetectorKind, Notice};
use crate::error::WatchError;
use crate::notifier::Notifier;
use crate::poller::{AfterFire, DEFAULT_INTERVAL, Poller};

/// How often the blocked primary thread looks at the interrupt flag
const WAIT_SLICE: Duration = Duration::from_millis(250);

/// Watcher settings
#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub kind: DetectorKind,
    pub base_url: String,
    pub interval: Duration,
    pub timeout: Duration,
    pub after_fire: AfterFire,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            kind: DetectorKind::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
            interval: DEFAULT_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            after_fire: AfterFire::default(),
        }
    }
}

/// Why the watcher returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exit {
    /// The instance is being reclaimed
    Terminating(Notice),
    /// Operator signal before any termination notice
    Interrupted,
}

impl Exit {
    /// Process exit status: 1 when reclaimed, 130 when interrupted
    pub fn code(&self) -> u8 {
        match self {
            Self::Terminating(_) => 1,
            Self::Interrupted => 130,
        }
    }
}

/// Start polling and block until a termination notice arrives or `interrupted` is set.
///
/// The poller starts before this thread blocks, so a notice raised early is
/// never missed.
pub fn watch(config: &WatchConfig, interrupted: &AtomicBool) -> Result<Exit, WatchError> {
    let client = MetadataClient::new(config.timeout)?;
    let detector = Detector::new(config.kind, client, &config.base_url);
    log::info!(
        "Watching {} every {:?} (timeout {:?})",
        detector.url(),
        config.interval,
        config.timeout
    );

    let notifier = Arc::new(Notifier::new());
    let poller = Poller::new(detector, config.interval, notifier.clone())
        .after_fire(config.after_fire)
        .spawn()?;
    log::info!("Initialized");

    loop {
        if let Some(notice) = notifier.wait_timeout(WAIT_SLICE) {
            log::warn!("Termination notice received: {notice}");
            // Don't wait for an in-flight check; the process is about to exit
            poller.cancel();
            return Ok(Exit::Terminating(notice));
        }
        if interrupted.load(Ordering::Relaxed) {
            log::info!("Interrupted, stopping watcher");
            let stats = poller.stop();
            log::debug!("{} ticks, {} errors", stats.ticks, stats.errors);
            return Ok(Exit::Interrupted);
        }
    }
}
