//! Spotwatch Core - Spot instance termination detection
//!
//! This crate polls the instance metadata service for a pending
//! reclamation notice and latches the first one it sees so the
//! hosting process can react before the instance goes away.

pub mod client;
pub mod detector;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod notifier;
pub mod poller;
pub mod shutdown;

// Re-exports for convenience
pub use client::{DEFAULT_TIMEOUT, MetadataClient, MetadataResponse};
pub use detector::{
    DEFAULT_BASE_URL, Decision, Detector, DetectorKind, InstanceAction, Notice, ProbeResult,
};
pub use error::{DetectError, FetchError, WatchError};
pub use lifecycle::{Exit, WatchConfig, watch};
pub use logging::init_logging;
pub use notifier::Notifier;
pub use poller::{AfterFire, DEFAULT_INTERVAL, PollStats, Poller, PollerHandle};
pub use shutdown::{install_signal_handlers, is_shutdown_requested, request_shutdown, shutdown_flag};
