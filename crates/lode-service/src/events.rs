//! Event stream for service consumers.
//!
//! Events are advisory notifications fanned out over a broadcast channel;
//! slow subscribers may observe lag, and the authoritative state is always
//! the service itself.

use std::path::PathBuf;

/// Notifications emitted by a [`crate::GraphService`] after startup.
///
/// Readiness has no event: `GraphService::start` resolving is the signal,
/// and initial-scan failures are reported from `scan_errors` on the
/// returned service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceEvent {
    /// A watched file was loaded or reloaded into the set.
    Updated { path: PathBuf },
    /// A watched file was removed from the set.
    Removed { path: PathBuf },
    /// A reload or removal could not be applied; previous state stands
    /// unless the configured policy dropped the record.
    Error { message: String },
}
