use std::time::Duration;

/// Configuration constructed programmatically by the embedding application.
/// Mirrors how `database::DatabaseConnectionInfo::from_env` is a concern of
/// the binary wiring things together rather than of the library crate: this
/// type has no env/file loader of its own.
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// Minimum interval between commits. `Duration::ZERO` means "commit on
    /// every batch".
    pub max_snapshot_frequency: Duration,
    /// If true, purge timetables for dates strictly before "today" (by
    /// wall-clock date) at every commit. Defaults to false.
    pub purge_expired_data: bool,
    pub backwards_delay_propagation: BackwardsDelayPropagation,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            max_snapshot_frequency: Duration::ZERO,
            purge_expired_data: false,
            backwards_delay_propagation: BackwardsDelayPropagation::RequiredNoData,
        }
    }
}

/// Policy for propagating a known later delay backwards onto an earlier
/// stop-time update in the same trip that lacks data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackwardsDelayPropagation {
    /// Propagate only onto stops explicitly marked "no data".
    RequiredNoData,
    /// Propagate onto any stop missing a concrete time.
    Required,
    /// Additionally overwrite stops that already carry a scheduled time.
    Always,
}
