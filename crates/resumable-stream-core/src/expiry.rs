//! Session expiration policy.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::Session;

/// Current Unix time in seconds.
#[must_use]
pub fn now_epoch() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Whether a session has been idle for longer than `threshold_secs`.
///
/// Idle time equal to the threshold is still valid.
#[must_use]
pub const fn is_expired(session: &Session, now_epoch: i64, threshold_secs: i64) -> bool {
    now_epoch.saturating_sub(session.last_activity_epoch) > threshold_secs
}
