use std::time::{Duration, SystemTime};

/// Instant at which an entry written at `now` with `ttl` stops being served
pub(crate) fn expiry_after(now: SystemTime, ttl: Duration) -> SystemTime {
    now.checked_add(ttl).unwrap_or(now)
}

/// Whole seconds left before `expires_at`, or `None` once it has passed
pub(crate) fn remaining_secs(expires_at: SystemTime, now: SystemTime) -> Option<u64> {
    if now >= expires_at {
        return None;
    }
    expires_at.duration_since(now).ok().map(|d| d.as_secs())
}
