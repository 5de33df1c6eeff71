//! Process-wide counters for sessions, output delivery and money movement.
//! Read them with [`snapshot`]; the server logs a snapshot on shutdown.
use std::sync::atomic::{AtomicU64, Ordering};

static SESSIONS_JOINED: AtomicU64 = AtomicU64::new(0);
static SESSIONS_LEFT: AtomicU64 = AtomicU64::new(0);
static SESSIONS_ACTIVE: AtomicU64 = AtomicU64::new(0);
static SESSIONS_PEAK: AtomicU64 = AtomicU64::new(0);
static BROADCASTS: AtomicU64 = AtomicU64::new(0);
static LINES_DELIVERED: AtomicU64 = AtomicU64::new(0);
static LINES_DROPPED: AtomicU64 = AtomicU64::new(0);
static TRANSFERS_COMPLETED: AtomicU64 = AtomicU64::new(0);
static TRANSFERS_REJECTED: AtomicU64 = AtomicU64::new(0);

pub fn inc_sessions_joined() {
    SESSIONS_JOINED.fetch_add(1, Ordering::Relaxed);
    let active = SESSIONS_ACTIVE.fetch_add(1, Ordering::Relaxed) + 1;
    SESSIONS_PEAK.fetch_max(active, Ordering::Relaxed);
}

pub fn inc_sessions_left() {
    SESSIONS_LEFT.fetch_add(1, Ordering::Relaxed);
    let _ = SESSIONS_ACTIVE.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
        Some(n.saturating_sub(1))
    });
}

pub fn inc_broadcasts() {
    BROADCASTS.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_lines_delivered() {
    LINES_DELIVERED.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_lines_dropped() {
    LINES_DROPPED.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_transfers_completed() {
    TRANSFERS_COMPLETED.fetch_add(1, Ordering::Relaxed);
}

pub fn inc_transfers_rejected() {
    TRANSFERS_REJECTED.fetch_add(1, Ordering::Relaxed);
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub sessions_joined: u64,
    pub sessions_left: u64,
    pub sessions_active: u64,
    pub sessions_peak: u64,
    pub broadcasts: u64,
    pub lines_delivered: u64,
    pub lines_dropped: u64,
    pub transfers_completed: u64,
    pub transfers_rejected: u64,
}

pub fn snapshot() -> Snapshot {
    Snapshot {
        sessions_joined: SESSIONS_JOINED.load(Ordering::Relaxed),
        sessions_left: SESSIONS_LEFT.load(Ordering::Relaxed),
        sessions_active: SESSIONS_ACTIVE.load(Ordering::Relaxed),
        sessions_peak: SESSIONS_PEAK.load(Ordering::Relaxed),
        broadcasts: BROADCASTS.load(Ordering::Relaxed),
        lines_delivered: LINES_DELIVERED.load(Ordering::Relaxed),
        lines_dropped: LINES_DROPPED.load(Ordering::Relaxed),
        transfers_completed: TRANSFERS_COMPLETED.load(Ordering::Relaxed),
        transfers_rejected: TRANSFERS_REJECTED.load(Ordering::Relaxed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Counters are global and other tests run in parallel, so only check
    // monotonic movement.
    #[test]
    fn counters_only_move_forward() {
        let before = snapshot();
        inc_sessions_joined();
        inc_transfers_rejected();
        inc_lines_dropped();
        let after = snapshot();
        assert!(after.sessions_joined > before.sessions_joined);
        assert!(after.transfers_rejected > before.transfers_rejected);
        assert!(after.lines_dropped > before.lines_dropped);
        assert!(after.sessions_peak >= 1);
    }
}
