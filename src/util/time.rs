//! Time utilities

use std::time::{Duration, Instant};

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Movement integration and position push interval
pub const MOVEMENT_TICK: Duration = Duration::from_millis(50);
/// Opponent poll interval while waiting for their attacks
pub const BATTLE_POLL_TICK: Duration = Duration::from_millis(250);
