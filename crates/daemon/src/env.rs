// SPDX-License-Identifier: MIT

//! Centralized environment variable access for the daemon crate (spec §4.10).

use std::path::PathBuf;
use std::time::Duration;

/// Resolve state directory: `RDT_STATE_DIR` > `$HOME/.agent-react-devtools`.
pub fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("RDT_STATE_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .map(|home| home.join(".agent-react-devtools"))
        .unwrap_or_else(|| PathBuf::from(".agent-react-devtools"))
}

/// WebSocket listen port (spec §6.4).
pub fn port() -> u16 {
    std::env::var("RDT_PORT").ok().and_then(|s| s.parse().ok()).unwrap_or(8097)
}

/// Pending-inspection deadline (spec §4.4, §5 — default 5s).
pub fn inspect_timeout() -> Duration {
    duration_ms_var("RDT_INSPECT_TIMEOUT_MS").unwrap_or(Duration::from_secs(5))
}

/// Reconnect-coalescing window for the Connection Health Tracker (spec §4.6 — default ~5s).
pub fn reconnect_window() -> Duration {
    duration_ms_var("RDT_RECONNECT_WINDOW_MS").unwrap_or(Duration::from_secs(5))
}

/// Grace window after broadcasting `stopProfiling` before finalizing a session (spec §4.4, §5 — default ~200ms).
pub fn profile_stop_grace() -> Duration {
    duration_ms_var("RDT_PROFILE_STOP_GRACE_MS").unwrap_or(Duration::from_millis(200))
}

/// Default `wait` timeout when the caller doesn't supply one (spec §5 — default 30s).
pub fn wait_default_timeout() -> Duration {
    duration_ms_var("RDT_WAIT_DEFAULT_TIMEOUT_MS").unwrap_or(Duration::from_secs(30))
}

fn duration_ms_var(name: &str) -> Option<Duration> {
    std::env::var(name).ok().and_then(|s| s.parse::<u64>().ok()).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_falls_back_to_default_when_unset_or_invalid() {
        std::env::remove_var("RDT_PORT");
        assert_eq!(port(), 8097);
    }

    #[test]
    fn inspect_timeout_defaults_to_five_seconds() {
        std::env::remove_var("RDT_INSPECT_TIMEOUT_MS");
        assert_eq!(inspect_timeout(), Duration::from_secs(5));
    }
}
