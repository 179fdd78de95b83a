use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

/// Keep-alive frame sent while the connection is open.
pub const PING_FRAME: &str = r#"{"type":"ping"}"#;

/// Periodic keep-alive emitter for a live connection.
///
/// The monitor only paces pings; it does not wait for a reply. A missing
/// pong is not a failure — liveness detection belongs to the transport's own
/// close and error events. Each connection session owns exactly one monitor,
/// dropped when the session ends, so at most one heartbeat timer is armed at
/// any time.
pub struct HeartbeatMonitor {
    interval: Interval,
}

impl HeartbeatMonitor {
    /// Arm a monitor whose first ping fires one full period from now.
    #[must_use]
    pub fn new(period: Duration) -> Self {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }

    /// Wait for the next ping to be due.
    pub async fn tick(&mut self) {
        self.interval.tick().await;
    }

    /// The control frame to put on the wire.
    #[must_use]
    pub const fn frame() -> &'static str {
        PING_FRAME
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn ping_frame_is_the_expected_control_message() {
        let value: serde_json::Value = serde_json::from_str(HeartbeatMonitor::frame()).unwrap();
        assert_eq!(value, json!({"type": "ping"}));
    }

    #[tokio::test(start_paused = true)]
    async fn first_ping_fires_after_one_full_period() {
        let mut monitor = HeartbeatMonitor::new(Duration::from_secs(20));

        let early = tokio::time::timeout(Duration::from_secs(19), monitor.tick()).await;
        assert!(early.is_err(), "ping must not fire before the period elapses");

        let due = tokio::time::timeout(Duration::from_secs(2), monitor.tick()).await;
        assert!(due.is_ok(), "ping must fire once the period elapses");
    }
}
