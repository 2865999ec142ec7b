use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkEvent {
    Healthy,
    /// The timeout has just elapsed.
    Lost,
    /// Still no traffic since the link was lost.
    StillLost,
    /// Traffic resumed after a loss.
    Restored,
}

/// Watches the time since the last accepted byte. Driven by the poll tick, never self-timed.
#[derive(Debug)]
pub struct LivenessMonitor {
    timeout_ms: u64,
    last_rx_time: u64,
    error_active: bool,
}

impl LivenessMonitor {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            timeout_ms,
            last_rx_time: 0,
            error_active: false,
        }
    }

    pub fn record_activity(&mut self, current_time: u64) {
        self.last_rx_time = current_time;
    }

    pub fn evaluate(&mut self, current_time: u64) -> LinkEvent {
        let timed_out = current_time > self.last_rx_time.saturating_add(self.timeout_ms);

        match (timed_out, self.error_active) {
            (true, false) => {
                self.error_active = true;
                LinkEvent::Lost
            }
            (true, true) => LinkEvent::StillLost,
            (false, true) => {
                self.error_active = false;
                LinkEvent::Restored
            }
            (false, false) => LinkEvent::Healthy,
        }
    }

    pub fn has_error(&self) -> bool {
        self.error_active
    }

    pub fn silence_ms(&self, current_time: u64) -> u64 {
        current_time.saturating_sub(self.last_rx_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_and_recovery() {
        let mut monitor = LivenessMonitor::new(10_000);

        assert_eq!(monitor.evaluate(5_000), LinkEvent::Healthy);
        assert_eq!(monitor.evaluate(10_000), LinkEvent::Healthy);
        assert_eq!(monitor.evaluate(10_001), LinkEvent::Lost);
        assert!(monitor.has_error());
        assert_eq!(monitor.evaluate(12_000), LinkEvent::StillLost);

        monitor.record_activity(12_050);
        assert_eq!(monitor.evaluate(12_100), LinkEvent::Restored);
        assert!(!monitor.has_error());
        assert_eq!(monitor.evaluate(12_150), LinkEvent::Healthy);
    }
}
