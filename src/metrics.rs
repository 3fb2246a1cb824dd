use serde::{Deserialize, Serialize};

/// Operational counters for the dispatcher loop
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Metrics {
    pub events_total: u64,
    pub commands_total: u64,
    pub commands_ok: u64,
    pub commands_rejected: u64,
    pub commands_failed: u64,
    pub cooldown_rejections: u64,
    pub permission_rejections: u64,
    pub unknown_ignored: u64,
    pub muted_dropped: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a command that completed with a normal reply
    pub fn record_ok(&mut self) {
        self.commands_total += 1;
        self.commands_ok += 1;
    }

    /// Record a command rejected by one of its own preconditions
    pub fn record_rejected(&mut self) {
        self.commands_total += 1;
        self.commands_rejected += 1;
    }

    /// Record a command that hit the handler failure boundary
    pub fn record_failed(&mut self) {
        self.commands_total += 1;
        self.commands_failed += 1;
    }

    pub fn record_cooldown_rejection(&mut self) {
        self.cooldown_rejections += 1;
    }

    pub fn record_permission_rejection(&mut self) {
        self.permission_rejections += 1;
    }

    /// Get success rate as percentage
    pub fn success_rate(&self) -> f64 {
        if self.commands_total == 0 {
            return 100.0;
        }
        (self.commands_ok as f64 / self.commands_total as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = Metrics::new();
        assert_eq!(metrics.events_total, 0);
        assert_eq!(metrics.commands_total, 0);
        assert_eq!(metrics.commands_failed, 0);
    }

    #[test]
    fn test_record_ok_and_failed() {
        let mut metrics = Metrics::new();
        metrics.record_ok();
        metrics.record_ok();
        metrics.record_failed();

        assert_eq!(metrics.commands_total, 3);
        assert_eq!(metrics.commands_ok, 2);
        assert_eq!(metrics.commands_failed, 1);
    }

    #[test]
    fn test_success_rate() {
        let mut metrics = Metrics::new();
        assert_eq!(metrics.success_rate(), 100.0);

        metrics.record_ok();
        metrics.record_ok();
        metrics.record_ok();
        metrics.record_failed();
        assert_eq!(metrics.success_rate(), 75.0);
    }

    #[test]
    fn test_metrics_serialization() {
        let mut metrics = Metrics::new();
        metrics.events_total = 10;
        metrics.record_ok();
        metrics.record_cooldown_rejection();

        let json = serde_json::to_string(&metrics).unwrap();
        let deserialized: Metrics = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.events_total, 10);
        assert_eq!(deserialized.commands_ok, 1);
        assert_eq!(deserialized.cooldown_rejections, 1);
    }
}
