use crate::{config::AlertConfig, error::StorageError, store::SampleStore};

/// Decides whether a location's recent history warrants an alert.
///
/// The rule is evaluated afresh on every new sample, so a hot streak keeps
/// firing once per poll for as long as it lasts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertEvaluator {
    threshold_c: f64,
    consecutive_updates: usize,
}

impl AlertEvaluator {
    /// `consecutive_updates` is clamped to at least one sample.
    pub fn new(threshold_c: f64, consecutive_updates: usize) -> Self {
        Self { threshold_c, consecutive_updates: consecutive_updates.max(1) }
    }

    pub fn from_config(config: &AlertConfig) -> Self {
        Self::new(config.threshold_c, config.consecutive_updates)
    }

    pub fn threshold_c(&self) -> f64 {
        self.threshold_c
    }

    pub fn consecutive_updates(&self) -> usize {
        self.consecutive_updates
    }

    /// True iff the `consecutive_updates` most recent samples all exceed the threshold.
    pub fn should_alert(
        &self,
        store: &dyn SampleStore,
        location: &str,
    ) -> Result<bool, StorageError> {
        let recent = store.recent(location, self.consecutive_updates)?;

        if recent.len() < self.consecutive_updates {
            return Ok(false);
        }

        Ok(recent.iter().all(|s| s.temperature_c > self.threshold_c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{model::Sample, store::MemorySampleStore};
    use chrono::{Duration, TimeZone, Utc};

    fn store_with(location: &str, temps: &[f64]) -> MemorySampleStore {
        let start = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();
        let mut store = MemorySampleStore::new();
        for (i, temp) in temps.iter().enumerate() {
            let ts = start + Duration::minutes(5 * i as i64);
            store.append(&Sample::new(location, *temp, *temp, "Clear", ts)).unwrap();
        }
        store
    }

    #[test]
    fn fires_when_streak_exceeds_threshold() {
        let store = store_with("Phoenix", &[36.0, 36.0, 36.0]);
        let evaluator = AlertEvaluator::new(35.0, 3);

        assert!(evaluator.should_alert(&store, "Phoenix").unwrap());
    }

    #[test]
    fn one_cool_sample_breaks_the_streak() {
        let store = store_with("Phoenix", &[36.0, 34.0, 36.0]);
        let evaluator = AlertEvaluator::new(35.0, 3);

        assert!(!evaluator.should_alert(&store, "Phoenix").unwrap());
    }

    #[test]
    fn needs_at_least_k_samples() {
        let store = store_with("Phoenix", &[40.0, 40.0]);
        let evaluator = AlertEvaluator::new(35.0, 3);

        assert!(!evaluator.should_alert(&store, "Phoenix").unwrap());
        assert!(!evaluator.should_alert(&store, "Atlantis").unwrap());
    }

    #[test]
    fn threshold_is_strict() {
        let store = store_with("Phoenix", &[35.0, 35.0]);
        let evaluator = AlertEvaluator::new(35.0, 2);

        assert!(!evaluator.should_alert(&store, "Phoenix").unwrap());
    }

    #[test]
    fn only_the_most_recent_k_samples_count() {
        let store = store_with("Phoenix", &[20.0, 36.0, 37.0]);
        let evaluator = AlertEvaluator::new(35.0, 2);

        assert!(evaluator.should_alert(&store, "Phoenix").unwrap());
    }

    #[test]
    fn keeps_firing_while_streak_persists() {
        let mut store = store_with("Phoenix", &[36.0, 36.0]);
        let evaluator = AlertEvaluator::new(35.0, 2);
        assert!(evaluator.should_alert(&store, "Phoenix").unwrap());

        let later = Utc.with_ymd_and_hms(2024, 7, 1, 13, 0, 0).unwrap();
        store.append(&Sample::new("Phoenix", 38.0, 38.0, "Clear", later)).unwrap();
        assert!(evaluator.should_alert(&store, "Phoenix").unwrap());
    }

    #[test]
    fn zero_consecutive_updates_is_clamped() {
        let evaluator = AlertEvaluator::new(35.0, 0);
        assert_eq!(evaluator.consecutive_updates(), 1);
    }
}
