//! Running production counters.
//!
//! A pure fold over terminal task outcomes. Derived metrics are computed
//! on read and never stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregated production counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsData {
    pub total_generated: u64,
    pub total_success: u64,
    pub total_failed: u64,
    pub total_characters: u64,
    pub total_words: u64,
    /// Wall-clock time of successful productions.
    pub total_processing_time_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reset_at: Option<DateTime<Utc>>,
}

/// One terminal task outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub success: bool,
    pub characters: u64,
    pub words: u64,
    pub processing_time_ms: u64,
}

impl AnalyticsData {
    /// Fold one completion attempt into the counters.
    ///
    /// Character and word counts are added for every attempt; processing
    /// time only for successes, so the mean reflects finished productions.
    pub fn record(&mut self, outcome: Outcome) {
        self.total_generated += 1;
        self.total_characters += outcome.characters;
        self.total_words += outcome.words;
        if outcome.success {
            self.total_success += 1;
            self.total_processing_time_ms += outcome.processing_time_ms;
        } else {
            self.total_failed += 1;
        }
    }

    /// Successes over attempts, in `[0, 1]`; 0 with no attempts.
    pub fn success_rate(&self) -> f64 {
        if self.total_generated == 0 {
            return 0.0;
        }
        self.total_success as f64 / self.total_generated as f64
    }

    /// Mean seconds per successful production; 0 with no successes.
    pub fn mean_processing_time_secs(&self) -> f64 {
        if self.total_success == 0 {
            return 0.0;
        }
        self.total_processing_time_ms as f64 / self.total_success as f64 / 1000.0
    }

    /// Zero every counter.
    pub fn reset(&mut self) {
        *self = Self {
            last_reset_at: Some(Utc::now()),
            ..Self::default()
        };
        tracing::info!("Analytics counters reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(success: bool, characters: u64, ms: u64) -> Outcome {
        Outcome {
            success,
            characters,
            words: characters / 5,
            processing_time_ms: ms,
        }
    }

    #[test]
    fn empty_counters_derive_zero() {
        let data = AnalyticsData::default();
        assert_eq!(data.success_rate(), 0.0);
        assert_eq!(data.mean_processing_time_secs(), 0.0);
    }

    #[test]
    fn one_success_one_failure() {
        let mut data = AnalyticsData::default();
        data.record(outcome(true, 1000, 1200));
        data.record(outcome(false, 50, 300));

        assert_eq!(data.total_generated, 2);
        assert_eq!(data.total_success, 1);
        assert_eq!(data.total_failed, 1);
        assert_eq!(data.total_characters, 1050);
        assert_eq!(data.success_rate(), 0.5);
        assert!((data.mean_processing_time_secs() - 1.2).abs() < 1e-9);
    }

    #[test]
    fn only_failures_have_no_mean() {
        let mut data = AnalyticsData::default();
        data.record(outcome(false, 10, 900));
        assert_eq!(data.success_rate(), 0.0);
        assert_eq!(data.mean_processing_time_secs(), 0.0);
    }

    #[test]
    fn reset_zeroes_and_stamps() {
        let mut data = AnalyticsData::default();
        data.record(outcome(true, 10, 100));
        data.reset();

        assert_eq!(data.total_generated, 0);
        assert_eq!(data.total_characters, 0);
        assert!(data.last_reset_at.is_some());
    }

    #[test]
    fn serializes_counters() {
        let mut data = AnalyticsData::default();
        data.record(outcome(true, 20, 250));
        let json = serde_json::to_string(&data).unwrap();
        let back: AnalyticsData = serde_json::from_str(&json).unwrap();
        assert_eq!(back, data);
        assert!(!json.contains("last_reset_at"));
    }
}
