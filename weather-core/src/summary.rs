use chrono::{DateTime, Days, NaiveDate, Utc};
use std::collections::HashMap;

use crate::model::{DailySummary, Sample};

/// Aggregate `samples` into a daily summary for `location`.
///
/// Returns `None` when there is nothing to aggregate. The dominant condition
/// is the most frequent label; ties go to the label seen first.
pub fn summarize(location: &str, samples: &[Sample]) -> Option<DailySummary> {
    if samples.is_empty() {
        return None;
    }

    let temps = samples.iter().map(|s| s.temperature_c);
    let total: f64 = temps.clone().sum();
    let max = temps.clone().fold(f64::NEG_INFINITY, f64::max);
    let min = temps.fold(f64::INFINITY, f64::min);

    Some(DailySummary {
        location: location.to_string(),
        avg_temp_c: total / samples.len() as f64,
        max_temp_c: max,
        min_temp_c: min,
        dominant_condition: dominant_condition(samples)?,
    })
}

fn dominant_condition(samples: &[Sample]) -> Option<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut first_seen: Vec<&str> = Vec::new();

    for sample in samples {
        let count = counts.entry(sample.condition.as_str()).or_insert(0);
        if *count == 0 {
            first_seen.push(sample.condition.as_str());
        }
        *count += 1;
    }

    let mut best: Option<(&str, usize)> = None;
    for label in first_seen {
        let count = counts[label];
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((label, count));
        }
    }

    best.map(|(label, _)| label.to_string())
}

/// Half-open UTC bounds `[00:00, next 00:00)` of `date`.
pub fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_time(chrono::NaiveTime::MIN).and_utc();
    let end = start.checked_add_days(Days::new(1)).unwrap_or(DateTime::<Utc>::MAX_UTC);
    (start, end)
}
