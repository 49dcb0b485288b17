//! Tick-driven loop that runs the sampling and daily summary tasks.
//!
//! Everything runs on the caller's task: a tick checks both timers and runs
//! whichever tasks are due, one after the other, to completion. A slow task
//! simply delays the next one. Failures are isolated per location.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeDelta, Utc};
use std::{future::Future, time::Duration};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
    alert::AlertEvaluator,
    error::{DeliveryError, FetchError, StorageError},
    notifier::Notifier,
    provider::WeatherProvider,
    report::{Reporter, SummaryMap},
    store::SampleStore,
    summary::{day_bounds, summarize},
};

const DEFAULT_INTERVAL: Duration = Duration::from_secs(300);
const DEFAULT_TICK: Duration = Duration::from_secs(1);

pub type Clock = Box<dyn Fn() -> DateTime<Utc>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    RunningSampleTask,
    RunningSummaryTask,
}

/// Counters for one pass of the sampling task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleCycle {
    pub fetched: usize,
    pub stored: usize,
    pub alerts_sent: usize,
    /// Locations whose pipeline stopped on an error.
    pub failures: usize,
}

/// What a single tick ended up running.
#[derive(Debug, Default)]
pub struct TickReport {
    pub sample: Option<SampleCycle>,
    pub summary: Option<SummaryMap>,
}

impl TickReport {
    pub fn is_empty(&self) -> bool {
        self.sample.is_none() && self.summary.is_none()
    }
}

#[derive(Error, Debug)]
enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

impl PipelineError {
    fn operation(&self) -> &'static str {
        match self {
            PipelineError::Fetch(_) => "fetch",
            PipelineError::Storage(_) => "store",
            PipelineError::Delivery(_) => "notify",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Task {
    Sample,
    Summary,
}

pub struct Scheduler {
    locations: Vec<String>,
    provider: Box<dyn WeatherProvider>,
    store: Box<dyn SampleStore>,
    evaluator: AlertEvaluator,
    notifier: Notifier,
    reporters: Vec<Box<dyn Reporter>>,
    interval: TimeDelta,
    summary_time: NaiveTime,
    tick_interval: Duration,
    clock: Clock,
    next_sample: Option<DateTime<Utc>>,
    next_summary: Option<DateTime<Utc>>,
    state: SchedulerState,
}

impl Scheduler {
    pub fn new(
        locations: Vec<String>,
        provider: Box<dyn WeatherProvider>,
        store: Box<dyn SampleStore>,
        evaluator: AlertEvaluator,
        notifier: Notifier,
    ) -> Self {
        Self {
            locations,
            provider,
            store,
            evaluator,
            notifier,
            reporters: Vec::new(),
            interval: to_time_delta(DEFAULT_INTERVAL),
            summary_time: NaiveTime::from_hms_opt(23, 59, 0).unwrap_or(NaiveTime::MIN),
            tick_interval: DEFAULT_TICK,
            clock: Box::new(Utc::now),
            next_sample: None,
            next_summary: None,
            state: SchedulerState::Idle,
        }
    }

    pub fn with_reporter(mut self, reporter: Box<dyn Reporter>) -> Self {
        self.reporters.push(reporter);
        self
    }

    /// Sampling period and UTC wall-clock time of the daily summary.
    pub fn with_schedule(mut self, interval: Duration, summary_time: NaiveTime) -> Self {
        self.interval = to_time_delta(interval);
        self.summary_time = summary_time;
        self
    }

    /// How long the loop sleeps between timer checks.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick_interval = tick;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn next_sample_due(&self) -> Option<DateTime<Utc>> {
        self.next_sample
    }

    pub fn next_summary_due(&self) -> Option<DateTime<Utc>> {
        self.next_summary
    }

    pub fn store(&self) -> &dyn SampleStore {
        self.store.as_ref()
    }

    /// Tick until `shutdown` resolves. A task in flight always runs to completion first.
    pub async fn run_until<F: Future<Output = ()>>(&mut self, shutdown: F) {
        tokio::pin!(shutdown);
        info!(
            locations = self.locations.len(),
            interval_secs = self.interval.num_seconds(),
            summary_time = %self.summary_time,
            "scheduler started"
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("scheduler stopping");
                    return;
                }
                _ = tokio::time::sleep(self.tick_interval) => {}
            }
            self.tick().await;
        }
    }

    /// Check both timers and run every task that is due, earliest first.
    ///
    /// The first call only arms the timers.
    pub async fn tick(&mut self) -> TickReport {
        let now = (self.clock)();
        let mut report = TickReport::default();

        let (next_sample, next_summary) = match (self.next_sample, self.next_summary) {
            (Some(sample), Some(summary)) => (sample, summary),
            _ => {
                self.arm(now);
                return report;
            }
        };

        let mut due: Vec<(DateTime<Utc>, Task)> = Vec::with_capacity(2);
        if next_sample <= now {
            due.push((next_sample, Task::Sample));
        }
        if next_summary <= now {
            due.push((next_summary, Task::Summary));
        }
        due.sort_by_key(|(at, _)| *at);

        for (at, task) in due {
            match task {
                Task::Sample => {
                    report.sample = Some(self.run_sample_task().await);
                    self.next_sample = Some(add_or_max((self.clock)(), self.interval));
                }
                Task::Summary => {
                    report.summary = Some(self.run_summary_task(at.date_naive()));
                    // Missed days are skipped, not replayed.
                    self.next_summary = Some(next_daily((self.clock)(), self.summary_time));
                }
            }
        }

        report
    }

    fn arm(&mut self, now: DateTime<Utc>) {
        let next_sample = add_or_max(now, self.interval);
        let next_summary = next_daily(now, self.summary_time);
        debug!(%next_sample, %next_summary, "timers armed");

        self.next_sample = Some(next_sample);
        self.next_summary = Some(next_summary);
    }

    /// Fetch, store and evaluate every location once. One location's failure never affects another.
    pub async fn run_sample_task(&mut self) -> SampleCycle {
        self.state = SchedulerState::RunningSampleTask;
        let mut cycle = SampleCycle::default();

        for location in &self.locations {
            let outcome = sample_location(
                self.provider.as_ref(),
                self.store.as_mut(),
                &self.evaluator,
                &self.notifier,
                location,
                &mut cycle,
            )
            .await;

            if let Err(err) = outcome {
                cycle.failures += 1;
                warn!(location = %location, operation = err.operation(), error = %err, "sampling failed");
            }
        }

        debug!(?cycle, "sample task finished");
        self.state = SchedulerState::Idle;
        cycle
    }

    /// Summarize every location's samples for `date` (UTC) and hand the result to the reporters.
    pub fn run_summary_task(&mut self, date: NaiveDate) -> SummaryMap {
        self.state = SchedulerState::RunningSummaryTask;
        let summaries = summarize_day(self.store.as_ref(), &self.locations, date, &self.reporters);
        self.state = SchedulerState::Idle;
        summaries
    }
}

/// Build the [`SummaryMap`] for `date` (UTC) from `store` and pass it to every reporter.
///
/// A location whose samples cannot be read is logged and left out. Reporter
/// failures are logged and never stop the remaining reporters.
pub fn summarize_day(
    store: &dyn SampleStore,
    locations: &[String],
    date: NaiveDate,
    reporters: &[Box<dyn Reporter>],
) -> SummaryMap {
    let (start, end) = day_bounds(date);
    let mut summaries = SummaryMap::new();

    for location in locations {
        let samples = match store.range(location, start, end) {
            Ok(samples) => samples,
            Err(err) => {
                error!(location = %location, operation = "range", error = %err, "summary skipped");
                continue;
            }
        };

        match summarize(location, &samples) {
            Some(summary) => summaries.insert(summary),
            None => {
                debug!(location = %location, %date, "no samples for summary");
            }
        }
    }

    for reporter in reporters {
        if let Err(err) = reporter.report(&summaries) {
            error!(reporter = ?reporter, error = ?err, "report failed");
        }
    }

    summaries
}

async fn sample_location(
    provider: &dyn WeatherProvider,
    store: &mut dyn SampleStore,
    evaluator: &AlertEvaluator,
    notifier: &Notifier,
    location: &str,
    cycle: &mut SampleCycle,
) -> Result<(), PipelineError> {
    let sample = provider.fetch(location).await?;
    cycle.fetched += 1;

    store.append(&sample)?;
    cycle.stored += 1;

    info!(
        location,
        temp_c = sample.temperature_c,
        feels_like_c = sample.feels_like_c,
        condition = %sample.condition,
        timestamp = %sample.timestamp,
        "sample recorded"
    );

    if evaluator.should_alert(store, location)? {
        warn!(
            location,
            temp_c = sample.temperature_c,
            threshold_c = evaluator.threshold_c(),
            "temperature above threshold"
        );
        notifier.notify(location, sample.temperature_c).await?;
        cycle.alerts_sent += 1;
    }

    Ok(())
}

fn to_time_delta(duration: Duration) -> TimeDelta {
    TimeDelta::from_std(duration).unwrap_or(TimeDelta::MAX)
}

fn add_or_max(at: DateTime<Utc>, delta: TimeDelta) -> DateTime<Utc> {
    at.checked_add_signed(delta).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// First occurrence of `time` (UTC) strictly after `after`.
fn next_daily(after: DateTime<Utc>, time: NaiveTime) -> DateTime<Utc> {
    let candidate = after.date_naive().and_time(time).and_utc();
    if candidate > after {
        candidate
    } else {
        candidate.checked_add_days(Days::new(1)).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}
