//! Core library for the `weather-monitor` service.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Weather providers that normalize observations into samples
//! - The append-only sample store
//! - Alert evaluation and notification delivery
//! - Daily summaries and their reporters
//! - The scheduler loop tying it all together
//!
//! It is used by `weather-monitor`, but can also be reused by other binaries or services.

pub mod alert;
pub mod config;
pub mod error;
pub mod model;
pub mod notifier;
pub mod provider;
pub mod report;
pub mod scheduler;
pub mod store;
pub mod summary;

pub use alert::AlertEvaluator;
pub use config::{AlertConfig, Config, NotifierConfig, ProviderConfig, SummaryConfig};
pub use error::{DeliveryError, FetchError, StorageError};
pub use model::{DailySummary, Sample};
pub use notifier::{LogChannel, MessageChannel, Notifier, RelayChannel};
pub use provider::{ProviderId, WeatherProvider};
pub use report::{ChartReporter, LogReporter, Reporter, SummaryMap};
pub use scheduler::{SampleCycle, Scheduler, SchedulerState, TickReport, summarize_day};
pub use store::{MemorySampleStore, SampleStore, SqliteSampleStore};
pub use summary::summarize;
