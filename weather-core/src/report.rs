//! Presentation of daily summaries.

use anyhow::{Context, Result, anyhow};
use plotters::prelude::*;
use std::{fmt::Debug, fs, path::PathBuf};
use tracing::info;

use crate::model::DailySummary;

/// Daily summaries keyed by location, in the order they were produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryMap {
    entries: Vec<DailySummary>,
}

impl SummaryMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the summary for `summary.location`.
    pub fn insert(&mut self, summary: DailySummary) {
        match self.entries.iter_mut().find(|s| s.location == summary.location) {
            Some(existing) => *existing = summary,
            None => self.entries.push(summary),
        }
    }

    pub fn get(&self, location: &str) -> Option<&DailySummary> {
        self.entries.iter().find(|s| s.location == location)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DailySummary> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub trait Reporter: Debug {
    fn report(&self, summaries: &SummaryMap) -> Result<()>;
}

/// One log line per location.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&self, summaries: &SummaryMap) -> Result<()> {
        if summaries.is_empty() {
            info!("no samples recorded today, nothing to summarize");
        }

        for s in summaries.iter() {
            info!(
                location = %s.location,
                avg = s.avg_temp_c,
                max = s.max_temp_c,
                min = s.min_temp_c,
                condition = %s.dominant_condition,
                "daily summary"
            );
        }
        Ok(())
    }
}

/// Line chart of average, maximum and minimum temperature per location, written as PNG.
#[derive(Debug, Clone)]
pub struct ChartReporter {
    path: PathBuf,
    size: (u32, u32),
}

type SeriesSpec = (&'static str, RGBColor, fn(&DailySummary) -> f64);

const SERIES: [SeriesSpec; 3] =
    [("Average Temp", BLUE, avg_temp), ("Max Temp", RED, max_temp), ("Min Temp", GREEN, min_temp)];

fn avg_temp(s: &DailySummary) -> f64 {
    s.avg_temp_c
}

fn max_temp(s: &DailySummary) -> f64 {
    s.max_temp_c
}

fn min_temp(s: &DailySummary) -> f64 {
    s.min_temp_c
}

impl ChartReporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), size: (1000, 600) }
    }

    fn draw(&self, summaries: &SummaryMap) -> Result<()> {
        let names: Vec<&str> = summaries.iter().map(|s| s.location.as_str()).collect();
        let (low, high) = temperature_range(summaries);

        let root = BitMapBackend::new(&self.path, self.size).into_drawing_area();
        root.fill(&WHITE).map_err(chart_error)?;

        let mut chart = ChartBuilder::on(&root)
            .caption("Daily Weather Summary", ("sans-serif", 32).into_font())
            .margin(10)
            .x_label_area_size(50)
            .y_label_area_size(60)
            .build_cartesian_2d(-0.5f64..(names.len() as f64 - 0.5), low..high)
            .map_err(chart_error)?;

        let city_label = |x: &f64| {
            let idx = x.round();
            if (x - idx).abs() > 1e-6 || idx < 0.0 {
                return String::new();
            }
            names.get(idx as usize).map(|n| n.to_string()).unwrap_or_default()
        };

        chart
            .configure_mesh()
            .x_labels(names.len())
            .x_label_formatter(&city_label)
            .x_desc("City")
            .y_desc("Temperature (C)")
            .draw()
            .map_err(chart_error)?;

        for (label, color, value) in SERIES {
            chart
                .draw_series(LineSeries::new(
                    summaries.iter().enumerate().map(|(i, s)| (i as f64, value(s))),
                    color,
                ))
                .map_err(chart_error)?
                .label(label)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));

            chart
                .draw_series(
                    summaries
                        .iter()
                        .enumerate()
                        .map(|(i, s)| Circle::new((i as f64, value(s)), 4, color.filled())),
                )
                .map_err(chart_error)?;
        }

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(chart_error)?;

        root.present().map_err(chart_error)?;
        Ok(())
    }
}

impl Reporter for ChartReporter {
    fn report(&self, summaries: &SummaryMap) -> Result<()> {
        if summaries.is_empty() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create chart directory: {}", parent.display())
            })?;
        }

        self.draw(summaries)
            .with_context(|| format!("Failed to draw summary chart: {}", self.path.display()))?;

        info!(path = %self.path.display(), locations = summaries.len(), "summary chart written");
        Ok(())
    }
}

fn chart_error<E: std::fmt::Display>(err: E) -> anyhow::Error {
    anyhow!("{err}")
}

/// Y-axis bounds with a little headroom around the plotted values.
fn temperature_range(summaries: &SummaryMap) -> (f64, f64) {
    let low = summaries.iter().map(|s| s.min_temp_c).fold(f64::INFINITY, f64::min);
    let high = summaries.iter().map(|s| s.max_temp_c).fold(f64::NEG_INFINITY, f64::max);
    (low - 2.0, high + 2.0)
}
