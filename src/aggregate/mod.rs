// Reduction of per-iteration latency samples into one KPI result
//
// Two candidate series are captured every iteration: the vitals launch timer
// and the displayed (first frame) time. Each is stripped of losses and
// summarized independently; the source priority then picks which summary is
// reported:
//
//   both tp50 non-zero   -> displayed
//   only timer tp50      -> vitals timer
//   only displayed tp50  -> displayed
//   neither              -> degraded NA result
//
// RAM and CPU are summarized over every slot, including lost iterations.

pub mod records;
pub mod statistics;

pub use records::{IterationRecords, IterationSample};

use serde::Serialize;
use std::fmt;
use statistics::{mean3, median, mode, percentile};

/// Which latency series a result reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SampleSource {
    Displayed,
    Vitals,
}

impl fmt::Display for SampleSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Displayed => f.write_str("displayed"),
            Self::Vitals => f.write_str("vitals"),
        }
    }
}

/// Summary of one latency-type run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateResult {
    /// Non-loss samples of the reported series, in iteration order
    pub values_per_iteration: Vec<f64>,
    pub average: f64,
    pub median: f64,
    pub mode: f64,
    pub tp50: f64,
    pub tp90: f64,
    /// Lost iterations of the reported series
    pub loss_count: usize,
    /// `None` for the degraded NA result
    pub source: Option<SampleSource>,
    /// Configured iteration count, `0` for the NA result
    pub iterations: usize,
    pub ram_used_mb: Option<f64>,
    pub cpu_used_percent: Option<f64>,
}

impl AggregateResult {
    /// Result reported when neither series has a sample
    pub fn not_available(loss_count: usize) -> Self {
        Self {
            values_per_iteration: Vec::new(),
            average: 0.0,
            median: 0.0,
            mode: 0.0,
            tp50: 0.0,
            tp90: 0.0,
            loss_count,
            source: None,
            iterations: 0,
            ram_used_mb: None,
            cpu_used_percent: None,
        }
    }

    pub fn is_not_available(&self) -> bool {
        self.source.is_none()
    }

    /// `[1.234;1.5]` form of the reported samples, `NA` for the degraded result
    pub fn values_text(&self) -> String {
        if self.is_not_available() {
            return "NA".to_string();
        }
        let joined: Vec<String> = self
            .values_per_iteration
            .iter()
            .map(|v| format!("{:?}", v))
            .collect();
        format!("[{}]", joined.join(";"))
    }

    pub fn ram_text(&self) -> String {
        self.ram_used_mb
            .map_or_else(|| "NA".to_string(), |mb| format!("{:?} MB", mb))
    }

    pub fn cpu_text(&self) -> String {
        self.cpu_used_percent
            .map_or_else(|| "NA".to_string(), |pct| format!("{:?}%", pct))
    }
}

/// Statistics of one series after dropping losses
#[derive(Debug, Clone, PartialEq)]
struct SeriesSummary {
    present: Vec<f64>,
    loss_count: usize,
    tp50: f64,
    tp90: f64,
}

impl SeriesSummary {
    fn of(series: &[f64]) -> Self {
        let present: Vec<f64> = series.iter().copied().filter(|&v| v != 0.0).collect();
        Self {
            loss_count: series.len() - present.len(),
            tp50: percentile(&present, 50.0).unwrap_or(0.0),
            tp90: percentile(&present, 90.0).unwrap_or(0.0),
            present,
        }
    }
}

/// Reduce the records and reset them for the next run
pub fn aggregate(records: &mut IterationRecords) -> AggregateResult {
    let timer = SeriesSummary::of(&records.timer_series());
    let displayed = SeriesSummary::of(&records.displayed_series());

    let chosen = match (displayed.tp50 != 0.0, timer.tp50 != 0.0) {
        (true, true) => Some((SampleSource::Displayed, &displayed)),
        (false, true) => Some((SampleSource::Vitals, &timer)),
        (true, false) => Some((SampleSource::Displayed, &displayed)),
        (false, false) => None,
    };

    let result = match chosen {
        Some((source, summary)) => {
            if summary.loss_count > 0 {
                tracing::warn!(
                    "Calculating average for only {} of {} values",
                    summary.present.len(),
                    records.len()
                );
            }
            AggregateResult {
                values_per_iteration: summary.present.clone(),
                average: mean3(&summary.present).unwrap_or(0.0),
                median: median(&summary.present).unwrap_or(0.0),
                mode: mode(&summary.present).unwrap_or(0.0),
                tp50: summary.tp50,
                tp90: summary.tp90,
                loss_count: summary.loss_count,
                source: Some(source),
                iterations: records.len(),
                ram_used_mb: percentile(&records.memory_series(), 50.0),
                cpu_used_percent: percentile(&records.cpu_series(), 90.0),
            }
        }
        None => {
            tracing::warn!("No launch marker captured in any iteration");
            AggregateResult::not_available(timer.loss_count)
        }
    };

    if let Some(source) = result.source {
        tracing::info!(
            source = %source,
            average = result.average,
            median = result.median,
            mode = result.mode,
            tp50 = result.tp50,
            tp90 = result.tp90,
            "Values per iteration: {}",
            result.values_text()
        );
    }

    records.reset();
    result
}
