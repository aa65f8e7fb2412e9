//! JSON output format for KPI summaries
//!
//! `--format json` prints one object per KPI run (JSON lines) on stdout.

use crate::aggregate::SampleSource;
use crate::device::{DeviceKind, DeviceSessionState};
use crate::runner::KpiOutcome;
use serde::{Deserialize, Serialize};

/// Summary of one KPI run on one device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonKpiSummary {
    pub dsn: String,
    pub device: String,
    pub device_kind: String,
    pub kpi: String,
    pub kpi_id: u32,
    pub passed: bool,
    pub attempts: u32,
    pub failure_reason: String,
    /// Reported series, absent for skipped or NA runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<JsonLatencyStats>,
}

/// Latency statistics in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonLatencyStats {
    pub values: Vec<f64>,
    pub average: f64,
    pub median: f64,
    pub mode: f64,
    pub tp50: f64,
    pub tp90: f64,
    pub loss_count: usize,
    pub iterations: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ram_used_mb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_used_percent: Option<f64>,
}

impl JsonKpiSummary {
    pub fn new(session: &DeviceSessionState, outcome: &KpiOutcome) -> Self {
        let measured = outcome.result.as_ref().filter(|r| !r.is_not_available());
        Self {
            dsn: session.dsn.clone(),
            device: session.display_name.clone(),
            device_kind: match session.kind {
                DeviceKind::Tablet => "tablet".to_string(),
                DeviceKind::SetTopBox => "tv".to_string(),
            },
            kpi: outcome.kind.metrics_name().to_string(),
            kpi_id: outcome.kind.kpi_id(),
            passed: outcome.passed,
            attempts: outcome.attempts,
            failure_reason: outcome.failure_reason.clone(),
            source: measured.and_then(|r| r.source).map(|s: SampleSource| s.to_string()),
            stats: measured.map(|r| JsonLatencyStats {
                values: r.values_per_iteration.clone(),
                average: r.average,
                median: r.median,
                mode: r.mode,
                tp50: r.tp50,
                tp90: r.tp90,
                loss_count: r.loss_count,
                iterations: r.iterations,
                ram_used_mb: r.ram_used_mb,
                cpu_used_percent: r.cpu_used_percent,
            }),
        }
    }

    /// Serialize to a single-line JSON string
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
