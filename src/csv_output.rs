//! KPI CSV output
//!
//! One row per KPI run, appended as soon as the run finishes so that a crash
//! later in the session keeps every completed row.

use crate::aggregate::AggregateResult;
use crate::device::session::NO_FAILURE;
use crate::device::DeviceSessionState;
use crate::error::Result;
use crate::kpi::LatencyKind;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

pub const KPI_TYPE: &str = "LATENCY";

/// Text written in place of values for a run skipped by validation
pub const SKIP: &str = "Skip";

pub const CSV_HEADERS: [&str; 16] = [
    "KPI_ID",
    "APP_PACKAGE",
    "APP_VERSION",
    "KPI_TYPE",
    "KPI_METRICS_NAME",
    "KPI_ITERATION_WISE_VALUES",
    "KPI_AVERAGE_VALUE",
    "KPI_TP50_VALUE",
    "KPI_TP90_VALUE",
    "TEST_DEVICE_NAME",
    "TEST_DEVICE_FOS_VERSION",
    "TEST_DEVICE_RAM_USED",
    "TEST_DEVICE_CPU_USED",
    "ITERATIONS_EXECUTED",
    "TEST_EXECUTION_DATE",
    "FAILURE_REASON",
];

/// One KPI CSV row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiRow {
    pub kpi_id: u32,
    pub app_package: String,
    pub app_version: String,
    pub kpi_type: String,
    pub metrics_name: String,
    pub iteration_values: String,
    pub average: f64,
    pub tp50: f64,
    pub tp90: f64,
    pub device_name: String,
    pub device_os_version: String,
    pub ram_used: String,
    pub cpu_used: String,
    pub iterations_executed: usize,
    pub execution_date: String,
    pub failure_reason: String,
}

impl KpiRow {
    /// Row for an aggregated run; an NA result yields `NA` text and zero numerics
    pub fn from_result(
        kind: LatencyKind,
        package: &str,
        session: &DeviceSessionState,
        result: &AggregateResult,
        execution_date: &str,
    ) -> Self {
        Self {
            kpi_id: kind.kpi_id(),
            app_package: package.to_string(),
            app_version: session.version_or_na().to_string(),
            kpi_type: KPI_TYPE.to_string(),
            metrics_name: kind.metrics_name().to_string(),
            iteration_values: result.values_text(),
            average: result.average,
            tp50: result.tp50,
            tp90: result.tp90,
            device_name: session.display_name.clone(),
            device_os_version: session.os_build.clone(),
            ram_used: result.ram_text(),
            cpu_used: result.cpu_text(),
            iterations_executed: result.iterations,
            execution_date: execution_date.to_string(),
            failure_reason: session.failure_reason().to_string(),
        }
    }

    /// Row for a run that never measured (validation failure or exception)
    pub fn skipped(
        kind: LatencyKind,
        package: &str,
        session: &DeviceSessionState,
        execution_date: &str,
    ) -> Self {
        Self {
            kpi_id: kind.kpi_id(),
            app_package: package.to_string(),
            app_version: NO_FAILURE.to_string(),
            kpi_type: KPI_TYPE.to_string(),
            metrics_name: kind.metrics_name().to_string(),
            iteration_values: SKIP.to_string(),
            average: 0.0,
            tp50: 0.0,
            tp90: 0.0,
            device_name: session.display_name.clone(),
            device_os_version: session.os_build.clone(),
            ram_used: SKIP.to_string(),
            cpu_used: SKIP.to_string(),
            iterations_executed: 0,
            execution_date: execution_date.to_string(),
            failure_reason: session.failure_reason().to_string(),
        }
    }

    pub fn header() -> String {
        CSV_HEADERS.join(",")
    }

    pub fn to_csv(&self) -> String {
        let fields = [
            self.kpi_id.to_string(),
            escape_field(&self.app_package),
            escape_field(&self.app_version),
            escape_field(&self.kpi_type),
            escape_field(&self.metrics_name),
            escape_field(&self.iteration_values),
            format!("{:?}", self.average),
            format!("{:?}", self.tp50),
            format!("{:?}", self.tp90),
            escape_field(&self.device_name),
            escape_field(&self.device_os_version),
            escape_field(&self.ram_used),
            escape_field(&self.cpu_used),
            self.iterations_executed.to_string(),
            escape_field(&self.execution_date),
            escape_field(&self.failure_reason),
        ];
        fields.join(",")
    }
}

/// Escape CSV field (handle commas, quotes, newlines)
fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Today's date in the `MM-dd-yyyy` form of the date column
pub fn execution_date() -> String {
    chrono::Local::now().format("%m-%d-%Y").to_string()
}

/// Destination of finished KPI rows
pub trait ResultSink: Send + Sync {
    fn append(&self, row: &KpiRow) -> Result<()>;
}

/// In-memory sink
impl ResultSink for Mutex<Vec<KpiRow>> {
    fn append(&self, row: &KpiRow) -> Result<()> {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(row.clone());
        Ok(())
    }
}

/// Appends rows to a CSV file; appends from concurrent sessions are serialized
#[derive(Debug)]
pub struct CsvResultSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl CsvResultSink {
    /// Start a fresh file holding only the header
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        ensure_parent(&path)?;
        let mut file = File::create(&path)?;
        writeln!(file, "{}", KpiRow::header())?;
        tracing::info!(path = %path.display(), "KPI CSV created");
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    /// Keep existing rows; the header is written only to a new or empty file
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let is_empty = fs::metadata(&path).map_or(true, |meta| meta.len() == 0);
        if is_empty {
            return Self::create(path);
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultSink for CsvResultSink {
    fn append(&self, row: &KpiRow) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut file = OpenOptions::new().append(true).create(true).open(&self.path)?;
        writeln!(file, "{}", row.to_csv())?;
        tracing::debug!(path = %self.path.display(), metrics = %row.metrics_name, "KPI row appended");
        Ok(())
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => Ok(fs::create_dir_all(parent)?),
        _ => Ok(()),
    }
}
