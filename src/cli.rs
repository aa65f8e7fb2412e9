//! CLI argument parsing for perfkpi

use crate::kpi::LatencyKind;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for per-KPI summaries on stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// One JSON object per KPI run
    Json,
}

/// Which latency KPIs to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KpiSelection {
    /// Cool launch, then warm launch
    Latency,
    Cool,
    Warm,
}

impl KpiSelection {
    pub fn kinds(self) -> &'static [LatencyKind] {
        match self {
            Self::Latency => &[LatencyKind::Cool, LatencyKind::Warm],
            Self::Cool => &[LatencyKind::Cool],
            Self::Warm => &[LatencyKind::Warm],
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "perfkpi")]
#[command(version)]
#[command(about = "App launch latency KPIs for Android tablets and TV devices over adb", long_about = None)]
pub struct Cli {
    /// Device serial to test; repeat for several devices
    #[arg(short = 'd', long = "dsn", value_name = "DSN", required = true)]
    pub dsn: Vec<String>,

    /// KPIs to run
    #[arg(short = 'k', long = "kpi", value_enum, default_value = "latency")]
    pub kpi: KpiSelection,

    /// Configuration file
    #[arg(short = 'c', long = "config", value_name = "FILE", default_value = "perfkpi.toml")]
    pub config: PathBuf,

    /// KPI CSV path (overrides kpi_values_csv)
    #[arg(long = "csv", value_name = "FILE")]
    pub csv: Option<PathBuf>,

    /// Keep rows already in the CSV instead of starting a new file
    #[arg(long = "append")]
    pub append: bool,

    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// adb binary to use
    #[arg(long = "adb", value_name = "PATH", default_value = "adb")]
    pub adb: PathBuf,

    /// Enable debug tracing output
    #[arg(long = "debug")]
    pub debug: bool,
}
