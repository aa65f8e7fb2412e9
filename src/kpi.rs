//! Latency KPI kinds

use serde::Serialize;
use std::fmt;

/// The two launch latencies measured per app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LatencyKind {
    /// App started from a fully stopped process
    Cool,
    /// App resumed from the background
    Warm,
}

impl LatencyKind {
    /// Metrics name written to the KPI_METRICS_NAME column
    pub fn metrics_name(self) -> &'static str {
        match self {
            Self::Cool => "Cool_FF",
            Self::Warm => "Warm_FF",
        }
    }

    /// Numeric KPI id written to the KPI_ID column
    pub fn kpi_id(self) -> u32 {
        match self {
            Self::Cool => 1,
            Self::Warm => 2,
        }
    }
}

impl fmt::Display for LatencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.metrics_name())
    }
}
