//! KPI run boundary
//!
//! [`KpiRunner::run`] never fails: whatever happens inside a run, exactly
//! one row reaches the result sink and the outcome carries the failure
//! reason. Validation failures and unexpected errors produce a skip row;
//! a failed pre-launch test produces the all-NA row.

use crate::aggregate::{aggregate, AggregateResult, IterationRecords};
use crate::config::KpiConfig;
use crate::csv_output::{execution_date, KpiRow, ResultSink};
use crate::device::{Device, DeviceSessionState};
use crate::error::{KpiError, Result};
use crate::kpi::LatencyKind;
use crate::launch::{LaunchOrchestrator, PRE_LAUNCH_FAILURE};
use crate::retry::RetryPolicy;
use serde::Serialize;

pub const APP_NOT_INSTALLED: &str = "APP Failed to Install";
pub const RUN_EXCEPTION: &str = "There is an exception in latency KPI Method";

/// What one KPI run (possibly retried) reported
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiOutcome {
    pub kind: LatencyKind,
    pub passed: bool,
    pub tp50: f64,
    pub failure_reason: String,
    /// `None` when the run was skipped before measuring
    pub result: Option<AggregateResult>,
    /// Runs performed, retries included
    pub attempts: u32,
}

pub struct KpiRunner<'a> {
    device: &'a Device<'a>,
    config: &'a KpiConfig,
    sink: &'a dyn ResultSink,
    session: DeviceSessionState,
    records: IterationRecords,
}

impl<'a> KpiRunner<'a> {
    pub fn new(
        device: &'a Device<'a>,
        config: &'a KpiConfig,
        sink: &'a dyn ResultSink,
        session: DeviceSessionState,
    ) -> Self {
        Self {
            device,
            config,
            sink,
            session,
            records: IterationRecords::new(config.latency_iterations),
        }
    }

    pub fn session(&self) -> &DeviceSessionState {
        &self.session
    }

    pub fn into_session(self) -> DeviceSessionState {
        self.session
    }

    /// Run one KPI, repeating it while it fails and the policy allows
    pub fn run_with_retry(&mut self, kind: LatencyKind, mut policy: RetryPolicy) -> KpiOutcome {
        let mut outcome = self.run(kind);
        let mut attempts = 1;
        while !outcome.passed && policy.record_retry() {
            tracing::warn!(
                device = %self.session.display_name,
                retry = policy.retry_count,
                max = policy.max_retry_count,
                "Retrying {} after failure: {}",
                kind,
                outcome.failure_reason
            );
            outcome = self.run(kind);
            attempts += 1;
        }
        outcome.attempts = attempts;
        outcome
    }

    /// Run one KPI and append its row
    pub fn run(&mut self, kind: LatencyKind) -> KpiOutcome {
        tracing::info!(device = %self.session.display_name, "----------- Starting {} -----------", kind);
        self.session.clear_failure();
        self.records.reset();
        let date = execution_date();

        match self.try_run(kind, &date) {
            Ok(outcome) => outcome,
            Err(e) => {
                self.session.set_failure_if_unset(RUN_EXCEPTION);
                tracing::error!(
                    device = %self.session.display_name,
                    "{}: {}",
                    self.session.failure_reason(),
                    e
                );
                let row = KpiRow::skipped(kind, &self.config.app_package, &self.session, &date);
                self.append(&row);
                KpiOutcome {
                    kind,
                    passed: false,
                    tp50: 0.0,
                    failure_reason: self.session.failure_reason().to_string(),
                    result: None,
                    attempts: 1,
                }
            }
        }
    }

    fn try_run(&mut self, kind: LatencyKind, date: &str) -> Result<KpiOutcome> {
        let package = self.resolve_app()?;

        let orchestrator = LaunchOrchestrator::new(self.device, self.config, &self.session, kind);
        match orchestrator.run(&mut self.records) {
            Ok(()) => {}
            Err(KpiError::DeviceUnresponsive { .. }) => self.session.set_failure(PRE_LAUNCH_FAILURE),
            Err(e) => return Err(e),
        }

        let result = aggregate(&mut self.records);
        let row = KpiRow::from_result(kind, &package, &self.session, &result, date);
        // A lost row does not invalidate the measurement
        self.append(&row);

        let passed = result.tp50 > 0.0;
        tracing::info!(
            device = %self.session.display_name,
            passed,
            "{} TP50: {}",
            kind,
            result.tp50
        );
        Ok(KpiOutcome {
            kind,
            passed,
            tp50: result.tp50,
            failure_reason: self.session.failure_reason().to_string(),
            result: Some(result),
            attempts: 1,
        })
    }

    /// Check the installed package and load its metadata into the session
    fn resolve_app(&mut self) -> Result<String> {
        let expected = self.config.app_package.as_str();
        let installed = self.device.installed_package()?;
        if installed.as_deref() != Some(expected) {
            tracing::error!(
                device = %self.session.display_name,
                installed = ?installed,
                "App package {} not found in device",
                expected
            );
            self.session.set_failure(APP_NOT_INSTALLED);
            return Err(KpiError::Validation(format!("{} is not installed", expected)));
        }

        self.session.app_package = Some(expected.to_string());
        self.session.app_version = self.device.app_version(expected).unwrap_or_else(|e| {
            tracing::error!("Failed to read app version: {}", e);
            None
        });
        self.session.app_intent = self.device.app_intent(expected).unwrap_or_else(|e| {
            tracing::error!("Failed to read app intent: {}", e);
            None
        });
        let sdk = self.device.app_sdk_levels(expected).unwrap_or_default();

        tracing::info!(
            device = %self.session.display_name,
            version = %self.session.version_or_na(),
            intent = ?self.session.app_intent,
            min_sdk = ?sdk.min_sdk,
            target_sdk = ?sdk.target_sdk,
            "App package: {}",
            expected
        );
        Ok(expected.to_string())
    }

    fn append(&self, row: &KpiRow) {
        if let Err(e) = self.sink.append(row) {
            tracing::error!("Failed to write KPI row: {}", e);
        }
    }
}
