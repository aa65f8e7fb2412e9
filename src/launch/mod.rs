// Launch cycle state machine
//
// Every cycle walks the same phases:
//
//   Idle -> Launching -> ForegroundCheck -> Capturing -> Teardown -> Done
//                 \              \                          ^
//                  +--------------+---- (failure) ----------+-> Failed
//
// Teardown always runs once the cycle has started, so the device is left
// with the app stopped (cool) or backgrounded (warm) and clean log buffers.
// A run is a cold-launch pre-validation pass followed by the measured cycles;
// if fewer than two pre-validation cycles see the app and a launch marker,
// the measured cycles are skipped.

use crate::aggregate::{IterationRecords, IterationSample};
use crate::config::KpiConfig;
use crate::device::{Device, DeviceSessionState};
use crate::error::{KpiError, Result};
use crate::kpi::LatencyKind;
use crate::markers::{self, LogSnapshot};
use crate::retry::RetryBudget;
use std::fs;
use std::path::PathBuf;

/// Validated pre-launch cycles needed before measuring
pub const MIN_VALIDATED_CYCLES: u32 = 2;

/// Failure reason when pre-validation does not reach [`MIN_VALIDATED_CYCLES`]
pub const PRE_LAUNCH_FAILURE: &str = "Error Occurred while performing pre launch test";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchPhase {
    Idle,
    Launching,
    ForegroundCheck,
    Capturing,
    Teardown,
    Done,
    Failed,
}

/// Why a cycle runs; controls settle time, sampling and log archive naming
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleMode {
    PreValidation,
    Measurement,
}

/// Result of one launch cycle
#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutcome {
    /// `Done` or `Failed`
    pub phase: LaunchPhase,
    pub launched: bool,
    pub foreground: bool,
    pub sample: IterationSample,
    /// Fully drawn seconds when the app reported the marker
    pub fully_drawn: Option<f64>,
}

impl CycleOutcome {
    fn new() -> Self {
        Self {
            phase: LaunchPhase::Idle,
            launched: false,
            foreground: false,
            sample: IterationSample::LOST,
            fully_drawn: None,
        }
    }

    /// Counts toward pre-validation: app seen and at least one latency captured
    pub fn is_validated(&self) -> bool {
        self.foreground && self.sample.has_latency()
    }
}

pub struct LaunchOrchestrator<'a> {
    device: &'a Device<'a>,
    config: &'a KpiConfig,
    session: &'a DeviceSessionState,
    kind: LatencyKind,
}

impl<'a> LaunchOrchestrator<'a> {
    pub fn new(
        device: &'a Device<'a>,
        config: &'a KpiConfig,
        session: &'a DeviceSessionState,
        kind: LatencyKind,
    ) -> Self {
        Self {
            device,
            config,
            session,
            kind,
        }
    }

    fn package(&self) -> &str {
        self.session
            .app_package
            .as_deref()
            .unwrap_or(&self.config.app_package)
    }

    fn intent(&self) -> Option<&str> {
        self.session.app_intent.as_deref()
    }

    /// Pre-validate, then fill `records` with one sample per measured cycle
    pub fn run(&self, records: &mut IterationRecords) -> Result<()> {
        let validated = self.pre_validate()?;
        tracing::info!(
            device = %self.session.display_name,
            validated,
            "{} pre-launch test passed",
            self.kind
        );
        self.measure(records);
        Ok(())
    }

    /// Cold-launch pre-validation
    ///
    /// Returns the number of validated cycles, or `DeviceUnresponsive` when
    /// fewer than [`MIN_VALIDATED_CYCLES`] validated.
    pub fn pre_validate(&self) -> Result<u32> {
        let mut budget = RetryBudget::new(
            u32::try_from(self.config.extra_iterations).unwrap_or(u32::MAX),
            self.config.timing.prevalidation_settle_secs,
        );
        let mut validated = 0;
        while budget.next_attempt() {
            let index = (budget.current_attempt - 1) as usize;
            let outcome = self.run_cycle(CycleMode::PreValidation, index);
            if outcome.is_validated() {
                validated += 1;
            }
        }

        if validated >= MIN_VALIDATED_CYCLES {
            Ok(validated)
        } else {
            tracing::error!(
                device = %self.session.display_name,
                validated,
                attempts = budget.current_attempt,
                "{}",
                PRE_LAUNCH_FAILURE
            );
            Err(KpiError::DeviceUnresponsive {
                attempts: budget.current_attempt,
                reason: PRE_LAUNCH_FAILURE.to_string(),
            })
        }
    }

    /// Measured cycles, strictly in order, one records slot each
    pub fn measure(&self, records: &mut IterationRecords) {
        tracing::info!(
            device = %self.session.display_name,
            "Starting {} capture for {} iterations",
            self.kind,
            records.len()
        );
        for index in 0..records.len() {
            let outcome = self.run_cycle(CycleMode::Measurement, index);
            if outcome.phase == LaunchPhase::Failed {
                tracing::warn!(
                    device = %self.session.display_name,
                    iteration = index + 1,
                    "Launch cycle failed, recording a loss"
                );
            }
            records.record(index, outcome.sample);
        }
    }

    /// Drive one cycle through its phases
    pub fn run_cycle(&self, mode: CycleMode, index: usize) -> CycleOutcome {
        let mut outcome = CycleOutcome::new();
        let mut phase = LaunchPhase::Idle;

        loop {
            tracing::trace!(iteration = index + 1, phase = ?phase, "Launch cycle");
            phase = match phase {
                LaunchPhase::Idle => LaunchPhase::Launching,
                LaunchPhase::Launching => match self.device.launch_app(self.package(), self.intent()) {
                    Ok(true) => {
                        outcome.launched = true;
                        self.device.wait_secs(self.settle_secs(mode));
                        LaunchPhase::ForegroundCheck
                    }
                    Ok(false) => {
                        tracing::error!(
                            device = %self.session.display_name,
                            "App Failed to launch using the App Intent"
                        );
                        LaunchPhase::Teardown
                    }
                    Err(e) => {
                        tracing::error!(device = %self.session.display_name, "Launch failed: {}", e);
                        LaunchPhase::Teardown
                    }
                },
                LaunchPhase::ForegroundCheck => {
                    if self.in_foreground() {
                        outcome.foreground = true;
                        LaunchPhase::Capturing
                    } else {
                        tracing::warn!(device = %self.session.display_name, "App not in foreground");
                        LaunchPhase::Teardown
                    }
                }
                LaunchPhase::Capturing => {
                    let (sample, fully_drawn) = self.capture(mode, index);
                    outcome.sample = sample;
                    outcome.fully_drawn = fully_drawn;
                    LaunchPhase::Teardown
                }
                LaunchPhase::Teardown => {
                    if let Err(e) = self.teardown(mode) {
                        tracing::error!(device = %self.session.display_name, "Teardown failed: {}", e);
                    }
                    if outcome.foreground {
                        LaunchPhase::Done
                    } else {
                        LaunchPhase::Failed
                    }
                }
                LaunchPhase::Done | LaunchPhase::Failed => break,
            };
        }

        outcome.phase = phase;
        outcome
    }

    /// Pre-validation settles for the polling interval of its retry budget
    fn settle_secs(&self, mode: CycleMode) -> u64 {
        match mode {
            CycleMode::PreValidation => self.config.timing.prevalidation_settle_secs,
            CycleMode::Measurement => self.config.latency_wait,
        }
    }

    fn in_foreground(&self) -> bool {
        let package = self.package();
        let via_ui = self.device.foreground_in_ui_dump(package).unwrap_or_else(|e| {
            tracing::error!("UI dump check failed: {}", e);
            false
        });
        if via_ui {
            tracing::debug!("App found in UI dump");
            return true;
        }
        self.device
            .foreground_in_window_focus(package)
            .unwrap_or_else(|e| {
                tracing::error!("Window focus check failed: {}", e);
                false
            })
    }

    /// Read every sample of the cycle; each failure is a loss
    fn capture(&self, mode: CycleMode, index: usize) -> (IterationSample, Option<f64>) {
        let package = self.package();
        let mut sample = IterationSample::LOST;

        match self.device.vitals_snapshot() {
            Ok(vitals) => match markers::vitals_timer(&vitals, self.kind, package) {
                Some(found) => {
                    tracing::info!(marker = %found.marker, "Timer value: {}", found.seconds);
                    sample.timer = found.seconds;
                }
                None => tracing::warn!("{} vitals marker not found", self.kind),
            },
            Err(e) => tracing::error!("Failed to read vitals buffer: {}", e),
        }

        if mode == CycleMode::Measurement {
            sample.cpu_percent = match self.device.cpu_total_percent() {
                Ok(cpu) => cpu.unwrap_or(0.0),
                Err(e) => {
                    tracing::error!("Failed to read CPU usage: {}", e);
                    0.0
                }
            };
            sample.memory_mb = match self.device.app_memory_mb(package) {
                Ok(mem) => mem.unwrap_or(0.0),
                Err(e) => {
                    tracing::error!("Failed to read app memory: {}", e);
                    0.0
                }
            };
        }

        let mut fully_drawn = None;
        match self.device.logcat_snapshot() {
            Ok(logcat) => {
                self.archive(&logcat, mode, index);
                match markers::displayed_value(&logcat, package, self.intent()) {
                    Some(found) => {
                        tracing::info!("Displayed value: {}", found.seconds);
                        sample.displayed = found.seconds;
                    }
                    None => tracing::warn!("Displayed marker not found"),
                }
                fully_drawn = markers::fully_drawn(&logcat, package, self.intent()).map(|m| m.seconds);
                tracing::info!("Fully Drawn Marker: {}", fully_drawn.is_some());
            }
            Err(e) => tracing::error!("Failed to read logcat: {}", e),
        }

        (sample, fully_drawn)
    }

    fn teardown(&self, mode: CycleMode) -> Result<()> {
        match self.kind {
            LatencyKind::Warm => {
                self.device.go_home()?;
                if mode == CycleMode::Measurement {
                    self.device
                        .wait_secs(self.config.timing.warm_background_settle_secs);
                }
            }
            LatencyKind::Cool => {
                self.device.force_stop(self.package())?;
                if mode == CycleMode::Measurement {
                    self.device.wait_secs(self.config.latency_wait);
                }
            }
        }
        self.device.clear_logs()
    }

    /// Path of the logcat archive for a cycle, when archiving is enabled
    pub fn archive_path(&self, mode: CycleMode, index: usize) -> Option<PathBuf> {
        let dir = self.config.adb_log_dir.as_ref()?;
        let stage = match mode {
            CycleMode::PreValidation => "Launch_Test_Loop",
            CycleMode::Measurement => "Loop",
        };
        Some(dir.join(format!(
            "{}_{}_{}_{}_{}_ADB.txt",
            self.package(),
            self.session.display_name,
            stage,
            index + 1,
            self.kind.metrics_name()
        )))
    }

    fn archive(&self, snapshot: &LogSnapshot, mode: CycleMode, index: usize) {
        let Some(path) = self.archive_path(mode, index) else {
            return;
        };
        let written = path
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .map_err(KpiError::from)
            .and_then(|()| snapshot.write_to(&path));
        if let Err(e) = written {
            tracing::error!(path = %path.display(), "Failed to archive logcat: {}", e);
        }
    }
}
