//! Device control over adb
//!
//! [`DeviceControl`] is the only seam to the outside world: it takes a device
//! serial (DSN) and a command template and returns the command's stdout lines.
//! [`Device`] layers the typed actions the latency pipeline needs (launch,
//! foreground checks, log snapshots, CPU/RAM sampling) on top of it.

pub mod adb;
pub mod commands;
pub mod session;
pub mod wait;

pub use adb::AdbChannel;
pub use session::{DeviceKind, DeviceSessionState};
pub use wait::{RecordedWait, ThreadWait, Wait};

use crate::error::{KpiError, Result};
use crate::markers::LogSnapshot;
use regex::Regex;
use std::sync::OnceLock;

/// Seconds to let the device settle after a force stop or HOME key
const APP_TRANSITION_SETTLE_SECS: u64 = 5;
/// Seconds to let logcat settle after clearing buffers
const LOG_CLEAR_SETTLE_SECS: u64 = 2;

/// Packages installed by test tooling, never the app under test
const TABLET_HELPER_PACKAGES: &[&str] = &["io.appium", "vysor", "washingtonpost"];
const TV_HELPER_PACKAGES: &[&str] = &[
    "io.appium",
    "com.nordvpn",
    "vysor",
    "com.expressvpn.vpn",
    "com.surfshark.vpnclient.android",
    "com.amazon.tablet.automaticoobe",
    "com.amazon.kats.utils",
];

/// Issues a command to one device and returns its output lines
pub trait DeviceControl: Send + Sync {
    fn execute(&self, dsn: &str, command: &str) -> Result<Vec<String>>;
}

/// Typed actions against one device
pub struct Device<'a> {
    control: &'a dyn DeviceControl,
    wait: &'a dyn Wait,
    dsn: String,
    kind: DeviceKind,
    os_major: u32,
}

impl<'a> Device<'a> {
    pub fn new(
        control: &'a dyn DeviceControl,
        wait: &'a dyn Wait,
        dsn: impl Into<String>,
        kind: DeviceKind,
        os_major: u32,
    ) -> Self {
        Self {
            control,
            wait,
            dsn: dsn.into(),
            kind,
            os_major,
        }
    }

    /// Identify the device type and OS level
    ///
    /// Fails with `Validation` when the build configuration is neither `tv`
    /// nor `tablet`.
    pub fn connect(control: &'a dyn DeviceControl, wait: &'a dyn Wait, dsn: &str) -> Result<Self> {
        let configuration = first_line(control.execute(dsn, commands::DEVICE_TYPE)?);
        let kind = configuration
            .as_deref()
            .and_then(DeviceKind::from_build_configuration)
            .ok_or_else(|| {
                KpiError::Validation(format!(
                    "Unsupported Device type: {}",
                    configuration.as_deref().unwrap_or("<none>")
                ))
            })?;
        tracing::info!(dsn, "Device Type: {}", kind);

        let os_major = match control.execute(dsn, commands::DEVICE_OS) {
            Ok(lines) => first_line(lines).as_deref().and_then(parse_os_major).unwrap_or(0),
            Err(e) => {
                tracing::error!(dsn, "Failed to read OS version: {}", e);
                0
            }
        };

        Ok(Self::new(control, wait, dsn, kind, os_major))
    }

    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    pub fn os_major(&self) -> u32 {
        self.os_major
    }

    pub fn wait_secs(&self, secs: u64) {
        self.wait.wait_secs(secs);
    }

    /// Run a raw command template
    pub fn run(&self, command: &str) -> Result<Vec<String>> {
        self.control.execute(&self.dsn, command)
    }

    fn run_first_line(&self, command: &str) -> Result<Option<String>> {
        self.run(command).map(first_line)
    }

    fn output_contains(&self, command: &str, needle: &str) -> Result<bool> {
        Ok(self.run(command)?.iter().any(|line| line.contains(needle)))
    }

    // ------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------

    /// Product name, upper-cased
    pub fn display_name(&self) -> Result<Option<String>> {
        Ok(self
            .run_first_line(commands::DEVICE_NAME)?
            .map(|name| name.trim().to_uppercase()))
    }

    pub fn os_build(&self) -> Result<Option<String>> {
        Ok(self
            .run_first_line(commands::DEVICE_OS_BUILD)?
            .map(|build| build.trim().to_string()))
    }

    pub fn battery_level(&self) -> Result<Option<u32>> {
        Ok(self
            .run_first_line(commands::DEVICE_BATTERY)?
            .as_deref()
            .and_then(parse_battery_level))
    }

    // ------------------------------------------------------------------
    // App metadata
    // ------------------------------------------------------------------

    /// Third-party package currently installed, ignoring test tooling
    pub fn installed_package(&self) -> Result<Option<String>> {
        let lines = self.run(commands::LIST_PACKAGES_3P)?;
        Ok(parse_installed_package(&lines, self.kind))
    }

    pub fn app_version(&self, package: &str) -> Result<Option<String>> {
        let command = format!(
            "{} {} {}",
            commands::DUMPSYS_PACKAGE,
            package,
            commands::GREP_VERSION_NAME
        );
        Ok(parse_version_name(&self.run(&command)?))
    }

    /// `minSdk` and `targetSdk` declared by the installed package
    pub fn app_sdk_levels(&self, package: &str) -> Result<SdkLevels> {
        let command = format!(
            "{} {} {}",
            commands::DUMPSYS_PACKAGE,
            package,
            commands::GREP_VERSION_CODE
        );
        Ok(self
            .run_first_line(&command)?
            .as_deref()
            .map(parse_sdk_levels)
            .unwrap_or_default())
    }

    /// Launcher activity as `package/activity`
    pub fn app_intent(&self, package: &str) -> Result<Option<String>> {
        let command = format!("{} {} {}", commands::PM_DUMP, package, commands::GREP_ACTIVITY_MAIN);
        Ok(parse_launch_intent(&self.run(&command)?, package))
    }

    // ------------------------------------------------------------------
    // App lifecycle
    // ------------------------------------------------------------------

    /// Launch through the monkey launcher, falling back to the launch intent
    pub fn launch_app(&self, package: &str, intent: Option<&str>) -> Result<bool> {
        match self.launch_with_monkey(package) {
            Ok(true) => return Ok(true),
            Ok(false) => {}
            Err(e) => tracing::error!(dsn = %self.dsn, "Monkey launch failed: {}", e),
        }
        tracing::warn!(
            dsn = %self.dsn,
            "Error while launching app through Monkey Tool, using Intent to launch"
        );
        match intent {
            Some(intent) => self.launch_with_intent(intent),
            None => Ok(false),
        }
    }

    fn launch_with_monkey(&self, package: &str) -> Result<bool> {
        let monkey = match self.kind {
            DeviceKind::Tablet => commands::MONKEY_LAUNCH_TABLET,
            DeviceKind::SetTopBox => commands::MONKEY_LAUNCH_TV,
        };
        let command = format!("{} {} {}", monkey, package, commands::MONKEY_LAUNCHER_CATEGORY);
        for line in self.run(&command)? {
            if line.contains("Events injected") {
                tracing::info!(dsn = %self.dsn, "App Launch successful using Monkey Tool - {}", package);
                return Ok(true);
            }
            if line.contains("Error") || line.contains("No activities found") {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn launch_with_intent(&self, intent: &str) -> Result<bool> {
        let command = format!("{} {}", commands::START_ACTIVITY, intent);
        let started = self
            .run(&command)?
            .iter()
            .any(|line| line.starts_with("Starting: Intent"));
        if started {
            tracing::info!(dsn = %self.dsn, "App Launched Successfully using App Intent - {}", intent);
        }
        Ok(started)
    }

    /// Foreground check through the UI automator hierarchy dump
    pub fn foreground_in_ui_dump(&self, package: &str) -> Result<bool> {
        self.output_contains(commands::UI_AUTOMATOR_DUMP, package)
    }

    /// Foreground check through the window manager focus
    pub fn foreground_in_window_focus(&self, package: &str) -> Result<bool> {
        let command = if self.os_major <= 9 {
            commands::CURRENT_FOCUS
        } else {
            commands::CURRENT_FOCUS_A11
        };
        self.output_contains(command, package)
    }

    pub fn force_stop(&self, package: &str) -> Result<()> {
        self.run(&format!("{} {}", commands::FORCE_STOP, package))?;
        tracing::info!(dsn = %self.dsn, "App force stopped - {}", package);
        self.wait_secs(APP_TRANSITION_SETTLE_SECS);
        Ok(())
    }

    pub fn go_home(&self) -> Result<()> {
        self.run(commands::GO_HOME)?;
        self.wait_secs(APP_TRANSITION_SETTLE_SECS);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Logs
    // ------------------------------------------------------------------

    pub fn vitals_snapshot(&self) -> Result<LogSnapshot> {
        self.run(commands::VITALS_DUMP).map(LogSnapshot::from_lines)
    }

    pub fn logcat_snapshot(&self) -> Result<LogSnapshot> {
        self.run(commands::LOGCAT_DUMP).map(LogSnapshot::from_lines)
    }

    /// Clear the general and the vitals buffers
    pub fn clear_logs(&self) -> Result<()> {
        self.run(commands::LOGCAT_CLEAR)?;
        self.run(commands::VITALS_CLEAR)?;
        self.wait_secs(LOG_CLEAR_SETTLE_SECS);
        tracing::debug!(dsn = %self.dsn, "Logcat buffers cleared");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Resource sampling
    // ------------------------------------------------------------------

    /// Device-wide CPU load from the `TOTAL` row of cpuinfo
    pub fn cpu_total_percent(&self) -> Result<Option<f64>> {
        let command = if self.os_major < 9 {
            commands::CPU_INFO_LEGACY
        } else {
            commands::CPU_INFO
        };
        Ok(parse_cpu_total(&self.run(command)?))
    }

    /// Proportional set size of the app in MB
    pub fn app_memory_mb(&self, package: &str) -> Result<Option<f64>> {
        let meminfo = match self.kind {
            DeviceKind::Tablet if self.os_major > 9 => commands::MEMORY_INFO,
            DeviceKind::SetTopBox if self.os_major > 9 => commands::MEMORY_INFO_TV,
            _ => commands::MEMORY_INFO_LEGACY,
        };
        let command = format!("{} {} {}", meminfo, commands::GREP, package);
        Ok(parse_memory_mb(&self.run(&command)?, package))
    }

    // ------------------------------------------------------------------
    // Screen and power
    // ------------------------------------------------------------------

    pub fn reboot(&self) -> Result<()> {
        self.run(commands::REBOOT).map(|_| ())
    }

    /// First line of the obscuring-window probe
    pub fn lock_status(&self) -> Result<Option<String>> {
        self.run_first_line(commands::LOCK_STATUS)
    }

    /// First line of the current-focus probe
    pub fn screen_focus(&self) -> Result<Option<String>> {
        self.run_first_line(commands::CURRENT_FOCUS)
    }

    pub fn display_is_off(&self) -> Result<bool> {
        Ok(self
            .run(commands::SCREEN_STATE)?
            .iter()
            .find(|line| !line.trim().is_empty())
            .is_some_and(|line| line.contains("OFF")))
    }

    pub fn press_power(&self) -> Result<()> {
        self.run(commands::POWER_KEY).map(|_| ())
    }

    pub fn screen_width(&self) -> Result<Option<u32>> {
        Ok(self
            .run_first_line(commands::SCREEN_SIZE)?
            .as_deref()
            .and_then(parse_screen_width))
    }

    /// Swipe the keyguard away and enter the device PIN
    pub fn swipe_unlock(&self) -> Result<()> {
        self.wait_secs(5);
        let swipe = if self.screen_width()? == Some(600) {
            commands::SWIPE_SMALL_SCREEN
        } else {
            commands::SWIPE_LARGE_SCREEN
        };
        self.run(swipe)?;
        self.wait_secs(1);
        self.run(commands::INPUT_DEVICE_KEY)?;
        self.wait_secs(1);
        Ok(())
    }

    pub fn keep_screen_on(&self) -> Result<()> {
        self.run(commands::SCREEN_STAY_ON)?;
        self.wait_secs(1);
        Ok(())
    }

    /// Returns true when game mode was on and has been switched off
    pub fn disable_game_mode(&self) -> Result<bool> {
        let enabled = self
            .run(commands::GET_GAME_MODE)?
            .iter()
            .any(|line| line.trim() == "1");
        if enabled {
            self.run(commands::DISABLE_GAME_MODE)?;
        }
        Ok(enabled)
    }
}

/// SDK levels from a `versionCode=... minSdk=... targetSdk=...` line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SdkLevels {
    pub min_sdk: Option<u32>,
    pub target_sdk: Option<u32>,
}

fn first_line(lines: Vec<String>) -> Option<String> {
    lines.into_iter().next()
}

/// Major OS version from `ro.build.version.release` (`"11"`, `"7.1.2"`)
pub fn parse_os_major(release: &str) -> Option<u32> {
    release.trim().split('.').next()?.trim().parse().ok()
}

/// Battery percentage from `  level: 85`
pub fn parse_battery_level(line: &str) -> Option<u32> {
    line.split_once(':')?.1.trim().parse().ok()
}

/// Screen width from `Physical size: 1200x1920`
pub fn parse_screen_width(line: &str) -> Option<u32> {
    let (_, size) = line.split_once("Physical size:")?;
    size.split('x').next()?.trim().parse().ok()
}

/// Last third-party package not installed by test tooling
pub fn parse_installed_package(lines: &[String], kind: DeviceKind) -> Option<String> {
    let helpers = match kind {
        DeviceKind::Tablet => TABLET_HELPER_PACKAGES,
        DeviceKind::SetTopBox => TV_HELPER_PACKAGES,
    };
    lines
        .iter()
        .filter_map(|line| line.trim().strip_prefix("package:"))
        .map(str::trim)
        .filter(|package| !package.is_empty())
        .filter(|package| !helpers.iter().any(|helper| package.contains(helper)))
        .last()
        .map(str::to_string)
}

/// `versionName=4.2.1` from the last non-empty dumpsys line
pub fn parse_version_name(lines: &[String]) -> Option<String> {
    lines
        .iter()
        .rev()
        .find(|line| !line.trim().is_empty())
        .and_then(|line| line.split('=').nth(1))
        .map(|version| version.trim().to_string())
}

/// `package/activity` from a `pm dump ... | grep -A 1 MAIN` listing
pub fn parse_launch_intent(lines: &[String], package: &str) -> Option<String> {
    let prefix = format!("{}/", package);
    let line = lines.iter().find(|line| line.contains(&prefix))?;
    let (_, rest) = line.split_once('/')?;
    let activity = rest.split_whitespace().next()?;
    Some(format!("{}/{}", package, activity))
}

pub fn parse_sdk_levels(line: &str) -> SdkLevels {
    let field = |name: &str| {
        line.split_whitespace()
            .find_map(|token| token.strip_prefix(name))
            .and_then(|value| value.parse().ok())
    };
    SdkLevels {
        min_sdk: field("minSdk="),
        target_sdk: field("targetSdk="),
    }
}

/// Device CPU load from the cpuinfo `TOTAL` row (`32.5% TOTAL: ...`)
pub fn parse_cpu_total(lines: &[String]) -> Option<f64> {
    let line = lines.iter().find(|line| line.contains("TOTAL"))?;
    let (before, _) = line.split_once("TOTAL")?;
    before.trim().split('%').next()?.trim().parse().ok()
}

/// App memory in MB from a meminfo row (`  45,123K: com.example.app (pid 1)`)
pub fn parse_memory_mb(lines: &[String], package: &str) -> Option<f64> {
    static NON_DIGITS: OnceLock<Option<Regex>> = OnceLock::new();
    let non_digits = NON_DIGITS.get_or_init(|| Regex::new("[^0-9]").ok()).as_ref()?;

    let line = lines.iter().find(|line| line.contains(package))?;
    let size = line.split(':').next()?.trim();
    let kilobytes: f64 = non_digits.replace_all(size, "").parse().ok()?;
    Some(round3(kilobytes / 1024.0))
}

/// Round to three decimals
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
pub(crate) mod fake;
