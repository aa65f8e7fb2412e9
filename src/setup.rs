//! Device preparation before the first KPI run of a session
//!
//! Nothing here aborts a session: every failed step is logged and the
//! session continues with whatever state the device is in.

use crate::config::KpiConfig;
use crate::device::{Device, DeviceKind, DeviceSessionState};
use crate::reboot::RebootRecoveryMonitor;
use crate::retry::RetryBudget;

/// Battery level below which a warning is logged
pub const LOW_BATTERY_PERCENT: u32 = 40;

const LOCK_PROBE_ATTEMPTS: u32 = 5;
const LOCK_PROBE_INTERVAL_SECS: u64 = 10;
const POWER_ON_SETTLE_SECS: u64 = 3;
const KEYGUARD_MARKER: &str = "WallpaperService";

/// Build the session state and prepare the device for measuring
pub fn open_session(device: &Device<'_>, config: &KpiConfig) -> DeviceSessionState {
    let mut session = DeviceSessionState::new(device.dsn(), device.kind(), device.os_major());
    describe_device(device, &mut session);

    match device.kind() {
        DeviceKind::Tablet => prepare_tablet(device, config, &session),
        DeviceKind::SetTopBox => prepare_set_top_box(device, config, &session),
    }
    session
}

fn describe_device(device: &Device<'_>, session: &mut DeviceSessionState) {
    match device.display_name() {
        Ok(Some(name)) if !name.is_empty() => session.display_name = name,
        Ok(_) => tracing::warn!(dsn = %device.dsn(), "Device name unavailable, using serial"),
        Err(e) => tracing::error!(dsn = %device.dsn(), "Failed to read device name: {}", e),
    }
    match device.os_build() {
        Ok(Some(build)) if !build.is_empty() => session.os_build = build,
        Ok(_) => {}
        Err(e) => tracing::error!(dsn = %device.dsn(), "Failed to read OS build: {}", e),
    }
    tracing::info!(
        device = %session.display_name,
        dsn = %session.dsn,
        os_major = session.os_major,
        "Device connected, OS version: {}",
        session.os_build
    );

    match device.battery_level() {
        Ok(Some(level)) if level < LOW_BATTERY_PERCENT => {
            tracing::warn!(device = %session.display_name, "Battery low: {}%", level);
        }
        Ok(Some(level)) => tracing::info!(device = %session.display_name, "Battery level: {}%", level),
        Ok(None) => tracing::warn!(device = %session.display_name, "Battery level unavailable"),
        Err(e) => tracing::error!(device = %session.display_name, "Failed to read battery level: {}", e),
    }
}

fn prepare_tablet(device: &Device<'_>, config: &KpiConfig, session: &DeviceSessionState) {
    ensure_unlocked(device, session);

    match device.disable_game_mode() {
        Ok(true) => tracing::info!(device = %session.display_name, "Game mode disabled"),
        Ok(false) => {}
        Err(e) => tracing::error!(device = %session.display_name, "Failed to disable game mode: {}", e),
    }
    keep_awake(device, session);

    if config.reboot_device {
        reboot(device, config, session);
        ensure_unlocked(device, session);
    }
}

fn prepare_set_top_box(device: &Device<'_>, config: &KpiConfig, session: &DeviceSessionState) {
    if config.reboot_device {
        reboot(device, config, session);
    }
    keep_awake(device, session);
}

fn keep_awake(device: &Device<'_>, session: &DeviceSessionState) {
    match device.keep_screen_on() {
        Ok(()) => tracing::info!(device = %session.display_name, "Screen lock disabled"),
        Err(e) => tracing::error!(device = %session.display_name, "Failed to keep screen on: {}", e),
    }
}

fn reboot(device: &Device<'_>, config: &KpiConfig, session: &DeviceSessionState) {
    let monitor = RebootRecoveryMonitor::new(&config.timing, &config.landing_pages);
    if let Err(e) = monitor.reboot_and_confirm(device) {
        tracing::error!(device = %session.display_name, "Reboot failed: {}", e);
    }
}

/// Returns true when the keyguard is gone, either on its own or after unlocking
///
/// The lock probe reports the keyguard wallpaper while the screen is locked.
pub fn ensure_unlocked(device: &Device<'_>, session: &DeviceSessionState) -> bool {
    let mut budget = RetryBudget::new(LOCK_PROBE_ATTEMPTS, LOCK_PROBE_INTERVAL_SECS);
    while budget.next_attempt() {
        match device.lock_status() {
            Ok(None) => continue,
            Ok(Some(line)) if !line.contains(KEYGUARD_MARKER) => {
                tracing::info!(device = %session.display_name, "Device is not locked");
                return true;
            }
            Ok(Some(_)) => {}
            Err(e) => tracing::error!(device = %session.display_name, "Lock probe failed: {}", e),
        }
        device.wait_secs(budget.poll_interval_secs);
    }

    match device.display_is_off() {
        Ok(true) => {
            tracing::info!(device = %session.display_name, "Display is off, waking the device");
            if let Err(e) = device.press_power() {
                tracing::error!(device = %session.display_name, "Failed to press power: {}", e);
            }
            device.wait_secs(POWER_ON_SETTLE_SECS);
        }
        Ok(false) => tracing::info!(device = %session.display_name, "Display is on"),
        Err(e) => tracing::error!(device = %session.display_name, "Failed to read display state: {}", e),
    }

    match device.swipe_unlock() {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(device = %session.display_name, "Failed to unlock device: {}", e);
            false
        }
    }
}
