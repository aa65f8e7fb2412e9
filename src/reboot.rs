//! Reboot and boot-completion confirmation
//!
//! After `shell reboot` and a settle delay the monitor polls a window-manager
//! probe until the device shows its idle screen: the wallpaper service for
//! tablets, a configured landing page for set-top boxes. Running out of
//! attempts is not an error; the run continues on a possibly unready device.

use crate::config::{LandingPages, Timing};
use crate::device::{Device, DeviceKind};
use crate::error::Result;
use crate::retry::RetryBudget;

const WALLPAPER_SERVICE: &str = "WallpaperService";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebootOutcome {
    /// Idle screen observed on the given poll (1-based)
    Confirmed { attempt: u32 },
    /// Attempts exhausted without seeing the idle screen
    Unconfirmed,
}

impl RebootOutcome {
    pub fn is_confirmed(self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }
}

pub struct RebootRecoveryMonitor<'c> {
    settle_secs: u64,
    poll_secs: u64,
    max_attempts: u32,
    landing_pages: &'c LandingPages,
}

impl<'c> RebootRecoveryMonitor<'c> {
    pub fn new(timing: &Timing, landing_pages: &'c LandingPages) -> Self {
        Self {
            settle_secs: timing.reboot_settle_secs,
            poll_secs: timing.reboot_poll_secs,
            max_attempts: timing.reboot_max_attempts,
            landing_pages,
        }
    }

    /// Reboot the device and wait until it is usable again
    ///
    /// Only a failure to issue the reboot itself is returned as an error.
    pub fn reboot_and_confirm(&self, device: &Device<'_>) -> Result<RebootOutcome> {
        tracing::info!(dsn = %device.dsn(), "Rebooting device");
        device.reboot()?;
        device.wait_secs(self.settle_secs);

        let outcome = match device.kind() {
            DeviceKind::Tablet => self.confirm_tablet(device),
            DeviceKind::SetTopBox => self.confirm_set_top_box(device),
        };

        match outcome {
            RebootOutcome::Confirmed { attempt } => {
                tracing::info!(dsn = %device.dsn(), attempt, "Device is up after reboot");
            }
            RebootOutcome::Unconfirmed => {
                tracing::warn!(
                    dsn = %device.dsn(),
                    "Device did not reach its idle screen after reboot, continuing"
                );
            }
        }
        Ok(outcome)
    }

    fn confirm_tablet(&self, device: &Device<'_>) -> RebootOutcome {
        let mut budget = RetryBudget::new(self.max_attempts, self.poll_secs);
        while budget.next_attempt() {
            match device.lock_status() {
                Ok(Some(line)) if line.contains(WALLPAPER_SERVICE) => {
                    return RebootOutcome::Confirmed {
                        attempt: budget.current_attempt,
                    };
                }
                // No window reported yet: poll again straight away
                Ok(None) => continue,
                Ok(Some(line)) => {
                    tracing::debug!(dsn = %device.dsn(), window = %line.trim(), "Screen still obscured");
                }
                Err(e) => tracing::warn!(dsn = %device.dsn(), "Lock probe failed: {}", e),
            }
            device.wait_secs(budget.poll_interval_secs);
        }
        RebootOutcome::Unconfirmed
    }

    fn confirm_set_top_box(&self, device: &Device<'_>) -> RebootOutcome {
        let pages = self.landing_pages.identifiers();
        if pages.is_empty() {
            tracing::warn!(dsn = %device.dsn(), "No landing pages configured, cannot confirm boot");
            return RebootOutcome::Unconfirmed;
        }

        let mut rounds = RetryBudget::new(self.max_attempts, self.poll_secs);
        let mut polls = 0;
        while rounds.next_attempt() {
            let mut budget = RetryBudget::new(self.max_attempts, self.poll_secs);
            while budget.next_attempt() {
                polls += 1;
                match device.screen_focus() {
                    Ok(Some(line)) if pages.iter().any(|page| line.contains(page)) => {
                        return RebootOutcome::Confirmed { attempt: polls };
                    }
                    Ok(focus) => {
                        tracing::debug!(dsn = %device.dsn(), focus = ?focus, "Landing page not focused yet");
                    }
                    Err(e) => tracing::warn!(dsn = %device.dsn(), "Focus probe failed: {}", e),
                }
                device.wait_secs(budget.poll_interval_secs);
            }
            tracing::debug!(dsn = %device.dsn(), round = rounds.current_attempt, "Landing page poll round exhausted");
        }
        RebootOutcome::Unconfirmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::fake::ScriptedDevice;
    use crate::device::RecordedWait;

    fn pages() -> LandingPages {
        LandingPages {
            profile_page: "ProfilePickerActivity".to_string(),
            home_page: "HomeActivity".to_string(),
            sign_page: String::new(),
        }
    }

    #[test]
    fn test_tablet_confirmed_on_wallpaper() {
        let fake = ScriptedDevice::new().respond_seq(
            "mObscuringWindow",
            &[
                &["mObscuringWindow=Window{StatusBar}"],
                &["mObscuringWindow=Window{com.android.systemui.ImageWallpaper WallpaperService}"],
            ],
        );
        let wait = RecordedWait::new();
        let device = Device::new(&fake, &wait, "T1", DeviceKind::Tablet, 11);
        let pages = pages();
        let monitor = RebootRecoveryMonitor::new(&Timing::default(), &pages);

        let outcome = monitor.reboot_and_confirm(&device).unwrap();
        assert_eq!(outcome, RebootOutcome::Confirmed { attempt: 2 });
        assert_eq!(fake.count_issued("shell reboot"), 1);
        assert_eq!(wait.total_secs(), 60 + 10);
    }

    #[test]
    fn test_tablet_empty_probe_retries_without_wait() {
        let fake = ScriptedDevice::new();
        let wait = RecordedWait::new();
        let device = Device::new(&fake, &wait, "T1", DeviceKind::Tablet, 11);
        let pages = pages();
        let monitor = RebootRecoveryMonitor::new(&Timing::default(), &pages);

        let outcome = monitor.reboot_and_confirm(&device).unwrap();
        assert_eq!(outcome, RebootOutcome::Unconfirmed);
        assert_eq!(fake.count_issued("mObscuringWindow"), 5);
        assert_eq!(wait.total_secs(), 60);
    }

    #[test]
    fn test_tablet_exhaustion_is_not_an_error() {
        let fake = ScriptedDevice::new().respond("mObscuringWindow", &["mObscuringWindow=Keyguard"]);
        let wait = RecordedWait::new();
        let device = Device::new(&fake, &wait, "T1", DeviceKind::Tablet, 11);
        let pages = pages();
        let monitor = RebootRecoveryMonitor::new(&Timing::default(), &pages);

        let outcome = monitor.reboot_and_confirm(&device).unwrap();
        assert!(!outcome.is_confirmed());
        assert_eq!(fake.count_issued("mObscuringWindow"), 5);
        assert_eq!(wait.total_secs(), 60 + 5 * 10);
    }

    #[test]
    fn test_set_top_box_landing_page() {
        let fake = ScriptedDevice::new().respond_seq(
            "mCurrentFocus",
            &[
                &["mCurrentFocus=null"],
                &["mCurrentFocus=Window{u0 com.example.tv/.HomeActivity}"],
            ],
        );
        let wait = RecordedWait::new();
        let device = Device::new(&fake, &wait, "S1", DeviceKind::SetTopBox, 9);
        let pages = pages();
        let monitor = RebootRecoveryMonitor::new(&Timing::default(), &pages);

        assert_eq!(
            monitor.reboot_and_confirm(&device).unwrap(),
            RebootOutcome::Confirmed { attempt: 2 }
        );
    }

    #[test]
    fn test_set_top_box_exhausts_all_rounds() {
        let fake = ScriptedDevice::new().respond("mCurrentFocus", &["mCurrentFocus=Launcher"]);
        let wait = RecordedWait::new();
        let device = Device::new(&fake, &wait, "S1", DeviceKind::SetTopBox, 9);
        let pages = pages();
        let timing = Timing {
            reboot_max_attempts: 2,
            ..Timing::default()
        };
        let monitor = RebootRecoveryMonitor::new(&timing, &pages);

        assert_eq!(monitor.reboot_and_confirm(&device).unwrap(), RebootOutcome::Unconfirmed);
        assert_eq!(fake.count_issued("mCurrentFocus"), 4);
    }

    #[test]
    fn test_reboot_command_failure_propagates() {
        let fake = ScriptedDevice::new().fail("shell reboot", "device offline");
        let wait = RecordedWait::new();
        let device = Device::new(&fake, &wait, "S1", DeviceKind::SetTopBox, 9);
        let pages = pages();
        let monitor = RebootRecoveryMonitor::new(&Timing::default(), &pages);
        assert!(monitor.reboot_and_confirm(&device).is_err());
    }
}
