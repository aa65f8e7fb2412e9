//! Per-device session state
//!
//! Everything a KPI run needs to know about the device and the app under test
//! lives here. One value exists per device session and is owned by the
//! thread driving that device.

use serde::Serialize;
use std::fmt;

/// Failure reason reported when a run has not failed
pub const NO_FAILURE: &str = "NA";

/// Device families with distinct launch and recovery behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DeviceKind {
    Tablet,
    SetTopBox,
}

impl DeviceKind {
    /// Map `ro.build.configuration` (`tv` or `tablet`)
    pub fn from_build_configuration(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tablet" => Some(Self::Tablet),
            "tv" => Some(Self::SetTopBox),
            _ => None,
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tablet => f.write_str("Tablet"),
            Self::SetTopBox => f.write_str("SetTopBox"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceSessionState {
    pub dsn: String,
    pub kind: DeviceKind,
    pub display_name: String,
    pub os_major: u32,
    pub os_build: String,
    pub app_package: Option<String>,
    pub app_version: Option<String>,
    pub app_intent: Option<String>,
    failure_reason: Option<String>,
}

impl DeviceSessionState {
    pub fn new(dsn: impl Into<String>, kind: DeviceKind, os_major: u32) -> Self {
        let dsn = dsn.into();
        Self {
            display_name: dsn.clone(),
            dsn,
            kind,
            os_major,
            os_build: NO_FAILURE.to_string(),
            app_package: None,
            app_version: None,
            app_intent: None,
            failure_reason: None,
        }
    }

    /// Current failure reason, `NA` when none is set
    pub fn failure_reason(&self) -> &str {
        self.failure_reason.as_deref().unwrap_or(NO_FAILURE)
    }

    pub fn has_failed(&self) -> bool {
        self.failure_reason.is_some()
    }

    pub fn set_failure(&mut self, reason: impl Into<String>) {
        self.failure_reason = Some(reason.into());
    }

    /// Record a reason unless a more specific one is already set
    pub fn set_failure_if_unset(&mut self, reason: impl Into<String>) {
        if !self.has_failed() {
            self.set_failure(reason);
        }
    }

    pub fn clear_failure(&mut self) {
        self.failure_reason = None;
    }

    /// App version for the output row, `NA` when unknown
    pub fn version_or_na(&self) -> &str {
        self.app_version.as_deref().unwrap_or(NO_FAILURE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_kind_from_configuration() {
        assert_eq!(DeviceKind::from_build_configuration("tv"), Some(DeviceKind::SetTopBox));
        assert_eq!(DeviceKind::from_build_configuration("tablet\n"), Some(DeviceKind::Tablet));
        assert_eq!(DeviceKind::from_build_configuration("phone"), None);
    }

    #[test]
    fn test_failure_reason_defaults_to_na() {
        let session = DeviceSessionState::new("G0K0", DeviceKind::Tablet, 11);
        assert_eq!(session.failure_reason(), "NA");
        assert!(!session.has_failed());
    }

    #[test]
    fn test_set_failure_if_unset_keeps_first_reason() {
        let mut session = DeviceSessionState::new("G0K0", DeviceKind::Tablet, 11);
        session.set_failure_if_unset("APP Failed to Install");
        session.set_failure_if_unset("There is an exception in latency KPI Method");
        assert_eq!(session.failure_reason(), "APP Failed to Install");
        session.clear_failure();
        assert_eq!(session.failure_reason(), "NA");
    }
}
