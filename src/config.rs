//! Run configuration (`perfkpi.toml`)
//!
//! Keys are snake_case; the camelCase names used by older capability files
//! (`latencyIterations`, `extraIterations`, ...) are accepted as aliases.
//!
//! # Example
//! ```
//! use perfkpi::config::KpiConfig;
//!
//! let config = KpiConfig::from_toml_str(r#"
//!     app_package = "com.example.app"
//!     latencyIterations = 3
//! "#).unwrap();
//! assert_eq!(config.latency_iterations, 3);
//! assert_eq!(config.extra_iterations, 3);
//! assert!(config.validate().is_ok());
//! ```

use crate::error::KpiError;
use crate::retry::RetryPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KpiConfig {
    /// Package expected to be installed on the device
    #[serde(alias = "appPackage")]
    pub app_package: String,

    /// Measured launch cycles per latency type
    #[serde(alias = "latencyIterations")]
    pub latency_iterations: usize,

    /// Cold-launch pre-validation cycles; at least 2 must validate
    #[serde(alias = "extraIterations")]
    pub extra_iterations: usize,

    /// Seconds between launch and capture in a measured cycle
    #[serde(alias = "latencyWait")]
    pub latency_wait: u64,

    #[serde(alias = "retryCount")]
    pub retry_count: u32,

    #[serde(alias = "maxRetryCount")]
    pub max_retry_count: u32,

    /// Reboot the device before the first KPI run
    #[serde(alias = "rebootDevice")]
    pub reboot_device: bool,

    /// KPI CSV appended by every run
    #[serde(alias = "kpiValuesCsv")]
    pub kpi_values_csv: PathBuf,

    /// Archive each measured cycle's logcat here when set
    #[serde(alias = "adbLogDir")]
    pub adb_log_dir: Option<PathBuf>,

    #[serde(alias = "landingPages")]
    pub landing_pages: LandingPages,

    pub timing: Timing,
}

/// Focus window identifiers that prove a set-top box finished booting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandingPages {
    #[serde(alias = "profilePage")]
    pub profile_page: String,
    #[serde(alias = "homePage")]
    pub home_page: String,
    #[serde(alias = "signPage")]
    pub sign_page: String,
}

impl LandingPages {
    /// Configured identifiers, empty ones skipped
    pub fn identifiers(&self) -> Vec<&str> {
        [&self.profile_page, &self.home_page, &self.sign_page]
            .into_iter()
            .map(|page| page.trim())
            .filter(|page| !page.is_empty())
            .collect()
    }
}

/// Settle and polling delays, in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    pub prevalidation_settle_secs: u64,
    pub reboot_settle_secs: u64,
    pub reboot_poll_secs: u64,
    pub reboot_max_attempts: u32,
    pub warm_background_settle_secs: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            prevalidation_settle_secs: 30,
            reboot_settle_secs: 60,
            reboot_poll_secs: 10,
            reboot_max_attempts: 5,
            warm_background_settle_secs: 10,
        }
    }
}

impl Default for KpiConfig {
    fn default() -> Self {
        Self {
            app_package: String::new(),
            latency_iterations: 5,
            extra_iterations: 3,
            latency_wait: 10,
            retry_count: 0,
            max_retry_count: 1,
            reboot_device: false,
            kpi_values_csv: PathBuf::from("output/kpi_values.csv"),
            adb_log_dir: None,
            landing_pages: LandingPages::default(),
            timing: Timing::default(),
        }
    }
}

impl KpiConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML")
    }

    /// Check bounds that the capture pipeline relies on
    pub fn validate(&self) -> std::result::Result<(), KpiError> {
        if self.app_package.trim().is_empty() {
            return Err(KpiError::Config("app_package must be set".to_string()));
        }
        if self.latency_iterations < 1 {
            return Err(KpiError::Config(format!(
                "latency_iterations must be at least 1, got {}",
                self.latency_iterations
            )));
        }
        if self.extra_iterations < 2 {
            return Err(KpiError::Config(format!(
                "extra_iterations must be at least 2, got {}",
                self.extra_iterations
            )));
        }
        if self.timing.reboot_max_attempts < 1 {
            return Err(KpiError::Config(
                "timing.reboot_max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_count, self.max_retry_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = KpiConfig::default();
        assert_eq!(config.latency_iterations, 5);
        assert_eq!(config.timing.prevalidation_settle_secs, 30);
        assert_eq!(config.timing.reboot_settle_secs, 60);
        assert_eq!(config.timing.reboot_max_attempts, 5);
        assert!(config.adb_log_dir.is_none());
    }

    #[test]
    fn test_camel_case_aliases() {
        let config = KpiConfig::from_toml_str(
            r#"
            appPackage = "com.example.app"
            latencyIterations = 7
            extraIterations = 4
            latencyWait = 3
            maxRetryCount = 2

            [landingPages]
            homePage = "HomeActivity"
            "#,
        )
        .unwrap();
        assert_eq!(config.app_package, "com.example.app");
        assert_eq!(config.latency_iterations, 7);
        assert_eq!(config.extra_iterations, 4);
        assert_eq!(config.latency_wait, 3);
        assert_eq!(config.retry_policy(), RetryPolicy::new(0, 2));
        assert_eq!(config.landing_pages.identifiers(), vec!["HomeActivity"]);
    }

    #[test]
    fn test_timing_section() {
        let config = KpiConfig::from_toml_str(
            r#"
            app_package = "com.example.app"
            [timing]
            reboot_settle_secs = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.timing.reboot_settle_secs, 5);
        assert_eq!(config.timing.reboot_poll_secs, 10);
    }

    #[test]
    fn test_validate_rejects_bad_bounds() {
        let mut config = KpiConfig {
            app_package: "com.example.app".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        config.extra_iterations = 1;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, KpiError::Config(ref msg) if msg.contains("extra_iterations")));

        config.extra_iterations = 2;
        config.latency_iterations = 0;
        assert!(config.validate().unwrap_err().to_string().contains("latency_iterations"));

        config.latency_iterations = 1;
        config.app_package = "  ".to_string();
        assert!(config.validate().unwrap_err().to_string().contains("app_package"));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(KpiConfig::from_toml_str("latency_iterations = \"many\"").is_err());
    }

    #[test]
    fn test_from_file_missing() {
        let err = KpiConfig::from_file("/nonexistent/perfkpi.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
