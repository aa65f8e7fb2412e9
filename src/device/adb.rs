//! `adb` process channel

use super::DeviceControl;
use crate::error::{KpiError, Result};
use std::path::PathBuf;
use std::process::Command;

/// Runs each command as `adb -s <dsn> <tokens...>` and collects stdout lines
#[derive(Debug, Clone)]
pub struct AdbChannel {
    program: PathBuf,
}

impl AdbChannel {
    /// Use an explicit adb binary, or `adb` to resolve it from `PATH`
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl DeviceControl for AdbChannel {
    fn execute(&self, dsn: &str, command: &str) -> Result<Vec<String>> {
        tracing::trace!(dsn, command, "adb");
        let output = Command::new(&self.program)
            .arg("-s")
            .arg(dsn)
            .args(command.split_whitespace())
            .output()
            .map_err(|e| KpiError::command(command, e.to_string()))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        // A failing `| grep` exits non-zero with nothing on stderr: that is an empty result
        if !output.status.success() && !stderr.trim().is_empty() {
            return Err(KpiError::command(
                command,
                format!("{}: {}", output.status, stderr.trim()),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(|line| line.trim_end_matches('\r').to_string())
            .collect())
    }
}
