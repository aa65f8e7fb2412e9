// Integration test utilities
//
// A scripted stand-in for adb: commands are answered by substring rules,
// first matching rule wins, unmatched commands return no output.

#![allow(dead_code)]

use perfkpi::device::DeviceControl;
use perfkpi::error::{KpiError, Result};
use std::sync::Mutex;

#[derive(Default)]
pub struct FakeAdb {
    rules: Vec<(String, std::result::Result<Vec<String>, String>)>,
    issued: Mutex<Vec<String>>,
}

impl FakeAdb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, needle: &str, lines: &[&str]) -> Self {
        let lines = lines.iter().map(|l| l.to_string()).collect();
        self.rules.push((needle.to_string(), Ok(lines)));
        self
    }

    pub fn fail(mut self, needle: &str, reason: &str) -> Self {
        self.rules.push((needle.to_string(), Err(reason.to_string())));
        self
    }

    pub fn count_issued(&self, needle: &str) -> usize {
        self.issued
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.contains(needle))
            .count()
    }
}

impl DeviceControl for FakeAdb {
    fn execute(&self, _dsn: &str, command: &str) -> Result<Vec<String>> {
        self.issued.lock().unwrap().push(command.to_string());
        match self.rules.iter().find(|(needle, _)| command.contains(needle.as_str())) {
            Some((_, Ok(lines))) => Ok(lines.clone()),
            Some((_, Err(reason))) => Err(KpiError::command(command, reason.clone())),
            None => Ok(Vec::new()),
        }
    }
}

pub const PKG: &str = "com.example.app";

/// Tablet on Android 11 with the app installed and healthy launch markers
pub fn healthy_tablet() -> FakeAdb {
    FakeAdb::new()
        .respond("ro.build.configuration", &["tablet"])
        .respond("ro.build.version.release", &["11"])
        .respond("ro.product.name", &["trona"])
        .respond("ro.build.version.name", &["Fire OS 8.3.2.1"])
        .respond("battery", &["  level: 85"])
        .respond("mObscuringWindow", &["mObscuringWindow=null"])
        .respond("pm list packages -3", &["package:com.example.app"])
        .respond("versionName", &["    versionName=4.2.1"])
        .respond("versionCode", &["    versionCode=421 minSdk=21 targetSdk=33"])
        .respond(
            "MAIN",
            &["android.intent.action.MAIN:", "  1a2b com.example.app/.MainActivity filter 3c"],
        )
        .respond("monkey", &["Events injected: 1"])
        .respond("uiautomator", &["<node package=\"com.example.app\" />"])
        .respond(
            "-b vitals -d",
            &[
                "I/Vitals: performance:cool_app_launch_time key=com.example.app Timer=1250.0;",
                "I/Vitals: performance:warm_app_warm_transition_launch_time key=com.example.app Timer=500.0;",
            ],
        )
        .respond("cpuinfo", &["40% TOTAL: 25% user + 15% kernel"])
        .respond("meminfo", &["  204,800K: com.example.app (pid 4321 / activities)"])
}
