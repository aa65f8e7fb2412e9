//! perfkpi - App launch latency KPIs for Android tablets and TV devices
//!
//! This library drives devices over adb, measures cool and warm launch
//! latency from logcat and vitals markers, aggregates per-iteration samples
//! into TP50/TP90 statistics, and appends one CSV row per KPI run.

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod csv_output;
pub mod device;
pub mod error;
pub mod json_output;
pub mod kpi;
pub mod launch;
pub mod markers;
pub mod reboot;
pub mod retry;
pub mod runner;
pub mod setup;
