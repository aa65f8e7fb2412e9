//! Launch marker extraction from raw device logs
//!
//! Two grammars are recognized:
//! - Vitals lines: `...performance:cool_app_launch_time...key=<pkg>...Timer=1234.0;...`
//!   carrying an integer millisecond count after `Timer=`.
//! - Event lines: `am_activity_launch_time: [0,42,pkg/.Main,3456,3456]`, whose
//!   last bracketed element is a duration in thousandths of a second.
//!
//! All lookups read a single [`LogSnapshot`] so that primary and fallback
//! marker scans see the same log contents.

use crate::error::{KpiError, Result};
use crate::kpi::LatencyKind;
use std::fmt;
use std::fs;
use std::path::Path;

const TIMER_TAG: &str = "Timer=";
const TIMER_INFO_TAG: &str = "TI";

/// Recognized log marker kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    CoolApp,
    CoolActivity,
    WarmWarmTransition,
    WarmCoolTransition,
    FullyDrawn,
    DisplayedTime,
    /// Vitals-style displayed marker used when no event-log marker exists
    WarmDisplayedTime,
}

impl MarkerKind {
    /// Literal tags; a line carries this marker if it contains any of them
    pub fn tags(self) -> &'static [&'static str] {
        match self {
            Self::CoolApp => &["performance:cool_app_launch_time"],
            Self::CoolActivity => &["performance:cool_activity_launch_time"],
            Self::WarmWarmTransition => &["performance:warm_app_warm_transition_launch_time"],
            Self::WarmCoolTransition => &["performance:warm_app_cool_transition_launch_time"],
            Self::FullyDrawn => &[
                "am_activity_fully_drawn_time:",
                "wm_activity_fully_drawn_time:",
            ],
            Self::DisplayedTime => &["am_activity_launch_time:", "wm_activity_launch_time:"],
            Self::WarmDisplayedTime => &["performance:warm_activity_launch_time:"],
        }
    }

    /// Vitals marker precedence for a latency kind: (primary, fallback)
    pub fn vitals_precedence(kind: LatencyKind) -> (Self, Self) {
        match kind {
            LatencyKind::Cool => (Self::CoolApp, Self::CoolActivity),
            LatencyKind::Warm => (Self::WarmWarmTransition, Self::WarmCoolTransition),
        }
    }

    fn tagged(self, line: &str) -> bool {
        self.tags().iter().any(|tag| line.contains(tag))
    }
}

impl fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tags()[0].trim_end_matches(':'))
    }
}

/// A marker found in a snapshot, converted to seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerValue {
    pub marker: MarkerKind,
    pub seconds: f64,
}

/// One read of a device log buffer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogSnapshot {
    lines: Vec<String>,
}

impl LogSnapshot {
    pub fn from_lines(lines: Vec<String>) -> Self {
        Self { lines }
    }

    pub fn from_text(text: &str) -> Self {
        Self {
            lines: text.lines().map(str::to_string).collect(),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Archive the snapshot, one trimmed line per row
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let mut text = String::with_capacity(self.lines.iter().map(|l| l.len() + 1).sum());
        for line in &self.lines {
            text.push_str(line.trim());
            text.push('\n');
        }
        fs::write(path, text)?;
        Ok(())
    }
}

fn line_matches(line: &str, kind: MarkerKind, keys: &[&str]) -> bool {
    kind.tagged(line) && keys.iter().any(|key| !key.is_empty() && line.contains(key))
}

/// First line carrying `kind` and containing `key`
pub fn find_first_match<'a>(lines: &'a [String], kind: MarkerKind, key: &str) -> Option<&'a str> {
    find_first_match_any(lines, kind, &[key])
}

/// First line carrying `kind` and containing any of `keys`
pub fn find_first_match_any<'a>(
    lines: &'a [String],
    kind: MarkerKind,
    keys: &[&str],
) -> Option<&'a str> {
    lines
        .iter()
        .map(String::as_str)
        .find(|line| line_matches(line, kind, keys))
}

/// Most recent line carrying `kind` and containing `key`
pub fn find_last_match<'a>(lines: &'a [String], kind: MarkerKind, key: &str) -> Option<&'a str> {
    lines
        .iter()
        .rev()
        .map(String::as_str)
        .find(|line| line_matches(line, kind, &[key]))
}

/// Parse the `Timer=<ms>;` field of a vitals line
///
/// Returns `Ok(None)` when the line has no timer field and `Err(Parse)` when
/// the field is present but not an integer (after stripping one `.0`).
pub fn parse_delimited_timer(line: &str) -> Result<Option<u64>> {
    let Some((_, rest)) = line.split_once(TIMER_TAG) else {
        return Ok(None);
    };
    let field = rest.split(';').next().unwrap_or_default().trim();
    let digits = field.strip_suffix(".0").unwrap_or(field);
    digits
        .parse::<u64>()
        .map(Some)
        .map_err(|e| KpiError::parse(field, e))
}

/// Timer milliseconds from a vitals line; malformed values count as not found
pub fn extract_delimited_timer(line: &str) -> Option<u64> {
    match parse_delimited_timer(line) {
        Ok(value) => value,
        Err(e) => {
            tracing::error!("Failed to read timer value from logs: {}", e);
            None
        }
    }
}

/// Parse the `Timer=<ms>[.frac]TI...` field of a warm displayed vitals line
///
/// The value runs up to the `TI` field and any fraction is truncated.
pub fn parse_displayed_timer(line: &str) -> Result<Option<u64>> {
    let Some((_, rest)) = line.split_once(TIMER_TAG) else {
        return Ok(None);
    };
    let field = rest.split(TIMER_INFO_TAG).next().unwrap_or_default();
    let whole = field.split('.').next().unwrap_or_default().trim();
    whole
        .parse::<u64>()
        .map(Some)
        .map_err(|e| KpiError::parse(field.trim(), e))
}

/// Parse the last element of the first `[...]` group, in thousandths of a second
pub fn parse_bracketed_last_value(line: &str) -> Result<Option<f64>> {
    let Some(open) = line.find('[') else {
        return Ok(None);
    };
    let inner = &line[open + 1..];
    let Some(close) = inner.find(']') else {
        return Ok(None);
    };
    let last = inner[..close].rsplit(',').next().unwrap_or_default().trim();
    let thousandths = last.parse::<u64>().map_err(|e| KpiError::parse(last, e))?;
    Ok(Some(thousandths as f64 / 1000.0))
}

/// Seconds from an event-log bracketed list; malformed values count as not found
pub fn extract_bracketed_last_value(line: &str) -> Option<f64> {
    match parse_bracketed_last_value(line) {
        Ok(value) => value,
        Err(e) => {
            tracing::error!("Failed to read bracketed marker value: {}", e);
            None
        }
    }
}

/// Vitals launch timer for `package`
///
/// The primary marker is scanned to the end of the snapshot; the fallback is
/// consulted only when the primary marker is absent. A primary marker whose
/// timer is malformed is a loss and does not trigger the fallback.
pub fn vitals_timer(snapshot: &LogSnapshot, kind: LatencyKind, package: &str) -> Option<MarkerValue> {
    let key = format!("key={}", package);
    let (primary, fallback) = MarkerKind::vitals_precedence(kind);

    let (marker, line) = match find_last_match(snapshot.lines(), primary, &key) {
        Some(line) => (primary, line),
        None => (fallback, find_first_match(snapshot.lines(), fallback, &key)?),
    };

    let millis = extract_delimited_timer(line)?;
    Some(MarkerValue {
        marker,
        seconds: millis as f64 / 1000.0,
    })
}

/// Displayed (first frame) time for the launched activity
pub fn displayed_value(
    snapshot: &LogSnapshot,
    package: &str,
    intent: Option<&str>,
) -> Option<MarkerValue> {
    let keys = match_keys(package, intent);

    if let Some(line) = find_first_match_any(snapshot.lines(), MarkerKind::DisplayedTime, &keys) {
        tracing::debug!("Displayed marker present for {}", package);
        return extract_bracketed_last_value(line).map(|seconds| MarkerValue {
            marker: MarkerKind::DisplayedTime,
            seconds,
        });
    }

    let line = find_first_match_any(snapshot.lines(), MarkerKind::WarmDisplayedTime, &keys)?;
    tracing::debug!("Warm displayed marker present for {}", package);
    let millis = match parse_displayed_timer(line) {
        Ok(value) => value?,
        Err(e) => {
            tracing::error!("Failed to read displayed timer from logs: {}", e);
            return None;
        }
    };
    Some(MarkerValue {
        marker: MarkerKind::WarmDisplayedTime,
        seconds: millis as f64 / 1000.0,
    })
}

/// Fully drawn (ready to use) marker, if the app reports one
///
/// A present marker with an unreadable value is reported with `0.0` seconds.
pub fn fully_drawn(snapshot: &LogSnapshot, package: &str, intent: Option<&str>) -> Option<MarkerValue> {
    let keys = match_keys(package, intent);
    let line = find_first_match_any(snapshot.lines(), MarkerKind::FullyDrawn, &keys)?;
    tracing::debug!(marker = %line, "Fully drawn marker present for {}", package);
    Some(MarkerValue {
        marker: MarkerKind::FullyDrawn,
        seconds: extract_bracketed_last_value(line).unwrap_or(0.0),
    })
}

fn match_keys<'a>(package: &'a str, intent: Option<&'a str>) -> Vec<&'a str> {
    intent.into_iter().chain(std::iter::once(package)).collect()
}
