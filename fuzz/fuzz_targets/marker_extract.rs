#![no_main]

use libfuzzer_sys::fuzz_target;
use perfkpi::kpi::LatencyKind;
use perfkpi::markers::{
    displayed_value, fully_drawn, parse_bracketed_last_value, parse_delimited_timer,
    parse_displayed_timer, vitals_timer, LogSnapshot,
};

fuzz_target!(|data: &[u8]| {
    // Log dumps are decoded lossily, so any bytes can reach the parsers
    let text = String::from_utf8_lossy(data);
    for line in text.lines() {
        let _ = parse_delimited_timer(line);
        let _ = parse_bracketed_last_value(line);
        let _ = parse_displayed_timer(line);
    }

    let snapshot = LogSnapshot::from_text(&text);
    for kind in [LatencyKind::Cool, LatencyKind::Warm] {
        let _ = vitals_timer(&snapshot, kind, "com.example.app");
    }
    let _ = displayed_value(&snapshot, "com.example.app", Some("com.example.app/.Main"));
    let _ = fully_drawn(&snapshot, "com.example.app", None);
});
