//! End-to-end runs of the update loop through the public API.

use std::fs;
use std::path::Path;
use std::time::Duration;

use httpmock::prelude::*;
use serde_json::Value;
use stat_matrix::daemon::loop_main::FetchOutcome;
use stat_matrix::logger::jsonl::JsonlConfig;
use stat_matrix::prelude::*;

const REFERENCE: &str = r#"
api_url = "http://127.0.0.1:5000/data"
update_interval = 0.5
keep_values_on_fail = 2

[logging]
enabled = false

[data.CPU]
unit = "%"
placeholder = "0"
max_length = 3
thresholds = { high = [90, 0xFF0000], med = [50, 0xFFFF00], low = [0, 0x00FF00] }

[data.RAM]
unit = "%"
placeholder = "0"
max_length = 3
thresholds = { high = [70, 0xFF0000], med = [50, 0xFFFF00], low = [10, 0x00FF00] }

[data.Temp]
unit = "C"
max_length = 3
thresholds = { high = [70, 0xFF0000], med = [60, 0xFFFF00], low = [40, 0x00FF00] }
"#;

fn activity_at(path: &Path) -> JsonlActivity {
    JsonlActivity::open(JsonlConfig {
        path: path.to_path_buf(),
        fallback_path: None,
        max_size_bytes: 1 << 20,
        max_rotated_files: 1,
    })
}

fn logged_events(path: &Path) -> Vec<Value> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn value_text(frame: &Frame, row: usize) -> String {
    frame.labels[row * 2 + 1].text.trim().to_string()
}

fn key_text(frame: &Frame, row: usize) -> String {
    frame.labels[row * 2].text.trim().to_string()
}

fn full(cpu: i64, ram: i64, temp: i64) -> MetricSnapshot {
    MetricSnapshot::new()
        .with("CPU", cpu)
        .with("RAM", ram)
        .with("Temp", temp)
}

#[test]
fn outage_and_recovery_are_rendered_and_logged() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("activity.jsonl");

    let config = Config::from_toml(REFERENCE).unwrap();
    let mut update_loop = UpdateLoop::new(&config).unwrap();
    let mut source = ScriptedSource::new()
        .then_ok(full(95, 42, 65))
        .then_fail(3)
        .then_ok(MetricSnapshot::new().with("CPU", 20).with("RAM", 75))
        .then_ok(full(10, 10, 80));
    let mut surface = RecordingSurface::new();
    let mut clock = ManualClock::new();
    let mut sink = activity_at(&log_path);

    let summary = update_loop.run(
        &mut source,
        &mut surface,
        &mut clock,
        &mut sink,
        &mut CycleBudget(6),
    );

    assert_eq!(summary.cycles, 6);
    assert_eq!(summary.reason, "cycle budget reached");
    assert_eq!(clock.sleeps(), [Duration::from_millis(500); 5]);

    let frames = surface.frames();
    assert_eq!(frames.len(), 6);

    // Cycle 1: live values, threshold colors.
    assert_eq!(value_text(&frames[0], 0), "95%");
    assert_eq!(frames[0].labels[1].color, Color::RED);
    assert_eq!(frames[0].labels[3].color, Color::GREEN);
    assert_eq!(frames[0].labels[5].color, Color::YELLOW);

    // Cycle 2: first failure is tolerated, frame unchanged.
    assert_eq!(frames[1], frames[0]);

    // Cycles 3 and 4: past tolerance, placeholders and a blank row.
    for frame in &frames[2..4] {
        assert_eq!(value_text(frame, 0), "0%");
        assert_eq!(value_text(frame, 1), "0%");
        assert_eq!(key_text(frame, 2), "");
        assert_eq!(value_text(frame, 2), "");
    }

    // Cycle 5: partial payload, Temp keeps its blank within tolerance.
    assert_eq!(value_text(&frames[4], 0), "20%");
    assert_eq!(value_text(&frames[4], 1), "75%");
    assert_eq!(frames[4].labels[3].color, Color::RED);
    assert_eq!(value_text(&frames[4], 2), "");

    // Cycle 6: everything back.
    assert_eq!(key_text(&frames[5], 2), "Temp:");
    assert_eq!(value_text(&frames[5], 2), "80C");
    assert_eq!(update_loop.state().consecutive_failures, 0);

    let events: Vec<String> = logged_events(&log_path)
        .iter()
        .map(|entry| entry["event"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        events,
        [
            "loop_start",
            "fetch_failed",
            "row_fallback",
            "row_fallback",
            "row_fallback",
            "row_recovered",
            "row_recovered",
            "row_recovered",
            "loop_stop",
        ]
    );

    let entries = logged_events(&log_path);
    assert_eq!(entries[1]["consecutive_failures"], 1);
    assert_eq!(entries[1]["error_code"], "SMX-2001");
    assert_eq!(entries[4]["key"], "Temp");
    assert!(entries[4].get("placeholder").is_none());
    assert_eq!(entries[8]["cycles"], 6);
}

#[test]
fn http_outage_falls_back_then_recovers() {
    let server = MockServer::start();
    let mut healthy = server.mock(|when, then| {
        when.method(GET).path("/data");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"CPU": 55, "RAM": "60", "Temp": 41}"#);
    });

    let toml = REFERENCE
        .replace("http://127.0.0.1:5000/data", &server.url("/data"))
        .replace("keep_values_on_fail = 2", "keep_values_on_fail = 1");
    let config = Config::from_toml(&toml).unwrap();
    let mut update_loop = UpdateLoop::new(&config).unwrap();
    let mut source = HttpMetricsSource::from_config(&config).unwrap();
    let mut surface = RecordingSurface::new();
    let mut sink = NullActivity;

    let first = update_loop.tick(&mut source, &mut surface, &mut sink);
    assert_eq!(first.fetch, FetchOutcome::Ok { metrics: 3 });
    assert_eq!(first.rows, [RowOutcome::Live; 3]);
    healthy.assert_hits(1);
    healthy.delete();

    let mut broken = server.mock(|when, then| {
        when.method(GET).path("/data");
        then.status(503).body("maintenance");
    });
    let second = update_loop.tick(&mut source, &mut surface, &mut sink);
    assert!(!second.fetch.is_ok());
    assert_eq!(second.rows, [RowOutcome::Placeholder, RowOutcome::Placeholder, RowOutcome::Blanked]);
    assert_eq!(second.consecutive_failures, 1);
    broken.assert_hits(1);
    broken.delete();

    server.mock(|when, then| {
        when.method(GET).path("/data");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"CPU": 91}"#);
    });
    let third = update_loop.tick(&mut source, &mut surface, &mut sink);
    assert_eq!(third.fetch, FetchOutcome::Ok { metrics: 1 });
    assert_eq!(third.rows[0], RowOutcome::Live);

    let frame = surface.last().unwrap();
    assert_eq!(value_text(frame, 0), "91%");
    assert_eq!(frame.labels[1].color, Color::RED);
}

#[test]
fn per_row_scope_tracks_rows_independently() {
    let toml = format!("failure_scope = \"per_row\"\n{REFERENCE}");
    let config = Config::from_toml(&toml).unwrap();
    let mut update_loop = UpdateLoop::new(&config).unwrap();
    let mut source = ScriptedSource::new()
        .then_ok(full(1, 20, 50))
        .then_ok(MetricSnapshot::new().with("CPU", 2))
        .then_ok(MetricSnapshot::new().with("CPU", 3));
    let mut surface = RecordingSurface::new();
    let mut clock = ManualClock::new();
    let mut sink = MemoryActivity::new();

    update_loop.run(
        &mut source,
        &mut surface,
        &mut clock,
        &mut sink,
        &mut CycleBudget(3),
    );

    let last = surface.last().unwrap();
    assert_eq!(value_text(last, 0), "3%");
    assert_eq!(value_text(last, 1), "0%");
    assert_eq!(value_text(last, 2), "");
    assert_eq!(update_loop.state().consecutive_failures, 0);

    let fallbacks: Vec<&str> = sink
        .events()
        .iter()
        .filter_map(|event| match event {
            ActivityEvent::RowFallback { key, .. } => Some(key.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(fallbacks, ["RAM", "Temp"]);
}
