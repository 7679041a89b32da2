use std::path::Path;
use std::rc::Rc;
use std::sync::{Mutex, Once};

use anyhow::{anyhow, Result};
use chrono::{Local, TimeZone};
use log::{Level, LevelFilter, Log, Metadata, Record};

use snapshot_counter::{CounterConfig, ManualClock, SnapshotCounter, SnapshotSource, StubBackend};

struct CaptureLogger {
    lines: Mutex<Vec<(Level, String)>>,
}

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        self.lines
            .lock()
            .unwrap()
            .push((record.level(), record.args().to_string()));
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger {
    lines: Mutex::new(Vec::new()),
};
static INSTALL: Once = Once::new();

fn captured(containing: &str) -> Vec<(Level, String)> {
    INSTALL.call_once(|| {
        log::set_logger(&LOGGER).unwrap();
        log::set_max_level(LevelFilter::Trace);
    });
    LOGGER
        .lines
        .lock()
        .unwrap()
        .iter()
        .filter(|(_, line)| line.contains(containing))
        .cloned()
        .collect()
}

struct FixedSource {
    fail: bool,
}

impl SnapshotSource for FixedSource {
    fn describe(&self) -> String {
        "fixed".to_string()
    }

    fn fetch(&mut self) -> Result<Vec<u8>> {
        if self.fail {
            Err(anyhow!("HTTP 503 Service Unavailable"))
        } else {
            Ok(b"\xFF\xD8snapshot\xFF\xD9".to_vec())
        }
    }
}

fn counter(folder: &Path, fail: bool, hour: u32) -> SnapshotCounter {
    let mut cfg = CounterConfig::default();
    cfg.folder = folder.to_path_buf();
    SnapshotCounter::new(
        &cfg,
        Box::new(FixedSource { fail }),
        Box::new(StubBackend::new()),
        Rc::new(ManualClock::starting_at(
            Local.with_ymd_and_hms(2024, 6, 15, hour, 0, 0).unwrap(),
        )),
    )
    .unwrap()
}

#[test]
fn failed_cycle_logs_error_with_cycle_timestamp() {
    captured("");
    let dir = tempfile::tempdir().unwrap();

    counter(dir.path(), true, 17).run_cycle();

    let lines = captured("[20240615_170000]");
    let errors: Vec<&String> = lines
        .iter()
        .filter(|(level, _)| *level == Level::Error)
        .map(|(_, line)| line)
        .collect();
    assert_eq!(errors.len(), 1, "captured: {:?}", lines);
    assert!(errors[0].starts_with("[20240615_170000] Error:"));
    assert!(errors[0].contains("503"));
}

#[test]
fn successful_cycle_logs_counts_with_cycle_timestamp() {
    captured("");
    let dir = tempfile::tempdir().unwrap();

    counter(dir.path(), false, 19).run_cycle();

    let lines = captured("[20240615_190000]");
    assert!(lines
        .iter()
        .any(|(level, line)| *level == Level::Info && line.contains("Counts: person=0")));
    assert!(lines.iter().all(|(level, _)| *level != Level::Error));
}

#[test]
fn undeletable_image_is_reported_once() {
    captured("");
    let dir = tempfile::tempdir().unwrap();
    // A non-empty directory where the snapshot should go: the write fails and
    // so does the cleanup.
    let blocker = dir.path().join("20240615_180000.jpg");
    std::fs::create_dir(&blocker).unwrap();
    std::fs::write(blocker.join("keep"), b"x").unwrap();

    counter(dir.path(), false, 18).run_cycle();

    let warnings: Vec<(Level, String)> = captured("20240615_180000.jpg")
        .into_iter()
        .filter(|(level, line)| {
            *level == Level::Warn && line.contains("failed to remove temporary image")
        })
        .collect();
    assert_eq!(warnings.len(), 1, "captured: {:?}", warnings);
}
