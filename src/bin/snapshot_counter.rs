//! snapshot_counter - traffic camera snapshot counter
//!
//! Every interval this process:
//! 1. Downloads one snapshot from the configured camera URL
//! 2. Runs the detector on it
//! 3. Appends person/vehicle counts to the CSV ledger
//! 4. Deletes the snapshot
//!
//! Runs until interrupted. Configuration comes from `COUNTER_CONFIG` (JSON)
//! and `COUNTER_*` environment variables; there are no command-line flags.

use anyhow::{Context, Result};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use snapshot_counter::{
    build_backend, CounterConfig, HttpSnapshotSource, Repeater, SnapshotCounter, SnapshotSource,
    SystemClock,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stdout)
        .init();

    let cfg = CounterConfig::load()?;

    std::fs::create_dir_all(&cfg.folder)
        .with_context(|| format!("failed to create working folder {}", cfg.folder.display()))?;

    let mut detector = build_backend(&cfg.detector)?;
    detector.warm_up()?;
    log::info!(
        "detector backend={} model={}",
        detector.name(),
        cfg.detector.model_path.display()
    );

    let source = HttpSnapshotSource::new(cfg.url.clone(), cfg.timeout);
    log::info!(
        "snapshot source={} timeout={}s",
        source.describe(),
        cfg.timeout.as_secs()
    );

    let mut counter = SnapshotCounter::new(&cfg, Box::new(source), detector, Rc::new(SystemClock))?;
    match counter.ledger().read_rows() {
        Ok(rows) => log::info!(
            "ledger {} holds {} rows",
            counter.ledger().path().display(),
            rows.len()
        ),
        Err(e) => log::warn!("ledger {} not readable: {:#}", counter.ledger().path().display(), e),
    }

    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        handler_stop.store(true, Ordering::SeqCst);
    })
    .context("failed to install signal handler")?;

    log::info!(
        "snapshot_counter running every {}s",
        cfg.interval.as_secs()
    );
    let cycles = counter.run(&Repeater::new(cfg.interval), &stop, None);

    let stats = counter.stats();
    log::info!(
        "stopped after {} cycles ({} counted, {} failed)",
        cycles,
        stats.counted,
        stats.failed
    );
    Ok(())
}
