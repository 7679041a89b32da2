//! The snapshot counting cycle.
//!
//! One cycle fetches a snapshot, writes it to a timestamped temporary file,
//! runs the detector on it, tallies the mapped classes and appends one row to
//! the ledger. Any failure is logged with the cycle timestamp and swallowed;
//! the temporary image is removed on every path.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::atomic::AtomicBool;
use thiserror::Error;

use crate::class_map::ClassMap;
use crate::config::CounterConfig;
use crate::detect::DetectorBackend;
use crate::ledger::Ledger;
use crate::schedule::{Clock, Repeater};
use crate::snapshot::{SnapshotSource, TempImage};
use crate::tally::{tally, CountRow, Timestamp};

/// Failure of a single cycle. Never fatal to the loop.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("network error: {0:#}")]
    Network(#[source] anyhow::Error),
    #[error("file I/O error on {}: {source:#}", path.display())]
    FileIo {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
    #[error("inference error: {0:#}")]
    Inference(#[source] anyhow::Error),
}

impl CycleError {
    fn file_io(path: &Path, source: impl Into<anyhow::Error>) -> Self {
        CycleError::FileIo {
            path: path.to_path_buf(),
            source: source.into(),
        }
    }
}

#[derive(Debug)]
pub enum CycleOutcome {
    Counted(CountRow),
    Failed {
        timestamp: Timestamp,
        error: CycleError,
    },
}

impl CycleOutcome {
    pub fn timestamp(&self) -> &Timestamp {
        match self {
            CycleOutcome::Counted(row) => &row.timestamp,
            CycleOutcome::Failed { timestamp, .. } => timestamp,
        }
    }

    pub fn is_counted(&self) -> bool {
        matches!(self, CycleOutcome::Counted(_))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub cycles: u64,
    pub counted: u64,
    pub failed: u64,
}

pub struct SnapshotCounter {
    folder: PathBuf,
    ledger: Ledger,
    class_map: ClassMap,
    source: Box<dyn SnapshotSource>,
    detector: Box<dyn DetectorBackend>,
    clock: Rc<dyn Clock>,
    stats: CycleStats,
}

impl SnapshotCounter {
    /// Open the ledger (writing its header if needed) and take ownership of
    /// the snapshot source and detector for the lifetime of the loop.
    ///
    /// The working folder must already exist.
    pub fn new(
        config: &CounterConfig,
        source: Box<dyn SnapshotSource>,
        detector: Box<dyn DetectorBackend>,
        clock: Rc<dyn Clock>,
    ) -> Result<Self> {
        let ledger = Ledger::open(config.ledger_path())?;
        Ok(Self {
            folder: config.folder.clone(),
            ledger,
            class_map: ClassMap::coco(),
            source,
            detector,
            clock,
            stats: CycleStats::default(),
        })
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn stats(&self) -> CycleStats {
        self.stats
    }

    /// Run one full cycle. Never returns an error; see `CycleOutcome`.
    pub fn run_cycle(&mut self) -> CycleOutcome {
        let timestamp = Timestamp::from_datetime(&self.clock.now());
        let image = TempImage::claim(self.folder.join(timestamp.image_file_name()));

        let result = self.fetch_and_count(&timestamp, &image);

        let image_path = image.path().to_path_buf();
        if let Err(err) = image.release() {
            log::warn!(
                "[{}] failed to remove temporary image {}: {}",
                timestamp,
                image_path.display(),
                err
            );
        }

        self.stats.cycles += 1;
        let outcome = match result {
            Ok(row) => {
                self.stats.counted += 1;
                log::info!("[{}] Counts: {}", timestamp, row);
                CycleOutcome::Counted(row)
            }
            Err(error) => {
                self.stats.failed += 1;
                log::error!("[{}] Error: {}", timestamp, error);
                CycleOutcome::Failed { timestamp, error }
            }
        };
        log::debug!(
            "cycles={} counted={} failed={}",
            self.stats.cycles,
            self.stats.counted,
            self.stats.failed
        );
        outcome
    }

    /// Run cycles on `repeater`'s interval until `stop` is raised or `limit`
    /// cycles have completed. Returns the number of cycles run.
    pub fn run(&mut self, repeater: &Repeater, stop: &AtomicBool, limit: Option<u64>) -> u64 {
        let clock = Rc::clone(&self.clock);
        repeater.run(&*clock, stop, limit, || {
            self.run_cycle();
        })
    }

    fn fetch_and_count(
        &mut self,
        timestamp: &Timestamp,
        image: &TempImage,
    ) -> Result<CountRow, CycleError> {
        let bytes = self
            .source
            .fetch()
            .map_err(CycleError::Network)?;

        image
            .write(&bytes)
            .map_err(|e| CycleError::file_io(image.path(), e))?;

        let class_ids = self
            .detector
            .detect(image.path())
            .map_err(CycleError::Inference)?;

        let row = tally(timestamp.clone(), &class_ids, &self.class_map);

        self.ledger
            .append(&row)
            .map_err(|e| CycleError::file_io(self.ledger.path(), e))?;

        Ok(row)
    }
}
