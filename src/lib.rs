//! Snapshot Counter
//!
//! Periodically downloads a traffic-camera snapshot, runs an object detector
//! on it, tallies people and vehicles by class, and appends the tally to a CSV
//! ledger.
//!
//! # Cycle
//!
//! 1. Sample the cycle timestamp (`YYYYMMDD_HHMMSS`).
//! 2. Fetch the snapshot over HTTP with a bounded timeout.
//! 3. Write it to `<folder>/<timestamp>.jpg`.
//! 4. Run the detector and tally the six counted classes.
//! 5. Append one row to the ledger.
//! 6. Remove the image, whatever happened above.
//!
//! A failing cycle is logged and skipped; it never stops the loop and never
//! writes a ledger row.
//!
//! # Module Structure
//!
//! - `config`: `CounterConfig`, defaults plus file/env overrides
//! - `class_map`: detector class id to counted label
//! - `tally`: `Timestamp`, `CountRow`, `tally`
//! - `ledger`: append-only CSV ledger
//! - `snapshot`: HTTP snapshot source and the scoped temporary image
//! - `detect`: detector backends (stub, tract)
//! - `schedule`: `Clock` and `Repeater`
//! - `cycle`: `SnapshotCounter`, one cycle and the loop

pub mod class_map;
pub mod config;
pub mod cycle;
pub mod detect;
pub mod ledger;
pub mod schedule;
pub mod snapshot;
pub mod tally;

pub use class_map::{ClassMap, CountLabel};
pub use config::{CounterConfig, DetectorSettings, OutputLayout};
pub use cycle::{CycleError, CycleOutcome, CycleStats, SnapshotCounter};
pub use detect::{build_backend, DetectorBackend, StubBackend};
pub use ledger::{Ledger, LEDGER_HEADER};
pub use schedule::{Clock, ManualClock, Repeater, SystemClock};
pub use snapshot::{HttpSnapshotSource, SnapshotSource, TempImage};
pub use tally::{tally, CountRow, Timestamp};
