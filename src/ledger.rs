//! Append-only CSV count ledger.
//!
//! The ledger is a plain CSV file with a fixed header row. It is opened,
//! appended to and closed on every write; nothing holds it open between
//! cycles. Rows are never rewritten or removed.

use anyhow::{anyhow, Context, Result};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::class_map::CountLabel;
use crate::tally::{CountRow, Timestamp};

pub const LEDGER_HEADER: [&str; 7] = [
    "timestamp",
    "person",
    "car",
    "motorcycle",
    "bus",
    "train",
    "truck",
];

#[derive(Clone, Debug)]
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    /// Open the ledger at `path`, writing the header if the file is absent or empty.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let ledger = Self {
            path: path.as_ref().to_path_buf(),
        };
        let file = ledger.open_append()?;
        ledger.write_header_if_empty(&file)?;
        Ok(ledger)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row. Recreates the header first if the file vanished.
    pub fn append(&self, row: &CountRow) -> Result<()> {
        let file = self.open_append()?;
        self.write_header_if_empty(&file)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        let mut record = Vec::with_capacity(LEDGER_HEADER.len());
        record.push(row.timestamp.as_str().to_string());
        record.extend(row.counts().iter().map(|count| count.to_string()));
        writer
            .write_record(&record)
            .with_context(|| format!("append row to ledger {}", self.path.display()))?;
        writer
            .flush()
            .with_context(|| format!("flush ledger {}", self.path.display()))?;
        Ok(())
    }

    /// Read every data row back, in file order.
    pub fn read_rows(&self) -> Result<Vec<CountRow>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(&self.path)
            .with_context(|| format!("open ledger {}", self.path.display()))?;

        let headers = reader.headers().context("read ledger header")?;
        if headers.iter().ne(LEDGER_HEADER.iter().copied()) {
            return Err(anyhow!(
                "ledger {} has unexpected header {:?}",
                self.path.display(),
                headers
            ));
        }

        let mut rows = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record.with_context(|| format!("read ledger row {}", line + 1))?;
            rows.push(parse_record(&record).with_context(|| {
                format!("malformed ledger row {} in {}", line + 1, self.path.display())
            })?);
        }
        Ok(rows)
    }

    fn open_append(&self) -> Result<File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open ledger {} for append", self.path.display()))
    }

    fn write_header_if_empty(&self, file: &File) -> Result<()> {
        let len = file
            .metadata()
            .with_context(|| format!("stat ledger {}", self.path.display()))?
            .len();
        if len > 0 {
            return Ok(());
        }
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer
            .write_record(LEDGER_HEADER)
            .with_context(|| format!("write header to ledger {}", self.path.display()))?;
        writer
            .flush()
            .with_context(|| format!("flush ledger {}", self.path.display()))?;
        log::debug!("ledger header written to {}", self.path.display());
        Ok(())
    }
}

fn parse_record(record: &csv::StringRecord) -> Result<CountRow> {
    if record.len() != LEDGER_HEADER.len() {
        return Err(anyhow!(
            "expected {} fields, found {}",
            LEDGER_HEADER.len(),
            record.len()
        ));
    }
    let timestamp = Timestamp::parse(&record[0])
        .ok_or_else(|| anyhow!("invalid timestamp '{}'", &record[0]))?;
    let mut row = CountRow::zeroed(timestamp);
    for (idx, label) in CountLabel::ALL.iter().enumerate() {
        let raw = &record[idx + 1];
        let count: u32 = raw
            .trim()
            .parse()
            .map_err(|_| anyhow!("invalid {} count '{}'", label.as_str(), raw))?;
        match label {
            CountLabel::Person => row.person = count,
            CountLabel::Car => row.car = count,
            CountLabel::Motorcycle => row.motorcycle = count,
            CountLabel::Bus => row.bus = count,
            CountLabel::Train => row.train = count,
            CountLabel::Truck => row.truck = count,
        }
    }
    Ok(row)
}
