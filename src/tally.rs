use std::fmt;

use chrono::{DateTime, NaiveDateTime, TimeZone};

use crate::class_map::{ClassMap, CountLabel};

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Cycle timestamp in `YYYYMMDD_HHMMSS` form.
///
/// Sampled once per cycle and reused for the image name, the ledger row and
/// every log line of that cycle.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(String);

impl Timestamp {
    pub fn from_datetime<Tz>(at: &DateTime<Tz>) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        Self(at.format(TIMESTAMP_FORMAT).to_string())
    }

    /// Accepts only well-formed `YYYYMMDD_HHMMSS` strings.
    pub fn parse(raw: &str) -> Option<Self> {
        NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
            .ok()
            .map(|_| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name for the cycle's temporary snapshot.
    pub fn image_file_name(&self) -> String {
        format!("{}.jpg", self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One ledger row: per-label detection counts for a single snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CountRow {
    pub timestamp: Timestamp,
    pub person: u32,
    pub car: u32,
    pub motorcycle: u32,
    pub bus: u32,
    pub train: u32,
    pub truck: u32,
}

impl CountRow {
    pub fn zeroed(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            person: 0,
            car: 0,
            motorcycle: 0,
            bus: 0,
            train: 0,
            truck: 0,
        }
    }

    pub fn get(&self, label: CountLabel) -> u32 {
        match label {
            CountLabel::Person => self.person,
            CountLabel::Car => self.car,
            CountLabel::Motorcycle => self.motorcycle,
            CountLabel::Bus => self.bus,
            CountLabel::Train => self.train,
            CountLabel::Truck => self.truck,
        }
    }

    fn slot(&mut self, label: CountLabel) -> &mut u32 {
        match label {
            CountLabel::Person => &mut self.person,
            CountLabel::Car => &mut self.car,
            CountLabel::Motorcycle => &mut self.motorcycle,
            CountLabel::Bus => &mut self.bus,
            CountLabel::Train => &mut self.train,
            CountLabel::Truck => &mut self.truck,
        }
    }

    pub fn total(&self) -> u32 {
        CountLabel::ALL.iter().map(|label| self.get(*label)).sum()
    }

    /// Counts in ledger column order.
    pub fn counts(&self) -> [u32; 6] {
        CountLabel::ALL.map(|label| self.get(label))
    }
}

impl fmt::Display for CountRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for label in CountLabel::ALL {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{}={}", label.as_str(), self.get(label))?;
            first = false;
        }
        Ok(())
    }
}

/// Tally detector class ids into a row. Ids outside the map are ignored.
pub fn tally(timestamp: Timestamp, class_ids: &[u32], class_map: &ClassMap) -> CountRow {
    let mut row = CountRow::zeroed(timestamp);
    for label in class_ids.iter().filter_map(|id| class_map.label(*id)) {
        *row.slot(label) += 1;
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts() -> Timestamp {
        Timestamp("20240102_030405".to_string())
    }

    #[test]
    fn formats_timestamp() {
        let at = NaiveDate::from_ymd_opt(2024, 1, 2)
            .and_then(|d| d.and_hms_opt(3, 4, 5))
            .unwrap()
            .and_utc();
        let stamp = Timestamp::from_datetime(&at);
        assert_eq!(stamp.as_str(), "20240102_030405");
        assert_eq!(stamp.image_file_name(), "20240102_030405.jpg");
    }

    #[test]
    fn parse_rejects_malformed_timestamps() {
        assert_eq!(Timestamp::parse("20240102_030405"), Some(ts()));
        assert_eq!(Timestamp::parse("2024-01-02 03:04:05"), None);
        assert_eq!(Timestamp::parse("20241302_030405"), None);
    }

    #[test]
    fn tallies_mapped_classes() {
        let row = tally(ts(), &[0, 2, 2, 7], &ClassMap::coco());
        assert_eq!(row.person, 1);
        assert_eq!(row.car, 2);
        assert_eq!(row.motorcycle, 0);
        assert_eq!(row.bus, 0);
        assert_eq!(row.train, 0);
        assert_eq!(row.truck, 1);
        assert_eq!(row.counts(), [1, 2, 0, 0, 0, 1]);
    }

    #[test]
    fn ignores_unmapped_classes() {
        let ids = [99, 1, 3, 5, 6, 42];
        let row = tally(ts(), &ids, &ClassMap::coco());
        assert_eq!(row.counts(), [0, 0, 1, 1, 1, 0]);
        assert!(row.total() as usize <= ids.len());
    }

    #[test]
    fn empty_detection_is_all_zero() {
        let row = tally(ts(), &[], &ClassMap::coco());
        assert_eq!(row, CountRow::zeroed(ts()));
    }

    #[test]
    fn display_lists_every_label() {
        let row = tally(ts(), &[0, 2, 2, 7], &ClassMap::coco());
        assert_eq!(
            row.to_string(),
            "person=1 car=2 motorcycle=0 bus=0 train=0 truck=1"
        );
    }
}
