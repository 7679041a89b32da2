//! Detector class identifiers that the ledger tallies.
//!
//! Detectors trained on COCO report integer class ids. Only six of them are
//! counted; every other id is dropped before tallying.

/// Column a detection is counted under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CountLabel {
    Person,
    Car,
    Motorcycle,
    Bus,
    Train,
    Truck,
}

impl CountLabel {
    /// Ledger column order.
    pub const ALL: [CountLabel; 6] = [
        CountLabel::Person,
        CountLabel::Car,
        CountLabel::Motorcycle,
        CountLabel::Bus,
        CountLabel::Train,
        CountLabel::Truck,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CountLabel::Person => "person",
            CountLabel::Car => "car",
            CountLabel::Motorcycle => "motorcycle",
            CountLabel::Bus => "bus",
            CountLabel::Train => "train",
            CountLabel::Truck => "truck",
        }
    }
}

const COCO_ENTRIES: [(u32, CountLabel); 6] = [
    (0, CountLabel::Person),
    (2, CountLabel::Car),
    (3, CountLabel::Motorcycle),
    (5, CountLabel::Bus),
    (6, CountLabel::Train),
    (7, CountLabel::Truck),
];

/// Immutable class id to label mapping.
#[derive(Clone, Copy, Debug)]
pub struct ClassMap {
    entries: &'static [(u32, CountLabel)],
}

impl ClassMap {
    pub const fn coco() -> Self {
        Self {
            entries: &COCO_ENTRIES,
        }
    }

    pub fn label(&self, class_id: u32) -> Option<CountLabel> {
        self.entries
            .iter()
            .find(|(id, _)| *id == class_id)
            .map(|(_, label)| *label)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ClassMap {
    fn default() -> Self {
        Self::coco()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coco_map_has_six_entries() {
        let map = ClassMap::coco();
        assert_eq!(map.len(), 6);
        assert_eq!(map.label(0), Some(CountLabel::Person));
        assert_eq!(map.label(7), Some(CountLabel::Truck));
    }

    #[test]
    fn unmapped_ids_have_no_label() {
        let map = ClassMap::coco();
        assert_eq!(map.label(1), None);
        assert_eq!(map.label(4), None);
        assert_eq!(map.label(99), None);
    }
}
