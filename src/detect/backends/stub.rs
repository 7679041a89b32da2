use anyhow::{anyhow, Context, Result};
use std::path::Path;

use crate::detect::backend::DetectorBackend;

/// Stub backend for smoke runs and tests.
///
/// Reports a fixed list of class identifiers for every readable, non-empty
/// image. No model is involved.
#[derive(Clone, Debug, Default)]
pub struct StubBackend {
    class_ids: Vec<u32>,
    calls: u64,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `class_ids` for every image.
    pub fn with_detections(class_ids: Vec<u32>) -> Self {
        Self {
            class_ids,
            calls: 0,
        }
    }

    /// Number of successful `detect` calls so far.
    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, image: &Path) -> Result<Vec<u32>> {
        let len = std::fs::metadata(image)
            .with_context(|| format!("stat image {}", image.display()))?
            .len();
        if len == 0 {
            return Err(anyhow!("image {} is empty", image.display()));
        }
        self.calls += 1;
        Ok(self.class_ids.clone())
    }
}
