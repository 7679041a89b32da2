//! Camera snapshot fetching and the per-cycle temporary image.
//!
//! A snapshot is a single JPEG fetched with one HTTP GET. The bytes are
//! written to a file named after the cycle timestamp so the detector can read
//! them from disk, and that file is removed once per cycle through the
//! cycle's `TempImage` guard.

use anyhow::{anyhow, Context, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

const MAX_SNAPSHOT_BYTES: u64 = 16 * 1024 * 1024;

/// Source of snapshot bytes.
pub trait SnapshotSource {
    /// Human-readable origin for logs.
    fn describe(&self) -> String;

    /// Fetch one snapshot.
    fn fetch(&mut self) -> Result<Vec<u8>>;
}

/// Fetches a still image from an HTTP(S) endpoint.
pub struct HttpSnapshotSource {
    agent: ureq::Agent,
    url: String,
}

impl HttpSnapshotSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            url: url.into(),
        }
    }
}

impl SnapshotSource for HttpSnapshotSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    fn fetch(&mut self) -> Result<Vec<u8>> {
        let response = match self.agent.get(&self.url).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                return Err(anyhow!(
                    "snapshot request to {} returned HTTP {} {}",
                    self.url,
                    code,
                    response.status_text()
                ))
            }
            Err(err) => {
                return Err(anyhow!("snapshot request to {} failed: {}", self.url, err))
            }
        };

        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(MAX_SNAPSHOT_BYTES + 1)
            .read_to_end(&mut bytes)
            .with_context(|| format!("read snapshot body from {}", self.url))?;
        if bytes.len() as u64 > MAX_SNAPSHOT_BYTES {
            return Err(anyhow!(
                "snapshot from {} exceeds {} bytes",
                self.url,
                MAX_SNAPSHOT_BYTES
            ));
        }
        if bytes.is_empty() {
            return Err(anyhow!("empty snapshot from {}", self.url));
        }
        Ok(bytes)
    }
}

/// Temporary snapshot file owned by one cycle.
///
/// Deleted exactly once: by `release` when the cycle finishes normally, or on
/// drop if the guard is abandoned without being released.
#[derive(Debug)]
pub struct TempImage {
    path: PathBuf,
    released: bool,
}

impl TempImage {
    /// Claim `path` for this cycle. Nothing is written yet.
    pub fn claim(path: PathBuf) -> Self {
        Self {
            path,
            released: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the snapshot bytes, replacing any previous content.
    pub fn write(&self, bytes: &[u8]) -> std::io::Result<()> {
        std::fs::write(&self.path, bytes)
    }

    /// Delete the file now, reporting failure. A missing file is not an error.
    pub fn remove(&self) -> std::io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Delete the file and disarm the guard, so the caller sees the only
    /// removal result.
    pub fn release(mut self) -> std::io::Result<()> {
        self.released = true;
        self.remove()
    }
}

impl Drop for TempImage {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(err) = self.remove() {
            log::warn!(
                "failed to remove temporary image {}: {}",
                self.path.display(),
                err
            );
        }
    }
}
