use anyhow::Result;
use std::path::Path;

/// Detector backend trait.
///
/// A backend is built once at startup and reused for every cycle, so any
/// model loading belongs in its constructor, not in `detect`.
pub trait DetectorBackend {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on the image stored at `image`.
    ///
    /// Returns one class identifier per detected object, in no particular
    /// order. Implementations must not keep the file open after returning.
    fn detect(&mut self, image: &Path) -> Result<Vec<u32>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
