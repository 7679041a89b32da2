use anyhow::{anyhow, Result};

use crate::config::DetectorSettings;

use super::backend::DetectorBackend;
use super::backends::StubBackend;

/// Build the detector backend named in `settings`.
///
/// The returned handle is meant to live for the whole process.
pub fn build_backend(settings: &DetectorSettings) -> Result<Box<dyn DetectorBackend>> {
    match settings.backend.as_str() {
        "stub" => {
            log::warn!("stub detector selected; every snapshot will count as empty");
            Ok(Box::new(StubBackend::new()))
        }
        "tract" => {
            #[cfg(feature = "backend-tract")]
            {
                let backend = super::backends::TractBackend::from_settings(settings)?;
                Ok(Box::new(backend))
            }
            #[cfg(not(feature = "backend-tract"))]
            {
                Err(anyhow!(
                    "detector backend 'tract' requires the backend-tract feature"
                ))
            }
        }
        other => Err(anyhow!("detector backend '{}' not available", other)),
    }
}
