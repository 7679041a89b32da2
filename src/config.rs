use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_SNAPSHOT_URL: &str = "https://trafficcam.calgary.ca/loc37.jpg";
const DEFAULT_FOLDER: &str = "loc37";
const DEFAULT_LEDGER_FILE: &str = "vehicle_counts4.csv";
const DEFAULT_INTERVAL_SECS: u64 = 300;
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_DETECTOR_BACKEND: &str = if cfg!(feature = "backend-tract") {
    "tract"
} else {
    "stub"
};
const DEFAULT_MODEL_PATH: &str = "rtdetr-l.onnx";
const DEFAULT_MODEL_INPUT: u32 = 640;
const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

#[derive(Debug, Deserialize, Default)]
struct CounterConfigFile {
    url: Option<String>,
    folder: Option<PathBuf>,
    ledger_file: Option<String>,
    interval_secs: Option<u64>,
    timeout_secs: Option<u64>,
    detector: Option<DetectorConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    model_path: Option<PathBuf>,
    input_width: Option<u32>,
    input_height: Option<u32>,
    confidence_threshold: Option<f32>,
    output_layout: Option<OutputLayout>,
}

/// How the detector model arranges its output tensor.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputLayout {
    /// `[1, queries, 4 + classes]`, one candidate per query, no NMS needed.
    #[default]
    Detr,
    /// `[1, 4 + classes, anchors]`, dense anchors that need NMS.
    Yolo,
}

#[derive(Debug, Clone)]
pub struct CounterConfig {
    pub url: String,
    pub folder: PathBuf,
    pub ledger_file: String,
    pub interval: Duration,
    pub timeout: Duration,
    pub detector: DetectorSettings,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub backend: String,
    pub model_path: PathBuf,
    pub input_width: u32,
    pub input_height: u32,
    pub confidence_threshold: f32,
    pub output_layout: OutputLayout,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self::from_file(CounterConfigFile::default())
    }
}

impl CounterConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("COUNTER_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Full path of the CSV ledger inside the working folder.
    pub fn ledger_path(&self) -> PathBuf {
        self.folder.join(&self.ledger_file)
    }

    fn from_file(file: CounterConfigFile) -> Self {
        let detector_file = file.detector.unwrap_or_default();
        let detector = DetectorSettings {
            backend: detector_file
                .backend
                .unwrap_or_else(|| DEFAULT_DETECTOR_BACKEND.to_string()),
            model_path: detector_file
                .model_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
            input_width: detector_file.input_width.unwrap_or(DEFAULT_MODEL_INPUT),
            input_height: detector_file.input_height.unwrap_or(DEFAULT_MODEL_INPUT),
            confidence_threshold: detector_file
                .confidence_threshold
                .unwrap_or(DEFAULT_CONFIDENCE_THRESHOLD),
            output_layout: detector_file.output_layout.unwrap_or_default(),
        };
        Self {
            url: file.url.unwrap_or_else(|| DEFAULT_SNAPSHOT_URL.to_string()),
            folder: file
                .folder
                .unwrap_or_else(|| PathBuf::from(DEFAULT_FOLDER)),
            ledger_file: file
                .ledger_file
                .unwrap_or_else(|| DEFAULT_LEDGER_FILE.to_string()),
            interval: Duration::from_secs(file.interval_secs.unwrap_or(DEFAULT_INTERVAL_SECS)),
            timeout: Duration::from_secs(file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            detector,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("COUNTER_URL") {
            if !url.trim().is_empty() {
                self.url = url;
            }
        }
        if let Ok(folder) = std::env::var("COUNTER_FOLDER") {
            if !folder.trim().is_empty() {
                self.folder = PathBuf::from(folder);
            }
        }
        if let Ok(name) = std::env::var("COUNTER_LEDGER_FILE") {
            if !name.trim().is_empty() {
                self.ledger_file = name;
            }
        }
        if let Ok(interval) = std::env::var("COUNTER_INTERVAL_SECS") {
            let seconds: u64 = interval.parse().map_err(|_| {
                anyhow!("COUNTER_INTERVAL_SECS must be an integer number of seconds")
            })?;
            self.interval = Duration::from_secs(seconds);
        }
        if let Ok(timeout) = std::env::var("COUNTER_TIMEOUT_SECS") {
            let seconds: u64 = timeout.parse().map_err(|_| {
                anyhow!("COUNTER_TIMEOUT_SECS must be an integer number of seconds")
            })?;
            self.timeout = Duration::from_secs(seconds);
        }
        if let Ok(backend) = std::env::var("COUNTER_DETECTOR_BACKEND") {
            if !backend.trim().is_empty() {
                self.detector.backend = backend.trim().to_lowercase();
            }
        }
        if let Ok(path) = std::env::var("COUNTER_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.detector.model_path = PathBuf::from(path);
            }
        }
        Ok(())
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.url)
            .map_err(|e| anyhow!("invalid snapshot url {}: {}", self.url, e))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(anyhow!(
                "unsupported snapshot url scheme '{}'; expected http(s)",
                url.scheme()
            ));
        }
        if self.interval.is_zero() {
            return Err(anyhow!("interval must be greater than zero"));
        }
        if self.timeout.is_zero() {
            return Err(anyhow!("timeout must be greater than zero"));
        }
        let ledger = Path::new(&self.ledger_file);
        if self.ledger_file.trim().is_empty() || ledger.file_name() != Some(ledger.as_os_str()) {
            return Err(anyhow!(
                "ledger_file must be a bare file name, got '{}'",
                self.ledger_file
            ));
        }
        if !matches!(self.detector.backend.as_str(), "stub" | "tract") {
            return Err(anyhow!(
                "unknown detector backend '{}'; expected stub or tract",
                self.detector.backend
            ));
        }
        if !(0.0..=1.0).contains(&self.detector.confidence_threshold) {
            return Err(anyhow!("confidence_threshold must be within 0.0..=1.0"));
        }
        if self.detector.input_width == 0 || self.detector.input_height == 0 {
            return Err(anyhow!("model input dimensions must be non-zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<CounterConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
