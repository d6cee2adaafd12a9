use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::capture::{DEFAULT_CAPACITY, DEFAULT_INSTRUMENT};

/// Runtime settings for the capture loop.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Path to the external measurement binary.
    pub instrument_path: PathBuf,
    /// Ring capacity per channel.
    pub buffer_capacity: usize,
    /// Fixed poll tick. Governs display latency, not data integrity; lines
    /// are buffered losslessly between ticks.
    pub poll_interval_ms: u64,
    /// Clear all buffers when a new session starts instead of accumulating
    /// across sessions.
    pub reset_on_start: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            instrument_path: PathBuf::from(DEFAULT_INSTRUMENT),
            buffer_capacity: DEFAULT_CAPACITY,
            poll_interval_ms: 100,
            reset_on_start: true,
        }
    }
}

impl MonitorConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        Ok(config)
    }
}
